// crates/fides-consent-core/src/hierarchy.rs
// ============================================================================
// Module: Hierarchy Aggregator
// Description: Parent/child notice toggle propagation.
// Purpose: Keep parent notices consistent with their descendants.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Notices form a tree of any depth. A parent is on exactly when every
//! child is on (AND aggregation). Toggling a notice pushes the new value to
//! all of its descendants, then recomputes every ancestor bottom-up from
//! the current child values. Nothing is cached between changes.
//!
//! Notice-only notices are always on and never change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::experience::Notice;
use crate::core::identifiers::NoticeKey;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hierarchy update errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The notice key is not part of the tree.
    #[error("unknown notice: {0}")]
    UnknownNotice(NoticeKey),
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Computes a flat value for every notice in the tree.
///
/// Leaves take their value from `leaf_decisions` (or their default);
/// parents take the AND of their children.
#[must_use]
pub fn expand(
    tree: &[Notice],
    leaf_decisions: &BTreeMap<NoticeKey, bool>,
) -> BTreeMap<NoticeKey, bool> {
    let mut flat = BTreeMap::new();
    for notice in tree {
        expand_node(notice, leaf_decisions, &mut flat);
    }
    flat
}

/// Expands one subtree and returns the value of its root.
fn expand_node(
    notice: &Notice,
    leaf_decisions: &BTreeMap<NoticeKey, bool>,
    flat: &mut BTreeMap<NoticeKey, bool>,
) -> bool {
    let value = if notice.is_notice_only() {
        for child in &notice.children {
            expand_node(child, leaf_decisions, flat);
        }
        true
    } else if notice.children.is_empty() {
        leaf_decisions.get(&notice.notice_key).copied().unwrap_or_else(|| notice.default_value())
    } else {
        let mut all = true;
        for child in &notice.children {
            all &= expand_node(child, leaf_decisions, flat);
        }
        all
    };
    flat.insert(notice.notice_key.clone(), value);
    value
}

// ============================================================================
// SECTION: Change Propagation
// ============================================================================

/// Applies a toggle and returns every notice value it sets.
///
/// `current` holds the values before the change; the returned map contains
/// the toggled notice, all its descendants, and all its ancestors.
///
/// # Errors
///
/// Returns [`HierarchyError::UnknownNotice`] when `node` is not in the tree.
pub fn collapse_on_change(
    tree: &[Notice],
    node: &NoticeKey,
    new_value: bool,
    current: &BTreeMap<NoticeKey, bool>,
) -> Result<BTreeMap<NoticeKey, bool>, HierarchyError> {
    let path = path_to(tree, node).ok_or_else(|| HierarchyError::UnknownNotice(node.clone()))?;
    let mut changes = BTreeMap::new();
    if let Some(target) = path.last() {
        let mut stack = vec![*target];
        while let Some(notice) = stack.pop() {
            let value = notice.is_notice_only() || new_value;
            changes.insert(notice.notice_key.clone(), value);
            stack.extend(notice.children.iter());
        }
    }

    let mut state = current.clone();
    state.extend(changes.iter().map(|(key, value)| (key.clone(), *value)));
    for ancestor in path.iter().rev().skip(1) {
        let value = ancestor.is_notice_only()
            || ancestor.children.iter().all(|child| value_of(child, &state));
        state.insert(ancestor.notice_key.clone(), value);
        changes.insert(ancestor.notice_key.clone(), value);
    }
    Ok(changes)
}

/// Returns the current value of a notice.
fn value_of(notice: &Notice, state: &BTreeMap<NoticeKey, bool>) -> bool {
    notice.is_notice_only()
        || state.get(&notice.notice_key).copied().unwrap_or_else(|| notice.default_value())
}

/// Returns the notices from a root down to `key`, inclusive.
fn path_to<'a>(tree: &'a [Notice], key: &NoticeKey) -> Option<Vec<&'a Notice>> {
    for notice in tree {
        if notice.notice_key == *key {
            return Some(vec![notice]);
        }
        if let Some(mut path) = path_to(&notice.children, key) {
            path.insert(0, notice);
            return Some(path);
        }
    }
    None
}
