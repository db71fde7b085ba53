// crates/fides-consent-core/tests/hierarchy.rs
// ============================================================================
// Module: Hierarchy Aggregator Tests
// Description: AND aggregation and toggle propagation across notice trees.
// ============================================================================
//! ## Overview
//! Validates parent/child consistency after expansion and after toggles.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;

use fides_consent_core::HierarchyError;
use fides_consent_core::hierarchy::collapse_on_change;
use fides_consent_core::hierarchy::expand;

use crate::common::key;
use crate::common::us_experience;

// ============================================================================
// SECTION: Expansion
// ============================================================================

#[test]
fn parent_is_on_only_when_all_children_are_on() {
    let experience = us_experience();
    let both: BTreeMap<_, _> =
        [(key("email_marketing"), true), (key("push_marketing"), true)].into();
    let flat = expand(&experience.notices, &both);
    assert_eq!(flat.get(&key("marketing")), Some(&true));

    let one: BTreeMap<_, _> =
        [(key("email_marketing"), true), (key("push_marketing"), false)].into();
    let flat = expand(&experience.notices, &one);
    assert_eq!(flat.get(&key("marketing")), Some(&false));
}

#[test]
fn expansion_uses_defaults_and_forces_notice_only() {
    let experience = us_experience();
    let leaves: BTreeMap<_, _> = [(key("essential"), false)].into();
    let flat = expand(&experience.notices, &leaves);

    assert_eq!(flat.get(&key("essential")), Some(&true));
    assert_eq!(flat.get(&key("data_sales_and_sharing")), Some(&true));
    assert_eq!(flat.get(&key("email_marketing")), Some(&false));
    assert_eq!(flat.len(), 5);
}

// ============================================================================
// SECTION: Change Propagation
// ============================================================================

#[test]
fn checking_both_children_checks_parent_and_unchecking_one_clears_it() {
    let experience = us_experience();
    let mut state = expand(&experience.notices, &BTreeMap::new());

    let changes =
        collapse_on_change(&experience.notices, &key("email_marketing"), true, &state).unwrap();
    assert_eq!(changes.get(&key("marketing")), Some(&false));
    state.extend(changes);

    let changes =
        collapse_on_change(&experience.notices, &key("push_marketing"), true, &state).unwrap();
    assert_eq!(changes.get(&key("marketing")), Some(&true));
    state.extend(changes);

    let changes =
        collapse_on_change(&experience.notices, &key("push_marketing"), false, &state).unwrap();
    assert_eq!(changes.get(&key("marketing")), Some(&false));
    assert_eq!(changes.get(&key("email_marketing")), None);
}

#[test]
fn toggling_parent_sets_every_descendant() {
    let experience = us_experience();
    let state = expand(&experience.notices, &BTreeMap::new());
    let changes = collapse_on_change(&experience.notices, &key("marketing"), true, &state).unwrap();

    let expected: BTreeMap<_, _> = [
        (key("email_marketing"), true),
        (key("marketing"), true),
        (key("push_marketing"), true),
    ]
    .into();
    assert_eq!(changes, expected);
}

#[test]
fn notice_only_cannot_be_toggled_off() {
    let experience = us_experience();
    let state = expand(&experience.notices, &BTreeMap::new());
    let changes = collapse_on_change(&experience.notices, &key("essential"), false, &state).unwrap();
    assert_eq!(changes.get(&key("essential")), Some(&true));
}

#[test]
fn unknown_notice_is_rejected() {
    let experience = us_experience();
    let err =
        collapse_on_change(&experience.notices, &key("missing"), true, &BTreeMap::new()).unwrap_err();
    assert_eq!(err, HierarchyError::UnknownNotice(key("missing")));
}
