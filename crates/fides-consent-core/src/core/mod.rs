// crates/fides-consent-core/src/core/mod.rs
// ============================================================================
// Module: Fides Consent Core Types
// Description: Experience model, consent decisions, identifiers, and hashing.
// Purpose: Provide stable, serializable types shared by codecs and runtime.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types are the canonical data model of the engine: what an experience
//! offers, what the user decided, and how both are identified and versioned.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod decision;
pub mod experience;
pub mod hashing;
pub mod identifiers;
pub mod sections;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use decision::ConsentDecision;
pub use decision::ConsentMethod;
pub use decision::Fallback;
pub use decision::FieldRef;
pub use experience::ComponentType;
pub use experience::ConsentMechanism;
pub use experience::Experience;
pub use experience::Feature;
pub use experience::GppFieldMapping;
pub use experience::GvlMetadata;
pub use experience::LegalBasis;
pub use experience::Notice;
pub use experience::Preference;
pub use experience::Purpose;
pub use experience::SpecialFeature;
pub use experience::SpecialPurpose;
pub use experience::TcfItem;
pub use experience::Vendor;
pub use hashing::HashError;
pub use hashing::VERSION_HASH_LENGTH;
pub use hashing::experience_version_hash;
pub use identifiers::ExperienceId;
pub use identifiers::ListenerId;
pub use identifiers::NoticeKey;
pub use identifiers::VendorId;
pub use sections::GppSectionId;
pub use sections::UsField;
pub use time::Timestamp;
