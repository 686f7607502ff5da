//! Document-shaped domain records for preschool administration.
//!
//! # Responsibility
//! - Define the flat records persisted in the document store.
//! - Provide per-record validation run before every write.
//!
//! # Invariants
//! - Every record is identified by a generated, stable `RecordId`.
//! - Relationships are foreign IDs only; the store does not enforce them.
//! - Every record is namespaced under exactly one `OrganizationId`.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub mod attendance;
pub mod class;
pub mod curriculum;
pub mod document;
pub mod meal;
pub mod message;
pub mod organization;
pub mod permission;
pub mod staff;
pub mod student;
pub mod validation;

pub use validation::ValidationError;

/// Stable identifier of one stored record.
pub type RecordId = Uuid;

/// Tenant boundary identifier.
pub type OrganizationId = Uuid;

/// A record type that lives in one named document collection.
pub trait Record: Serialize + DeserializeOwned {
    /// Collection name used as the storage namespace for this type.
    const COLLECTION: &'static str;

    fn id(&self) -> RecordId;

    /// Checks required fields and shape constraints before persistence.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generates a new random record ID.
pub fn new_record_id() -> RecordId {
    Uuid::new_v4()
}
