//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document store contract that services depend on.
//! - Isolate SQLite and filesystem details from use-case orchestration.
//!
//! # Invariants
//! - Record writes enforce `Record::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`) in
//!   addition to storage transport errors.

pub mod blob_store;
pub mod document_store;
pub mod organization_repo;
pub mod record_store;
