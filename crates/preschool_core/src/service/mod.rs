//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate document store calls into use-case level APIs.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Every service instance is bound to one store and one organization.
//! - Multi-document changes go through a single `write_batch`.

pub mod attendance_service;
pub mod class_service;
pub mod curriculum_service;
pub mod dashboard_service;
pub mod document_service;
pub mod error;
pub mod meal_service;
pub mod message_service;
pub mod organization_service;
pub mod permission_service;
pub mod staff_service;
pub mod student_service;
