//! Core domain logic for preschool administration.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{OrganizationId, Record, RecordId, ValidationError};
pub use repo::blob_store::{BlobError, BlobResult, BlobStore, FsBlobStore};
pub use repo::document_store::{
    BatchWrite, DocumentQuery, DocumentStore, Filter, FilterOp, OrderDirection, RepoError,
    RepoResult, SqliteDocumentStore, StoredDocument,
};
pub use repo::organization_repo::{OrganizationRepository, SqliteOrganizationRepository};
pub use repo::record_store::RecordStore;
pub use service::attendance_service::{AttendanceService, AttendanceSummary, CheckInRequest};
pub use service::class_service::{ClassOccupancy, ClassService};
pub use service::curriculum_service::CurriculumService;
pub use service::dashboard_service::{DashboardOverview, DashboardService};
pub use service::document_service::{DocumentService, UploadRequest};
pub use service::error::{ServiceError, ServiceResult};
pub use service::meal_service::{MealLogOutcome, MealLogRequest, MealService, MealTypeSummary};
pub use service::message_service::{MessageService, SendMessageRequest};
pub use service::organization_service::OrganizationService;
pub use service::permission_service::PermissionService;
pub use service::staff_service::{StaffFilter, StaffService};
pub use service::student_service::{StudentFilter, StudentService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
