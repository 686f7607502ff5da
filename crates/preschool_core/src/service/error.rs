//! Shared error type for use-case services.

use crate::model::permission::Permission;
use crate::model::validation::ValidationError;
use crate::model::{OrganizationId, Record, RecordId};
use crate::repo::blob_store::BlobError;
use crate::repo::document_store::{DocumentStore, RepoError};
use crate::repo::record_store::RecordStore;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for preschool use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input record failed field validation.
    Validation(ValidationError),
    /// Target record does not exist in this organization.
    NotFound {
        entity: &'static str,
        id: RecordId,
    },
    /// Request collides with existing data (duplicate, capacity, references).
    Conflict(String),
    /// Request is not allowed from the record's current state.
    InvalidState(String),
    PermissionDenied {
        staff_id: RecordId,
        permission: Permission,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Object storage failure.
    Blob(BlobError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidState(message) => write!(f, "invalid state: {message}"),
            Self::PermissionDenied {
                staff_id,
                permission,
            } => write!(
                f,
                "staff {staff_id} lacks permission `{}`",
                permission.as_str()
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Blob(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Blob(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { collection, id } => Self::NotFound {
                entity: collection,
                id,
            },
            RepoError::AlreadyExists { collection, id } => {
                Self::Conflict(format!("{collection} {id} already exists"))
            }
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BlobError> for ServiceError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

/// Loads one record or fails with `NotFound` named after its collection.
pub(crate) fn require_record<S, T>(
    store: &S,
    organization_id: OrganizationId,
    id: RecordId,
) -> ServiceResult<T>
where
    S: DocumentStore + ?Sized,
    T: Record,
{
    store
        .get_record::<T>(organization_id, id)?
        .ok_or(ServiceError::NotFound {
            entity: T::COLLECTION,
            id,
        })
}

/// Fails with `Conflict` when a record with this id is already stored.
pub(crate) fn ensure_absent<S, T>(
    store: &S,
    organization_id: OrganizationId,
    record: &T,
) -> ServiceResult<()>
where
    S: DocumentStore + ?Sized,
    T: Record,
{
    if store.get(organization_id, T::COLLECTION, record.id())?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "{} {} already exists",
            T::COLLECTION,
            record.id()
        )));
    }
    Ok(())
}

/// Re-reads a record that was just written.
pub(crate) fn read_back<S, T>(
    store: &S,
    organization_id: OrganizationId,
    id: RecordId,
    details: &'static str,
) -> ServiceResult<T>
where
    S: DocumentStore + ?Sized,
    T: Record,
{
    store
        .get_record::<T>(organization_id, id)?
        .ok_or(ServiceError::InconsistentState(details))
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::model::validation::ValidationError;
    use crate::repo::document_store::RepoError;
    use uuid::Uuid;

    #[test]
    fn repo_not_found_maps_to_entity_not_found() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(RepoError::NotFound {
            collection: "students",
            id,
        });
        assert!(matches!(
            err,
            ServiceError::NotFound { entity: "students", id: found } if found == id
        ));
    }

    #[test]
    fn repo_validation_is_surfaced_directly() {
        let err = ServiceError::from(RepoError::Validation(ValidationError::MissingField(
            "first_name",
        )));
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingField("first_name"))
        ));
    }
}
