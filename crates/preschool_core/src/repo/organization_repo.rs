//! Organization repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tenant roots outside the organization-scoped document space.
//!
//! # Invariants
//! - Write paths call `Organization::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::now_epoch_ms;
use crate::model::organization::Organization;
use crate::model::OrganizationId;
use crate::repo::document_store::{RepoError, RepoResult};
use rusqlite::{params, Connection, ErrorCode, Row};

const ORGANIZATIONS_COLLECTION: &str = "organizations";

/// Repository interface for organization CRUD operations.
pub trait OrganizationRepository {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId>;
    fn update_organization(&self, organization: &Organization) -> RepoResult<()>;
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    /// Lists organizations in creation order.
    fn list_organizations(&self) -> RepoResult<Vec<Organization>>;
}

/// SQLite-backed organization repository.
#[derive(Debug, Clone, Copy)]
pub struct SqliteOrganizationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganizationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl OrganizationRepository for SqliteOrganizationRepository<'_> {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId> {
        organization.validate()?;
        let body = serde_json::to_string(organization)?;
        let now = now_epoch_ms();

        let result = self.conn.execute(
            "INSERT INTO organizations (id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3);",
            params![organization.id.to_string(), body, now],
        );
        match result {
            Ok(_) => Ok(organization.id),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::AlreadyExists {
                    collection: ORGANIZATIONS_COLLECTION,
                    id: organization.id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_organization(&self, organization: &Organization) -> RepoResult<()> {
        organization.validate()?;
        let body = serde_json::to_string(organization)?;

        let changed = self.conn.execute(
            "UPDATE organizations
             SET
                body = ?2,
                updated_at = ?3
             WHERE id = ?1;",
            params![organization.id.to_string(), body, now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                collection: ORGANIZATIONS_COLLECTION,
                id: organization.id,
            });
        }
        Ok(())
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM organizations WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_organization_row(row)?));
        }
        Ok(None)
    }

    fn list_organizations(&self) -> RepoResult<Vec<Organization>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM organizations ORDER BY created_at ASC, rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut organizations = Vec::new();
        while let Some(row) = rows.next()? {
            organizations.push(parse_organization_row(row)?);
        }
        Ok(organizations)
    }
}

fn parse_organization_row(row: &Row<'_>) -> RepoResult<Organization> {
    let id_text: String = row.get("id")?;
    let body: String = row.get("body")?;
    let organization: Organization = serde_json::from_str(&body).map_err(|err| {
        RepoError::InvalidData(format!("cannot decode organization `{id_text}`: {err}"))
    })?;
    if organization.id.to_string() != id_text {
        return Err(RepoError::InvalidData(format!(
            "organization `{id_text}` carries mismatched body id {}",
            organization.id
        )));
    }
    organization.validate()?;
    Ok(organization)
}
