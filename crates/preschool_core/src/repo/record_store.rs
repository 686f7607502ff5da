//! Typed record access on top of any [`DocumentStore`].
//!
//! # Invariants
//! - Write paths call `Record::validate()` before touching storage.
//! - Read paths reject documents that fail to decode, fail validation, or
//!   whose body `id` disagrees with the storage key.

use crate::model::{OrganizationId, Record, RecordId};
use crate::repo::document_store::{
    BatchWrite, DocumentQuery, DocumentStore, RepoError, RepoResult, StoredDocument,
};

/// Record-level CRUD, blanket-implemented for every document store.
pub trait RecordStore {
    fn create_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        record: &T,
    ) -> RepoResult<RecordId>;
    fn update_record<T: Record>(&self, organization_id: OrganizationId, record: &T)
        -> RepoResult<()>;
    fn get_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
    ) -> RepoResult<Option<T>>;
    fn list_records<T: Record>(
        &self,
        organization_id: OrganizationId,
        query: &DocumentQuery,
    ) -> RepoResult<Vec<T>>;
    fn count_records<T: Record>(
        &self,
        organization_id: OrganizationId,
        query: &DocumentQuery,
    ) -> RepoResult<u64>;
    fn delete_record<T: Record>(&self, organization_id: OrganizationId, id: RecordId)
        -> RepoResult<()>;
}

impl<S: DocumentStore + ?Sized> RecordStore for S {
    fn create_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        record: &T,
    ) -> RepoResult<RecordId> {
        record.validate()?;
        let body = serde_json::to_value(record)?;
        self.insert(organization_id, T::COLLECTION, record.id(), &body)?;
        Ok(record.id())
    }

    fn update_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        record: &T,
    ) -> RepoResult<()> {
        record.validate()?;
        let body = serde_json::to_value(record)?;
        self.replace(organization_id, T::COLLECTION, record.id(), &body)
    }

    fn get_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
    ) -> RepoResult<Option<T>> {
        self.get(organization_id, T::COLLECTION, id)?
            .map(decode_record)
            .transpose()
    }

    fn list_records<T: Record>(
        &self,
        organization_id: OrganizationId,
        query: &DocumentQuery,
    ) -> RepoResult<Vec<T>> {
        self.query(organization_id, T::COLLECTION, query)?
            .into_iter()
            .map(decode_record)
            .collect()
    }

    fn count_records<T: Record>(
        &self,
        organization_id: OrganizationId,
        query: &DocumentQuery,
    ) -> RepoResult<u64> {
        self.count(organization_id, T::COLLECTION, query)
    }

    fn delete_record<T: Record>(
        &self,
        organization_id: OrganizationId,
        id: RecordId,
    ) -> RepoResult<()> {
        self.delete(organization_id, T::COLLECTION, id)
    }
}

impl BatchWrite {
    /// Builds a validated upsert for one record.
    pub fn put_record<T: Record>(record: &T) -> RepoResult<Self> {
        record.validate()?;
        Ok(Self::Put {
            collection: T::COLLECTION,
            id: record.id(),
            body: serde_json::to_value(record)?,
        })
    }

    pub fn delete_record<T: Record>(id: RecordId) -> Self {
        Self::Delete {
            collection: T::COLLECTION,
            id,
        }
    }
}

fn decode_record<T: Record>(document: StoredDocument) -> RepoResult<T> {
    let id = document.id;
    let record: T = serde_json::from_value(document.body).map_err(|err| {
        RepoError::InvalidData(format!("cannot decode {}/{id}: {err}", T::COLLECTION))
    })?;
    if record.id() != id {
        return Err(RepoError::InvalidData(format!(
            "{}/{id} carries mismatched body id {}",
            T::COLLECTION,
            record.id()
        )));
    }
    record.validate()?;
    Ok(record)
}
