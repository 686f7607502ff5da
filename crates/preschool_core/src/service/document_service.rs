//! Student document upload/download over blob storage.
//!
//! # Responsibility
//! - Store file bytes in a [`BlobStore`] and metadata in the document store.
//!
//! # Invariants
//! - Blob keys are `<organization>/<student>/<document>`.
//! - Bytes are written before metadata; a failed metadata write removes the
//!   orphaned blob.
//! - Stored file names only contain `[A-Za-z0-9._-]`.

use crate::model::document::{DocumentCategory, StudentDocument};
use crate::model::student::Student;
use crate::model::{new_record_id, now_epoch_ms, OrganizationId, RecordId};
use crate::repo::blob_store::BlobStore;
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter, OrderDirection};
use crate::repo::record_store::RecordStore;
use crate::service::error::{read_back, require_record, ServiceError, ServiceResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static UNSAFE_FILE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid file name regex"));

const MAX_FILE_NAME_CHARS: usize = 120;
const FALLBACK_FILE_NAME: &str = "file";

/// Input for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest<'a> {
    pub student_id: RecordId,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub category: DocumentCategory,
    pub bytes: &'a [u8],
}

pub struct DocumentService<S: DocumentStore, B: BlobStore> {
    store: S,
    blobs: B,
    organization_id: OrganizationId,
}

impl<S: DocumentStore, B: BlobStore> DocumentService<S, B> {
    pub fn new(store: S, blobs: B, organization_id: OrganizationId) -> Self {
        Self {
            store,
            blobs,
            organization_id,
        }
    }

    /// Uploads file bytes for a student and records their metadata.
    pub fn upload(&self, request: &UploadRequest<'_>) -> ServiceResult<StudentDocument> {
        require_record::<_, Student>(&self.store, self.organization_id, request.student_id)?;

        let id = new_record_id();
        let document = StudentDocument {
            id,
            student_id: request.student_id,
            file_name: sanitize_file_name(request.file_name),
            content_type: request.content_type.trim().to_string(),
            size_bytes: request.bytes.len() as u64,
            storage_key: format!("{}/{}/{id}", self.organization_id, request.student_id),
            category: request.category,
            uploaded_at: now_epoch_ms(),
        };

        self.blobs.put(&document.storage_key, request.bytes)?;
        if let Err(err) = self.store.create_record(self.organization_id, &document) {
            if let Err(cleanup) = self.blobs.delete(&document.storage_key) {
                warn!(
                    "event=document_upload module=service status=error organization_id={} document_id={id} error_code=blob_cleanup_failed error={cleanup}",
                    self.organization_id
                );
            }
            return Err(err.into());
        }

        info!(
            "event=document_upload module=service status=ok organization_id={} student_id={} document_id={id} size_bytes={}",
            self.organization_id, request.student_id, document.size_bytes
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "uploaded document not found in read-back",
        )
    }

    /// Returns metadata and bytes of one document.
    ///
    /// # Errors
    /// - `InconsistentState` when metadata exists but the blob is gone.
    pub fn download(&self, id: RecordId) -> ServiceResult<(StudentDocument, Vec<u8>)> {
        let document: StudentDocument = require_record(&self.store, self.organization_id, id)?;
        let bytes = self
            .blobs
            .get(&document.storage_key)?
            .ok_or(ServiceError::InconsistentState(
                "document metadata points at a missing blob",
            ))?;
        Ok((document, bytes))
    }

    /// Documents of one student, newest upload first.
    pub fn list_for_student(&self, student_id: RecordId) -> ServiceResult<Vec<StudentDocument>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("student_id", student_id.to_string()))
            .order_by("uploaded_at", OrderDirection::Desc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Deletes metadata, then the blob. A blob that is already gone is ignored.
    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        let document: StudentDocument = require_record(&self.store, self.organization_id, id)?;
        self.store
            .delete_record::<StudentDocument>(self.organization_id, id)?;
        if !self.blobs.delete(&document.storage_key)? {
            warn!(
                "event=document_delete module=service status=ok organization_id={} document_id={id} blob_missing=true",
                self.organization_id
            );
        }
        Ok(())
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_FILE_CHARS_RE.replace_all(base, "_");
    let cleaned: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_file_name;

    #[test]
    fn sanitize_file_name_strips_paths_and_unsafe_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\scans\\shot record.pdf"), "shot_record.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("   "), "file");
        assert_eq!(sanitize_file_name("ümlaut form.png"), "_mlaut_form.png");
    }

    #[test]
    fn sanitize_file_name_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_file_name(&long).len(), 120);
    }
}
