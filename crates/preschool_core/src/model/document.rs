//! Metadata for files kept in blob storage.

use crate::model::validation::{require_text, ValidationError};
use crate::model::{Record, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Enrollment,
    Medical,
    Immunization,
    Consent,
    Other,
}

/// Student file metadata. The bytes live in a `BlobStore` under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDocument {
    pub id: RecordId,
    pub student_id: RecordId,
    /// Sanitized original file name.
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_key: String,
    pub category: DocumentCategory,
    /// Unix epoch milliseconds.
    pub uploaded_at: i64,
}

impl Record for StudentDocument {
    const COLLECTION: &'static str = "student_documents";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("file_name", &self.file_name)?;
        require_text("content_type", &self.content_type)?;
        require_text("storage_key", &self.storage_key)?;
        Ok(())
    }
}
