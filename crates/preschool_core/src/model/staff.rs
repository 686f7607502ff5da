//! Staff records.

use crate::model::validation::{
    require_text, validate_email, validate_optional_phone, ValidationError,
};
use crate::model::{new_record_id, Record, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Staff role; drives the default permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Director,
    Teacher,
    Assistant,
    Cook,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Director => "director",
            Self::Teacher => "teacher",
            Self::Assistant => "assistant",
            Self::Cook => "cook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    /// Stored lowercase; unique per organization.
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
    #[serde(default)]
    pub class_ids: Vec<RecordId>,
    pub hire_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Staff {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        role: StaffRole,
    ) -> Self {
        Self {
            id: new_record_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            role,
            class_ids: Vec::new(),
            hire_date: None,
            active: true,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl Record for Staff {
    const COLLECTION: &'static str = "staff";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("email", &self.email)?;
        validate_email(&self.email)?;
        validate_optional_phone(self.phone.as_deref())?;
        Ok(())
    }
}

/// Lowercases and trims an email for uniqueness comparisons.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
