//! Organization (tenant) and per-organization settings records.

use crate::model::validation::{
    parse_clock_time, require_text, validate_optional_email, validate_optional_phone,
    ValidationError,
};
use crate::model::{new_record_id, now_epoch_ms, OrganizationId, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    #[default]
    Active,
    Suspended,
}

impl OrganizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

/// Tenant root record. Every other record is namespaced under its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub status: OrganizationStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            address: None,
            phone: None,
            email: None,
            status: OrganizationStatus::Active,
            created_at: now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        validate_optional_email(self.email.as_deref())?;
        validate_optional_phone(self.phone.as_deref())?;
        Ok(())
    }
}

/// School-wide settings, stored as a singleton keyed by organization ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    pub organization_id: OrganizationId,
    pub school_name: String,
    /// Local `HH:MM`.
    pub opening_time: String,
    /// Local `HH:MM`.
    pub closing_time: String,
    /// Check-ins later than opening plus this many minutes count as late.
    pub late_after_minutes: u32,
    /// Total licensed capacity across all classes.
    pub capacity: u32,
    pub meal_tracking_enabled: bool,
    pub notify_guardians_on_check_in: bool,
    /// Offset of local school time from UTC.
    pub utc_offset_minutes: i32,
}

impl OrganizationSettings {
    pub fn default_for(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            school_name: String::new(),
            opening_time: "07:00".to_string(),
            closing_time: "18:00".to_string(),
            late_after_minutes: 15,
            capacity: 60,
            meal_tracking_enabled: true,
            notify_guardians_on_check_in: false,
            utc_offset_minutes: 0,
        }
    }

    /// Opening time in minutes after local midnight.
    pub fn opening_minutes(&self) -> Option<u32> {
        parse_clock_time(&self.opening_time)
    }

    pub fn closing_minutes(&self) -> Option<u32> {
        parse_clock_time(&self.closing_time)
    }

    /// Whether a check-in at `at_epoch_ms` is past the late threshold.
    pub fn is_late_check_in(&self, at_epoch_ms: i64) -> bool {
        let Some(opening) = self.opening_minutes() else {
            return false;
        };
        let local_minutes = at_epoch_ms.div_euclid(60_000) + i64::from(self.utc_offset_minutes);
        let minute_of_day = local_minutes.rem_euclid(24 * 60);
        minute_of_day > i64::from(opening) + i64::from(self.late_after_minutes)
    }
}

impl Record for OrganizationSettings {
    const COLLECTION: &'static str = "settings";

    fn id(&self) -> RecordId {
        self.organization_id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("school_name", &self.school_name)?;
        let opening = self.opening_minutes().ok_or_else(|| {
            ValidationError::invalid("opening_time", "expected 24-hour HH:MM")
        })?;
        let closing = self.closing_minutes().ok_or_else(|| {
            ValidationError::invalid("closing_time", "expected 24-hour HH:MM")
        })?;
        if closing <= opening {
            return Err(ValidationError::invalid(
                "closing_time",
                "must be later than opening_time",
            ));
        }
        if u64::from(opening) + u64::from(self.late_after_minutes) >= u64::from(closing) {
            return Err(ValidationError::invalid(
                "late_after_minutes",
                "late threshold must fall before closing_time",
            ));
        }
        if self.capacity == 0 {
            return Err(ValidationError::invalid("capacity", "must be greater than zero"));
        }
        if !(-14 * 60..=14 * 60).contains(&self.utc_offset_minutes) {
            return Err(ValidationError::invalid(
                "utc_offset_minutes",
                "must be within +/- 14 hours",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Organization, OrganizationSettings};
    use crate::model::Record;
    use uuid::Uuid;

    #[test]
    fn late_threshold_uses_opening_time_grace_and_offset() {
        let mut settings = OrganizationSettings::default_for(Uuid::new_v4());
        settings.school_name = "Sunnyside".to_string();
        settings.opening_time = "08:00".to_string();
        settings.late_after_minutes = 10;

        let day_start = 1_700_006_400_000_i64 - 1_700_006_400_000_i64 % 86_400_000;
        let at = |h: i64, m: i64| day_start + (h * 60 + m) * 60_000;
        assert!(!settings.is_late_check_in(at(8, 10)));
        assert!(settings.is_late_check_in(at(8, 11)));

        settings.utc_offset_minutes = -60;
        assert!(!settings.is_late_check_in(at(9, 5)));
        assert!(settings.is_late_check_in(at(9, 15)));
    }

    #[test]
    fn settings_reject_inverted_hours() {
        let mut settings = OrganizationSettings::default_for(Uuid::new_v4());
        settings.school_name = "Sunnyside".to_string();
        assert!(settings.validate().is_ok());

        settings.closing_time = "06:00".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_reject_late_threshold_past_closing() {
        let mut settings = OrganizationSettings::default_for(Uuid::new_v4());
        settings.school_name = "Sunnyside".to_string();
        settings.late_after_minutes = 11 * 60 - 1;
        assert!(settings.validate().is_ok());

        settings.late_after_minutes = 11 * 60;
        assert!(settings.validate().is_err());
        settings.late_after_minutes = u32::MAX;
        assert!(settings.validate().is_err());
        assert!(!settings.is_late_check_in(1_700_000_000_000));
    }

    #[test]
    fn organization_requires_name() {
        assert!(Organization::new("  ").validate().is_err());
        assert!(Organization::new("Sunnyside").validate().is_ok());
    }
}
