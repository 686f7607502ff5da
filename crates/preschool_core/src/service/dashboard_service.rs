//! Read-only dashboard aggregates for one organization and date.

use crate::model::attendance::{AttendanceRate, AttendanceRecord};
use crate::model::class::Class;
use crate::model::staff::Staff;
use crate::model::student::{Student, StudentStatus};
use crate::model::OrganizationId;
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter};
use crate::repo::record_store::RecordStore;
use crate::service::error::ServiceResult;
use chrono::NaiveDate;

/// Headline numbers shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardOverview {
    pub date: NaiveDate,
    pub active_students: u64,
    pub waitlisted_students: u64,
    pub active_staff: u64,
    pub classes: u64,
    /// Students checked in and not yet checked out.
    pub checked_in_now: u64,
    /// Students marked present or late.
    pub present_today: u64,
    /// `None` before any countable record exists for the date.
    pub attendance_rate: Option<f64>,
}

pub struct DashboardService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> DashboardService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    pub fn overview(&self, date: NaiveDate) -> ServiceResult<DashboardOverview> {
        let org = self.organization_id;
        let by_status = |status: StudentStatus| {
            DocumentQuery::new().filter(Filter::eq("status", status.as_str()))
        };

        let active_students = self
            .store
            .count_records::<Student>(org, &by_status(StudentStatus::Active))?;
        let waitlisted_students = self
            .store
            .count_records::<Student>(org, &by_status(StudentStatus::Waitlist))?;
        let active_staff = self.store.count_records::<Staff>(
            org,
            &DocumentQuery::new().filter(Filter::eq("active", true)),
        )?;
        let classes = self
            .store
            .count_records::<Class>(org, &DocumentQuery::new())?;

        let records: Vec<AttendanceRecord> = self.store.list_records(
            org,
            &DocumentQuery::new().filter(Filter::eq("date", date.to_string())),
        )?;
        let rate = AttendanceRate::from_records(&records);
        let checked_in_now = records.iter().filter(|record| record.is_on_site()).count();

        Ok(DashboardOverview {
            date,
            active_students,
            waitlisted_students,
            active_staff,
            classes,
            checked_in_now: checked_in_now as u64,
            present_today: u64::from(rate.attended()),
            attendance_rate: rate.rate(),
        })
    }
}
