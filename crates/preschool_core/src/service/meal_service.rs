//! Meal logging use-cases.
//!
//! # Invariants
//! - Meals are only logged while the organization has meal tracking enabled.
//! - Allergy alerts are computed on every log and never block the write.

use crate::model::meal::{allergens_in_menu, MealPortion, MealRecord, MealType};
use crate::model::student::Student;
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter};
use crate::repo::record_store::RecordStore;
use crate::service::error::{read_back, require_record, ServiceError, ServiceResult};
use crate::service::organization_service::load_settings;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;

/// Input for logging one meal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealLogRequest {
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub portion: MealPortion,
    pub menu: String,
    pub notes: Option<String>,
    pub recorded_by: Option<RecordId>,
}

/// Stored meal plus any student allergens found in its menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealLogOutcome {
    pub record: MealRecord,
    pub allergy_alerts: Vec<String>,
}

/// Portion counts for one meal type on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealTypeSummary {
    pub meal_type: MealType,
    pub nothing: u32,
    pub little: u32,
    pub most: u32,
    pub all: u32,
}

impl MealTypeSummary {
    fn empty(meal_type: MealType) -> Self {
        Self {
            meal_type,
            nothing: 0,
            little: 0,
            most: 0,
            all: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.nothing + self.little + self.most + self.all
    }

    fn add(&mut self, portion: MealPortion) {
        match portion {
            MealPortion::Nothing => self.nothing += 1,
            MealPortion::Little => self.little += 1,
            MealPortion::Most => self.most += 1,
            MealPortion::All => self.all += 1,
        }
    }
}

pub struct MealService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> MealService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Logs one meal and reports allergens the menu mentions.
    ///
    /// # Errors
    /// - `InvalidState` when meal tracking is disabled for the organization.
    /// - `NotFound` when the student does not exist.
    pub fn log_meal(&self, request: &MealLogRequest) -> ServiceResult<MealLogOutcome> {
        let settings = load_settings(&self.store, self.organization_id)?;
        if !settings.meal_tracking_enabled {
            return Err(ServiceError::InvalidState(
                "meal tracking is disabled for this organization".to_string(),
            ));
        }
        let student: Student =
            require_record(&self.store, self.organization_id, request.student_id)?;

        let mut record = MealRecord::new(
            student.id,
            request.date,
            request.meal_type,
            request.portion,
            request.menu.trim(),
        );
        record.notes = request.notes.clone();
        record.recorded_by = request.recorded_by;
        let id = self.store.create_record(self.organization_id, &record)?;

        let allergy_alerts = allergens_in_menu(&record.menu, &student.allergies);
        if allergy_alerts.is_empty() {
            info!(
                "event=meal_log module=service status=ok organization_id={} student_id={} meal_id={id}",
                self.organization_id, student.id
            );
        } else {
            warn!(
                "event=meal_log module=service status=ok organization_id={} student_id={} meal_id={id} allergy_alerts={}",
                self.organization_id,
                student.id,
                allergy_alerts.len()
            );
        }

        let record = read_back(
            &self.store,
            self.organization_id,
            id,
            "logged meal not found in read-back",
        )?;
        Ok(MealLogOutcome {
            record,
            allergy_alerts,
        })
    }

    pub fn update_meal(&self, record: &MealRecord) -> ServiceResult<MealRecord> {
        self.store.update_record(self.organization_id, record)?;
        read_back(
            &self.store,
            self.organization_id,
            record.id,
            "updated meal not found in read-back",
        )
    }

    pub fn delete_meal(&self, id: RecordId) -> ServiceResult<()> {
        self.store
            .delete_record::<MealRecord>(self.organization_id, id)?;
        Ok(())
    }

    /// Meals of one student on one date, in meal order.
    pub fn meals_for_student(
        &self,
        student_id: RecordId,
        date: NaiveDate,
    ) -> ServiceResult<Vec<MealRecord>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("student_id", student_id.to_string()))
            .filter(Filter::eq("date", date.to_string()));
        let mut meals: Vec<MealRecord> = self.store.list_records(self.organization_id, &query)?;
        meals.sort_by_key(|meal| meal.meal_type);
        Ok(meals)
    }

    /// All meals logged on one date, in meal order then logging order.
    pub fn meals_for_date(&self, date: NaiveDate) -> ServiceResult<Vec<MealRecord>> {
        let query = DocumentQuery::new().filter(Filter::eq("date", date.to_string()));
        let mut meals: Vec<MealRecord> = self.store.list_records(self.organization_id, &query)?;
        meals.sort_by_key(|meal| meal.meal_type);
        Ok(meals)
    }

    /// Portion counts per meal type for one date, in meal order.
    pub fn daily_meal_summary(&self, date: NaiveDate) -> ServiceResult<Vec<MealTypeSummary>> {
        let mut by_type: BTreeMap<MealType, MealTypeSummary> = BTreeMap::new();
        for meal in self.meals_for_date(date)? {
            by_type
                .entry(meal.meal_type)
                .or_insert_with(|| MealTypeSummary::empty(meal.meal_type))
                .add(meal.portion);
        }
        Ok(by_type.into_values().collect())
    }
}
