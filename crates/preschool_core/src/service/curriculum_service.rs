//! Curriculum planning use-cases.

use crate::model::class::Class;
use crate::model::curriculum::{CurriculumItem, LessonStatus};
use crate::model::validation::ValidationError;
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter, OrderDirection};
use crate::repo::record_store::RecordStore;
use crate::service::error::{read_back, require_record, ServiceResult};
use chrono::NaiveDate;
use log::info;

pub struct CurriculumService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> CurriculumService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    pub fn create_item(&self, item: &CurriculumItem) -> ServiceResult<CurriculumItem> {
        self.ensure_class(item)?;
        self.store.create_record(self.organization_id, item)?;
        info!(
            "event=curriculum_create module=service status=ok organization_id={} item_id={}",
            self.organization_id, item.id
        );
        read_back(
            &self.store,
            self.organization_id,
            item.id,
            "created curriculum item not found in read-back",
        )
    }

    pub fn get_item(&self, id: RecordId) -> ServiceResult<Option<CurriculumItem>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    pub fn update_item(&self, item: &CurriculumItem) -> ServiceResult<CurriculumItem> {
        self.ensure_class(item)?;
        self.store.update_record(self.organization_id, item)?;
        read_back(
            &self.store,
            self.organization_id,
            item.id,
            "updated curriculum item not found in read-back",
        )
    }

    pub fn delete_item(&self, id: RecordId) -> ServiceResult<()> {
        self.store
            .delete_record::<CurriculumItem>(self.organization_id, id)?;
        Ok(())
    }

    /// Items planned for one class, ordered by planned date.
    pub fn items_for_class(&self, class_id: RecordId) -> ServiceResult<Vec<CurriculumItem>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("class_id", class_id.to_string()))
            .order_by("planned_date", OrderDirection::Asc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Week or term plan: items dated within `[from, to]`, optionally for one class.
    pub fn items_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        class_id: Option<RecordId>,
    ) -> ServiceResult<Vec<CurriculumItem>> {
        if from > to {
            return Err(
                ValidationError::invalid("date_range", "`from` must not be after `to`").into(),
            );
        }
        let mut query = DocumentQuery::new()
            .filter(Filter::gte("planned_date", from.to_string()))
            .filter(Filter::lte("planned_date", to.to_string()))
            .order_by("planned_date", OrderDirection::Asc);
        if let Some(class_id) = class_id {
            query = query.filter(Filter::eq("class_id", class_id.to_string()));
        }
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Marks an item completed. Completing twice is a no-op.
    pub fn mark_completed(&self, id: RecordId) -> ServiceResult<CurriculumItem> {
        let mut item: CurriculumItem = require_record(&self.store, self.organization_id, id)?;
        if item.status == LessonStatus::Completed {
            return Ok(item);
        }
        item.status = LessonStatus::Completed;
        self.store.update_record(self.organization_id, &item)?;
        read_back(
            &self.store,
            self.organization_id,
            id,
            "completed curriculum item not found in read-back",
        )
    }

    fn ensure_class(&self, item: &CurriculumItem) -> ServiceResult<()> {
        if let Some(class_id) = item.class_id {
            require_record::<_, Class>(&self.store, self.organization_id, class_id)?;
        }
        Ok(())
    }
}
