//! Meal log records.

use crate::model::validation::{require_text, ValidationError};
use crate::model::{new_record_id, Record, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Meal slot within the school day, in serving order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

/// How much of the serving the child ate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealPortion {
    Nothing,
    Little,
    Most,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub portion: MealPortion,
    /// What was served, e.g. "pasta, peas, milk".
    pub menu: String,
    pub notes: Option<String>,
    /// Staff member who logged the meal.
    pub recorded_by: Option<RecordId>,
}

impl MealRecord {
    pub fn new(
        student_id: RecordId,
        date: NaiveDate,
        meal_type: MealType,
        portion: MealPortion,
        menu: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            student_id,
            date,
            meal_type,
            portion,
            menu: menu.into(),
            notes: None,
            recorded_by: None,
        }
    }
}

impl Record for MealRecord {
    const COLLECTION: &'static str = "meals";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("menu", &self.menu)
    }
}

/// Returns the allergies mentioned in `menu`, matched case-insensitively.
pub fn allergens_in_menu(menu: &str, allergies: &[String]) -> Vec<String> {
    let menu = menu.to_lowercase();
    allergies
        .iter()
        .map(|allergy| allergy.trim())
        .filter(|allergy| !allergy.is_empty() && menu.contains(&allergy.to_lowercase()))
        .map(str::to_string)
        .collect()
}
