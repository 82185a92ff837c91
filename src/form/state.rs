//! Editable state of one meal form.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Local;
use serde_json::Value;

use super::rules::Field;
use crate::models::{Meal, MealRecord};

/// Field values and inline errors of the meal being created or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealForm {
    prior_id: Option<String>,
    values: BTreeMap<Field, String>,
    errors: BTreeMap<Field, &'static str>,
}

impl MealForm {
    /// Blank form for a new meal, dated today.
    pub fn new(date_format: &str) -> Self {
        Self::from_meal(None, date_format)
    }

    /// Form pre-filled from an existing meal.
    pub fn edit(meal: &Meal, date_format: &str) -> Self {
        Self::from_meal(Some(meal), date_format)
    }

    /// Build the form from navigation parameters of the shape `{"item": Meal}`.
    ///
    /// Missing or unreadable parameters open a form for a new meal.
    pub fn from_route(params: Option<&Value>, date_format: &str) -> Self {
        let item = params
            .ok_or("no route parameters")
            .and_then(|p| p.get("item").ok_or("no item in route parameters"))
            .and_then(|item| {
                serde_json::from_value::<Meal>(item.clone()).map_err(|_| "unreadable item")
            });

        match item {
            Ok(meal) => Self::edit(&meal, date_format),
            Err(reason) => {
                tracing::debug!("Opening blank meal form: {}", reason);
                Self::new(date_format)
            }
        }
    }

    fn from_meal(meal: Option<&Meal>, date_format: &str) -> Self {
        let record = meal.map(|m| m.record.clone()).unwrap_or_default();
        let mut values: BTreeMap<Field, String> = Field::ALL
            .into_iter()
            .map(|field| (field, record_value(&record, field).unwrap_or_default()))
            .collect();

        if record.date.is_none() {
            values.insert(Field::Date, today(date_format));
        }

        Self {
            prior_id: meal.and_then(|m| m.id.clone()).filter(|id| !id.is_empty()),
            values,
            errors: BTreeMap::new(),
        }
    }

    /// Key of the meal being edited; `None` when creating.
    pub fn id(&self) -> Option<&str> {
        self.prior_id.as_deref()
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or_default()
    }

    /// Update a field and re-check its rule.
    pub fn set_value(&mut self, field: Field, value: impl Into<String>) -> Option<&'static str> {
        self.values.insert(field, value.into());
        self.check(field)
    }

    pub fn error(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    pub fn errors(&self) -> &BTreeMap<Field, &'static str> {
        &self.errors
    }

    /// Check every field. Returns `true` when the form can be submitted.
    pub fn validate(&mut self) -> bool {
        for field in Field::ALL {
            self.check(field);
        }
        self.errors.is_empty()
    }

    fn check(&mut self, field: Field) -> Option<&'static str> {
        match field.rule().check(self.value(field)) {
            Ok(()) => {
                self.errors.remove(&field);
                None
            }
            Err(message) => {
                self.errors.insert(field, message);
                Some(message)
            }
        }
    }

    /// The record to write. Blank fields are left out.
    pub fn to_record(&self) -> MealRecord {
        let take = |field: Field| {
            let value = self.value(field);
            (!value.trim().is_empty()).then(|| value.to_string())
        };

        MealRecord {
            title: take(Field::Title),
            meta_description: take(Field::MetaDescription),
            full_description: take(Field::FullDescription),
            featured_image: take(Field::FeaturedImage),
            location: take(Field::Location),
            cost: take(Field::Cost),
            date: take(Field::Date),
        }
    }
}

fn record_value(record: &MealRecord, field: Field) -> Option<String> {
    match field {
        Field::Title => record.title.clone(),
        Field::MetaDescription => record.meta_description.clone(),
        Field::FullDescription => record.full_description.clone(),
        Field::FeaturedImage => record.featured_image.clone(),
        Field::Location => record.location.clone(),
        Field::Cost => record.cost.clone(),
        Field::Date => record.date.clone(),
    }
}

/// Today's local date in `format`, falling back to ISO when the format is unusable.
pub fn today(format: &str) -> String {
    let now = Local::now();
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_err() {
        return now.format("%Y-%m-%d").to_string();
    }
    out
}
