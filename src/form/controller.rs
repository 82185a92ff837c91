//! Submit handling for the meal form.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::rules::Field;
use super::state::MealForm;
use super::Navigator;
use crate::errors::AppError;
use crate::keys::KeyGenerator;
use crate::store::{CollectionPath, CollectionStore};

/// What a submit attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Rules failed; nothing was written.
    Invalid(BTreeMap<Field, &'static str>),
    /// The record was accepted at `key`.
    Saved { key: String, created: bool },
    /// The store rejected the write; the form is unchanged.
    Failed(AppError),
}

/// Writes meal forms to a collection.
pub struct FormController<S> {
    store: Arc<S>,
    path: CollectionPath,
    keys: Arc<dyn KeyGenerator>,
}

impl<S> Clone for FormController<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
            keys: self.keys.clone(),
        }
    }
}

impl<S: CollectionStore> FormController<S> {
    pub fn new(store: Arc<S>, path: CollectionPath, keys: Arc<dyn KeyGenerator>) -> Self {
        Self { store, path, keys }
    }

    /// Validate, then create or replace the meal.
    ///
    /// A form without an id gets a freshly minted key; an edited meal keeps
    /// its key and is overwritten in full.
    pub async fn submit<N: Navigator>(
        &self,
        form: &mut MealForm,
        navigator: &mut N,
    ) -> SubmitOutcome {
        if !form.validate() {
            tracing::debug!("Meal form has {} invalid fields", form.errors().len());
            return SubmitOutcome::Invalid(form.errors().clone());
        }

        let (key, created) = match form.id() {
            Some(id) => (id.to_string(), false),
            None => (self.keys.next_key(), true),
        };

        let record = match serde_json::to_value(form.to_record()) {
            Ok(record) => record,
            Err(e) => return self.fail(AppError::from(e), navigator),
        };

        match self.store.write(&self.path, &key, record).await {
            Ok(()) => {
                tracing::info!(
                    "{} meal {} in {}",
                    if created { "Created" } else { "Updated" },
                    key,
                    self.path
                );
                navigator.dismiss_keyboard();
                navigator.pop_to_top();
                SubmitOutcome::Saved { key, created }
            }
            Err(e) => self.fail(e, navigator),
        }
    }

    fn fail<N: Navigator>(&self, error: AppError, navigator: &mut N) -> SubmitOutcome {
        tracing::warn!("Saving meal to {} failed: {}", self.path, error);
        navigator.alert(&error.to_string());
        SubmitOutcome::Failed(error)
    }
}
