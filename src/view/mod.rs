//! List screen: cards for the live list plus the edit and delete actions.

use std::fmt;
use std::sync::Arc;

use crate::errors::AppError;
use crate::form::{FormController, MealForm};
use crate::keys::KeyGenerator;
use crate::models::Meal;
use crate::store::{CollectionPath, CollectionStore};
use crate::subscriber::{CollectionSubscriber, MountedCollection};

/// What one list row shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealCard {
    pub id: Option<String>,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image: Option<String>,
    pub caption: String,
}

impl From<&Meal> for MealCard {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id.clone(),
            title: meal.record.title.clone().unwrap_or_default(),
            price: meal.display_cost(),
            description: meal.record.full_description.clone().unwrap_or_default(),
            image: meal.record.featured_image.clone(),
            caption: meal.caption(),
        }
    }
}

impl fmt::Display for MealCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  {}", self.title, self.price)?;
        if !self.description.is_empty() {
            writeln!(f, "  {}", self.description)?;
        }
        if let Some(image) = &self.image {
            writeln!(f, "  [{}]", image)?;
        }
        write!(f, "  {}", self.caption)
    }
}

/// Render the whole list as plain text.
pub fn render_list(meals: &[Meal]) -> String {
    if meals.is_empty() {
        return "No meals yet.".to_string();
    }
    meals
        .iter()
        .map(|meal| MealCard::from(meal).to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The mounted list view. Owns the only subscription on the collection.
pub struct ListScreen<S> {
    store: Arc<S>,
    mounted: MountedCollection,
    date_format: String,
}

impl<S: CollectionStore> ListScreen<S> {
    pub fn mount(
        store: Arc<S>,
        path: &CollectionPath,
        date_format: impl Into<String>,
    ) -> Result<Self, AppError> {
        let mounted = CollectionSubscriber::mount(store.as_ref(), path)?;
        Ok(Self {
            store,
            mounted,
            date_format: date_format.into(),
        })
    }

    pub fn meals(&self) -> Vec<Meal> {
        self.mounted.entities()
    }

    pub fn cards(&self) -> Vec<MealCard> {
        self.meals().iter().map(MealCard::from).collect()
    }

    /// Wait for the next published list.
    pub async fn changed(&mut self) -> Result<Vec<Meal>, AppError> {
        self.mounted.changed().await
    }

    /// Form for a new meal.
    pub fn create(&self) -> MealForm {
        MealForm::new(&self.date_format)
    }

    /// Controller that saves forms opened from this list.
    pub fn form_controller(&self, keys: Arc<dyn KeyGenerator>) -> FormController<S> {
        FormController::new(self.store.clone(), self.mounted.path().clone(), keys)
    }

    /// Form pre-filled from `meal`.
    pub fn edit(&self, meal: &Meal) -> MealForm {
        MealForm::edit(meal, &self.date_format)
    }

    /// Remove `meal` from the collection.
    ///
    /// Returns `false` without contacting the store when the meal has no id.
    /// The list itself only changes once the store pushes the next snapshot.
    pub async fn delete(&self, meal: &Meal) -> Result<bool, AppError> {
        let Some(id) = meal.id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::debug!("Ignoring delete of a meal without an id");
            return Ok(false);
        };

        let path = self.mounted.path();
        match self.store.remove(path, id).await {
            Ok(()) => {
                tracing::info!("Removed meal {} from {}", id, path);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Removing meal {} from {} failed: {}", id, path, e);
                Err(e)
            }
        }
    }
}
