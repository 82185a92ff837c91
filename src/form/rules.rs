//! Declarative field rules for the meal form.

use once_cell::sync::Lazy;
use regex::Regex;

/// Editable fields of a meal, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    MetaDescription,
    FullDescription,
    FeaturedImage,
    Location,
    Cost,
    Date,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Title,
        Field::MetaDescription,
        Field::FullDescription,
        Field::FeaturedImage,
        Field::Location,
        Field::Cost,
        Field::Date,
    ];

    /// Key of the field in the stored record.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::MetaDescription => "meta_description",
            Field::FullDescription => "full_description",
            Field::FeaturedImage => "featured_image",
            Field::Location => "location",
            Field::Cost => "cost",
            Field::Date => "date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn rule(&self) -> &'static FieldRule {
        // MEAL_FORM lists every field in ALL order.
        &MEAL_FORM[*self as usize]
    }
}

/// How a field is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Multiline { lines: u8 },
    /// Carried through the form without being shown
    Hidden,
}

#[derive(Debug)]
pub struct PatternRule {
    pub regex: Regex,
    pub message: &'static str,
}

/// Label, presentation, and validation of one field.
#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    pub label: &'static str,
    pub kind: InputKind,
    /// Message shown when a required field is blank
    pub required: Option<&'static str>,
    /// Applied to non-blank values only
    pub pattern: Option<PatternRule>,
}

impl FieldRule {
    fn optional(field: Field, label: &'static str, kind: InputKind) -> Self {
        Self {
            field,
            label,
            kind,
            required: None,
            pattern: None,
        }
    }

    /// Check `value`, returning the message to show next to the field.
    ///
    /// Whitespace does not satisfy `required`. Patterns skip only empty input.
    pub fn check(&self, value: &str) -> Result<(), &'static str> {
        if let Some(message) = self.required {
            if value.trim().is_empty() {
                return Err(message);
            }
        }
        if value.is_empty() {
            return Ok(());
        }

        match &self.pattern {
            Some(pattern) if !pattern.regex.is_match(value) => Err(pattern.message),
            _ => Ok(()),
        }
    }
}

pub const TITLE_REQUIRED: &str = "Title is required";
pub const INVALID_PRICE: &str = "Please enter a valid price";

/// Positive decimal numeral: leading non-zero digit, optional fraction.
const PRICE_PATTERN: &str = r"^[1-9]\d*(\.\d+)?$";

pub static MEAL_FORM: Lazy<Vec<FieldRule>> = Lazy::new(|| {
    vec![
        FieldRule {
            required: Some(TITLE_REQUIRED),
            ..FieldRule::optional(Field::Title, "Title", InputKind::Text)
        },
        FieldRule::optional(
            Field::MetaDescription,
            "Meta Description",
            InputKind::Multiline { lines: 4 },
        ),
        FieldRule::optional(
            Field::FullDescription,
            "Full Description",
            InputKind::Multiline { lines: 4 },
        ),
        FieldRule::optional(Field::FeaturedImage, "Featured Image", InputKind::Hidden),
        FieldRule::optional(Field::Location, "Location", InputKind::Text),
        FieldRule {
            pattern: Some(PatternRule {
                regex: Regex::new(PRICE_PATTERN).expect("price pattern compiles"),
                message: INVALID_PRICE,
            }),
            ..FieldRule::optional(Field::Cost, "Cost", InputKind::Text)
        },
        FieldRule::optional(Field::Date, "Date", InputKind::Text),
    ]
});
