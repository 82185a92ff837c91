//! Meal model matching the records stored under the meals collection.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value stored at a collection key.
///
/// Every field is optional; the key itself is never part of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta_description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub full_description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub featured_image: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    /// Positive decimal numeral without currency sign
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
}

/// A meal as shown in the list: the record plus the key it lives under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub record: MealRecord,
}

impl Meal {
    pub fn new(id: impl Into<String>, record: MealRecord) -> Self {
        Self {
            id: Some(id.into()),
            record,
        }
    }

    /// Cost rounded to two decimals with a dollar sign.
    ///
    /// Follows numeric coercion of text: a missing or unparseable cost shows
    /// as `$NaN`, a blank one as `$0.00`.
    pub fn display_cost(&self) -> String {
        let amount = self
            .record
            .cost
            .as_deref()
            .map_or(f64::NAN, |raw| coerce_number(raw.trim()));

        if amount.is_infinite() {
            let sign = if amount < 0.0 { "-" } else { "" };
            format!("${}Infinity", sign)
        } else {
            format!("${:.2}", amount)
        }
    }

    /// `location | date`, with missing parts left empty.
    pub fn caption(&self) -> String {
        format!(
            "{} | {}",
            self.record.location.as_deref().unwrap_or_default(),
            self.record.date.as_deref().unwrap_or_default()
        )
    }
}

/// Text to number the way loosely typed clients do it. Only the spelled-out
/// `Infinity` forms are infinite; `inf` and `nan` are not numbers.
fn coerce_number(raw: &str) -> f64 {
    match raw {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if raw
            .bytes()
            .any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) =>
        {
            f64::NAN
        }
        _ => raw.parse().unwrap_or(f64::NAN),
    }
}

/// Accept scalars written by other clients (numbers for cost, mostly) as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected text, found {}",
            other
        ))),
    }
}
