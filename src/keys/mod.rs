//! Key strategies for newly created meals.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Mints collection keys for entities that do not have one yet.
pub trait KeyGenerator: Send + Sync {
    fn next_key(&self) -> String;
}

/// Which [`KeyGenerator`] the application uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Time-ordered UUIDv7
    Sortable,
    /// ISO-8601 timestamp with a random suffix
    Timestamp,
}

impl KeyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::Sortable => "sortable",
            KeyStrategy::Timestamp => "timestamp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sortable" => Some(KeyStrategy::Sortable),
            "timestamp" => Some(KeyStrategy::Timestamp),
            _ => None,
        }
    }

    pub fn generator(&self) -> Arc<dyn KeyGenerator> {
        match self {
            KeyStrategy::Sortable => Arc::new(SortableKeys),
            KeyStrategy::Timestamp => Arc::new(TimestampKeys),
        }
    }
}

/// UUIDv7 keys; lexical order follows creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortableKeys;

impl KeyGenerator for SortableKeys {
    fn next_key(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// `2024-05-01T12:30:00_123Z-1a2b3c4d` style keys.
///
/// The database forbids `.` in keys, so the fraction separator becomes `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampKeys;

impl KeyGenerator for TimestampKeys {
    fn next_key(&self) -> String {
        let stamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace('.', "_");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", stamp, &suffix[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::validate_key;
    use std::collections::HashSet;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(KeyStrategy::from_str("sortable"), Some(KeyStrategy::Sortable));
        assert_eq!(
            KeyStrategy::from_str(" Timestamp "),
            Some(KeyStrategy::Timestamp)
        );
        assert_eq!(KeyStrategy::from_str("random"), None);
        assert_eq!(KeyStrategy::Timestamp.as_str(), "timestamp");
    }

    #[test]
    fn test_keys_are_valid_and_distinct() {
        for strategy in [KeyStrategy::Sortable, KeyStrategy::Timestamp] {
            let generator = strategy.generator();
            let keys: HashSet<String> = (0..500).map(|_| generator.next_key()).collect();
            assert_eq!(keys.len(), 500, "{} produced duplicates", strategy.as_str());
            for key in &keys {
                assert!(validate_key(key).is_ok(), "invalid key {}", key);
            }
        }
    }

    #[test]
    fn test_timestamp_key_shape() {
        let key = TimestampKeys.next_key();
        assert!(!key.contains('.'));
        assert!(key.contains('_'));
        assert!(key.contains('T'));
    }
}
