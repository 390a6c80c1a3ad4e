use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetCategory {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A pet as published by the pet-store source. Records in the wild often
/// omit the category or name, so both default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    #[serde(default)]
    pub category: PetCategory,
    #[serde(default)]
    pub name: String,
}

/// Which write target a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkSource {
    Cache,
    Catalog,
}

impl fmt::Display for SinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkSource::Cache => f.write_str("cache"),
            SinkSource::Catalog => f.write_str("catalog"),
        }
    }
}

/// What a sink task reports back over the fan-in channel.
#[derive(Debug, Clone)]
pub struct SinkResult {
    pub id: i64,
    pub error: Option<String>,
    pub source: SinkSource,
    /// Only meaningful when `error` is set.
    pub retryable: bool,
}

impl SinkResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFailure {
    pub source: SinkSource,
    pub message: String,
    pub retryable: bool,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Outcome of saving a single pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Already present in the cache; nothing was written.
    Skipped,
}

/// Counters for one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub fetched: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pet_with_missing_fields() {
        let pets: Vec<Pet> = serde_json::from_str(
            r#"[
                {"id": 7, "name": "rex", "category": {"id": 1, "name": "dogs"}, "status": "sold"},
                {"id": 8}
            ]"#,
        )
        .unwrap();

        assert_eq!(pets[0].category.name, "dogs");
        assert_eq!(pets[0].name, "rex");
        assert_eq!(pets[1].category, PetCategory::default());
        assert!(pets[1].name.is_empty());
    }

    #[test]
    fn failure_display_names_the_sink() {
        let failure = SinkFailure {
            source: SinkSource::Catalog,
            message: "category not created".into(),
            retryable: false,
        };
        assert_eq!(failure.to_string(), "catalog: category not created");
    }
}
