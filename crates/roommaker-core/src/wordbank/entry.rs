use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub chinese: String,
    pub english: String,
    /// Lowercase slug shared with the item's image files.
    #[serde(rename = "baseName")]
    pub base_name: String,
}

impl VocabularyEntry {
    pub fn new(chinese: &str, english: &str, base_name: &str) -> Self {
        Self {
            chinese: chinese.to_string(),
            english: english.to_string(),
            base_name: base_name.to_string(),
        }
    }

    /// Check that a base name is a non-empty `[a-z0-9_-]` slug
    pub fn is_valid_base_name(base_name: &str) -> bool {
        !base_name.is_empty()
            && base_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    }
}
