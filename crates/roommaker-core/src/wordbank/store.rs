use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builtin;
use super::{VocabularyEntry, WordBankError};

/// A room and its items, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub items: Vec<VocabularyEntry>,
}

/// On-disk layout of a word bank file.
#[derive(Debug, Deserialize)]
struct WordBankFile {
    categories: Vec<CategoryFile>,
}

#[derive(Debug, Deserialize)]
struct CategoryFile {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    items: Vec<VocabularyEntry>,
}

/// Read-only vocabulary grouped by room, with an English label per room.
#[derive(Debug, Clone)]
pub struct WordBank {
    categories: Vec<Category>,
    labels: HashMap<String, String>,
}

impl WordBank {
    /// Build and validate a word bank.
    ///
    /// Every category needs a label and every label needs a category. Base
    /// names must be valid slugs and unique within their category, but may
    /// repeat across categories.
    pub fn new(
        categories: Vec<Category>,
        labels: HashMap<String, String>,
    ) -> Result<Self, WordBankError> {
        let mut seen_keys = HashSet::new();

        for category in &categories {
            if category.key.trim().is_empty() {
                return Err(WordBankError::EmptyCategoryKey);
            }
            if !seen_keys.insert(category.key.as_str()) {
                return Err(WordBankError::DuplicateCategory(category.key.clone()));
            }
            if !labels.contains_key(&category.key) {
                return Err(WordBankError::MissingLabel(category.key.clone()));
            }

            let mut seen_names = HashSet::new();
            for item in &category.items {
                if !VocabularyEntry::is_valid_base_name(&item.base_name) {
                    return Err(WordBankError::InvalidBaseName {
                        category: category.key.clone(),
                        base_name: item.base_name.clone(),
                    });
                }
                if !seen_names.insert(item.base_name.as_str()) {
                    return Err(WordBankError::DuplicateBaseName {
                        category: category.key.clone(),
                        base_name: item.base_name.clone(),
                    });
                }
            }
        }

        // Sorted so the reported key does not depend on hash order
        let mut orphans: Vec<&String> = labels
            .keys()
            .filter(|key| !seen_keys.contains(key.as_str()))
            .collect();
        orphans.sort();
        if let Some(orphan) = orphans.first() {
            return Err(WordBankError::OrphanLabel((*orphan).clone()));
        }

        Ok(Self { categories, labels })
    }

    /// The shipped data set.
    pub fn builtin() -> Self {
        let mut categories = Vec::with_capacity(builtin::CATEGORIES.len());
        let mut labels = HashMap::with_capacity(builtin::CATEGORIES.len());

        for (key, label, items) in builtin::CATEGORIES {
            categories.push(Category {
                key: key.to_string(),
                items: items
                    .iter()
                    .map(|(chinese, english, base_name)| {
                        VocabularyEntry::new(chinese, english, base_name)
                    })
                    .collect(),
            });
            labels.insert(key.to_string(), label.to_string());
        }

        Self { categories, labels }
    }

    /// Parse a word bank from JSON:
    /// `{"categories": [{"key": "客廳", "label": "Living Room", "items": [...]}]}`
    pub fn from_json(json: &str) -> Result<Self, WordBankError> {
        let file: WordBankFile = serde_json::from_str(json)?;

        let mut categories = Vec::with_capacity(file.categories.len());
        let mut labels = HashMap::with_capacity(file.categories.len());
        for category in file.categories {
            if let Some(label) = category.label {
                labels.insert(category.key.clone(), label);
            }
            categories.push(Category {
                key: category.key,
                items: category.items,
            });
        }

        Self::new(categories, labels)
    }

    /// Load a word bank from a JSON file
    pub fn load(path: &Path) -> Result<Self, WordBankError> {
        let contents = std::fs::read_to_string(path)?;
        let bank = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            categories = bank.categories.len(),
            items = bank.len(),
            "Loaded word bank from disk"
        );
        Ok(bank)
    }

    /// All categories in declaration order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Items of one category, if it exists
    pub fn category(&self, key: &str) -> Option<&[VocabularyEntry]> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.items.as_slice())
    }

    /// Every item of every category, rooms in declaration order.
    pub fn all_items(&self) -> Vec<&VocabularyEntry> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter())
            .collect()
    }

    /// English display label for a category key.
    ///
    /// Unknown keys are an error rather than a fallback label, so a typo in
    /// UI code shows up instead of rendering a blank heading.
    pub fn category_label(&self, key: &str) -> Result<&str, WordBankError> {
        self.labels
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| WordBankError::UnknownCategory(key.to_string()))
    }

    /// Every `(category key, entry)` using the given base name
    pub fn entries_with_base_name(&self, base_name: &str) -> Vec<(&str, &VocabularyEntry)> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter().map(move |item| (c.key.as_str(), item)))
            .filter(|(_, item)| item.base_name == base_name)
            .collect()
    }

    /// Total number of items across all categories
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WordBank {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Tests
// ============================================================================
