use thiserror::Error;

#[derive(Error, Debug)]
pub enum WordBankError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category '{0}' has no display label")]
    MissingLabel(String),

    #[error("Label given for category '{0}' which has no items")]
    OrphanLabel(String),

    #[error("Category key must not be empty")]
    EmptyCategoryKey,

    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("Invalid base name '{base_name}' in category '{category}'")]
    InvalidBaseName { category: String, base_name: String },

    #[error("Base name '{base_name}' appears more than once in category '{category}'")]
    DuplicateBaseName { category: String, base_name: String },

    #[error("Failed to parse word bank: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read word bank: {0}")]
    Io(#[from] std::io::Error),
}
