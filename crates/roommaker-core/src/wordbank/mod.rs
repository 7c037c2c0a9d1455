//! Bilingual vocabulary grouped by room.
//!
//! This module provides the `WordBank` consumed by the game UI:
//!
//! - `VocabularyEntry`: a Chinese term, its English term and the asset slug
//! - `WordBank`: ordered room categories, English room labels and lookups
//! - `builtin`: the shipped data set (living room, bedroom, kitchen, bathroom)
//!
//! A word bank can also be loaded from a JSON file so the data set can be
//! changed without a rebuild.

pub mod builtin;
pub mod entry;
pub mod error;
pub mod store;

pub use entry::VocabularyEntry;
pub use error::WordBankError;
pub use store::WordBank;
