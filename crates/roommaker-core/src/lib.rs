//! Room Maker core library.
//!
//! Provides the two pieces of the bilingual room vocabulary game that live
//! outside the UI:
//!
//! - [`wordbank`]: the Chinese/English vocabulary grouped by room, with
//!   English room labels and a flattened item list.
//! - [`offline`]: the offline asset cache that pre-caches the game's routes on
//!   install, evicts old versions on activate and answers fetches cache-first.

pub mod config;
pub mod offline;
pub mod wordbank;

pub use config::Config;
pub use offline::{CacheLifecycle, OfflineCacheManager, OfflineError};
pub use wordbank::{VocabularyEntry, WordBank, WordBankError};
