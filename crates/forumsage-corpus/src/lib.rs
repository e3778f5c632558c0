//! forumsage-corpus
//!
//! In-memory corpus of harvested forum threads with lexical relevance
//! search. See `loader` for the accepted on-disk layout.

pub mod category;
pub mod index;
pub mod loader;

pub use category::categorize;
pub use index::CorpusIndex;
pub use loader::{load_records, ScrapeEnvelope, ScrapeResults};
