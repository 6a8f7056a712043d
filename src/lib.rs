//! scriptura - an in-memory scripture search engine.
//!
//! scriptura lazily indexes Bible translations into per-version in-RAM
//! [Tantivy](https://github.com/quickwit-oss/tantivy) indexes, answers
//! structured reference queries ("John 3:16-18", "Proverbs 1:6-5:2") and
//! fuzzy free-text queries in canonical reading order, and fans a single
//! query out to sermon and notes collaborators for unified suggestions.
//!
//! # Quick start
//!
//! ```no_run
//! use scriptura::{SearchOptions, VersionManager, search};
//!
//! # async fn run() -> scriptura::Result<()> {
//! let manager = VersionManager::with_defaults();
//!
//! // First call fetches and indexes the translation; later calls hit the
//! // in-memory index directly.
//! let hits = search::execute_search(
//!     &manager,
//!     "John 3:16",
//!     "kjv",
//!     &SearchOptions::default(),
//! )
//! .await?;
//!
//! for hit in &hits {
//!     println!("{}  {}", hit.reference(), hit.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod canon;
pub mod cli;
pub mod data_dir;
pub mod error;
pub mod fetch;
pub mod history;
pub mod reference;
pub mod search;
pub mod stores;
pub mod translation;
pub mod verse_index;
pub mod version_manager;

pub use aggregator::{Aggregator, ResultKind, SearchResponse, SearchResult};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use history::SearchHistory;
pub use search::{SearchOptions, VerseHit};
pub use translation::{TranslationBook, VerseRecord};
pub use verse_index::VerseIndex;
pub use version_manager::VersionManager;
