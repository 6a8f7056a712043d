use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    error::Result,
    search::{self, SearchOptions, VerseHit},
    stores::{NoteRecord, NotesStore, SermonRecord, SermonStore},
    version_manager::VersionManager,
};

/// Per-category caps for the suggestion lists.
pub const BIBLE_SUGGESTION_LIMIT: usize = 5;
pub const SERMON_SUGGESTION_LIMIT: usize = 3;
pub const NOTE_SUGGESTION_LIMIT: usize = 3;

/// How long the cached sermon page stays fresh.
pub const SERMON_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Page sizes requested from the collaborators.
const SERMON_FETCH_LIMIT: usize = 100;
const NOTES_RECENT_WINDOW: usize = 50;

/// Longest note snippet surfaced in a suggestion.
const NOTE_SNIPPET_MAX_CHARS: usize = 160;

/// Which domain a [`SearchResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Bible,
    Sermon,
    Note,
}

/// One shaped suggestion, uniform across the three domains.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// The three categorized suggestion lists for one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub bible: Vec<SearchResult>,
    pub sermons: Vec<SearchResult>,
    pub notes: Vec<SearchResult>,
}

struct CachedSermons {
    fetched_at: Instant,
    sermons: Vec<SermonRecord>,
}

/// Fans one query out to the verse index, the sermon cache, and the
/// per-user notes store, and joins the three shaped result lists.
///
/// Each branch owns its caching and capping policy and contains its own
/// failures: a transient backend hiccup in one category degrades that
/// category to an empty list and never blanks the others.
pub struct Aggregator {
    manager: Arc<VersionManager>,
    sermons: Arc<dyn SermonStore>,
    notes: Arc<dyn NotesStore>,
    sermon_cache: Mutex<Option<CachedSermons>>,
    cache_ttl: Duration,
}

impl Aggregator {
    pub fn new(
        manager: Arc<VersionManager>,
        sermons: Arc<dyn SermonStore>,
        notes: Arc<dyn NotesStore>,
    ) -> Self {
        Self {
            manager,
            sermons,
            notes,
            sermon_cache: Mutex::new(None),
            cache_ttl: SERMON_CACHE_TTL,
        }
    }

    /// Override the sermon cache TTL (mainly for tests).
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Run one unified search.
    ///
    /// A blank term short-circuits to empty lists without touching any
    /// collaborator. Notes are only consulted when a user id is present.
    pub async fn search(
        &self,
        term: &str,
        user_id: Option<&str>,
        version: &str,
    ) -> SearchResponse {
        let term = term.trim();
        if term.is_empty() {
            return SearchResponse::default();
        }

        let (bible, sermons, notes) = tokio::join!(
            self.bible_results(term, version),
            self.sermon_results(term),
            self.note_results(term, user_id),
        );

        SearchResponse {
            bible,
            sermons,
            notes,
        }
    }

    async fn bible_results(&self, term: &str, version: &str) -> Vec<SearchResult> {
        let options = SearchOptions {
            limit: BIBLE_SUGGESTION_LIMIT,
            ..SearchOptions::default()
        };
        match search::execute_search(&self.manager, term, version, &options).await {
            Ok(hits) => hits.into_iter().map(verse_result).collect(),
            Err(err) => {
                warn!(error = %err, "bible suggestions unavailable");
                Vec::new()
            }
        }
    }

    async fn sermon_results(&self, term: &str) -> Vec<SearchResult> {
        let sermons = match self.cached_sermons().await {
            Ok(sermons) => sermons,
            Err(err) => {
                warn!(error = %err, "sermon suggestions unavailable");
                return Vec::new();
            }
        };

        let needle = term.to_lowercase();
        sermons
            .into_iter()
            .filter(|sermon| sermon_matches(sermon, &needle))
            .take(SERMON_SUGGESTION_LIMIT)
            .map(sermon_result)
            .collect()
    }

    async fn note_results(&self, term: &str, user_id: Option<&str>) -> Vec<SearchResult> {
        let Some(user_id) = user_id else {
            return Vec::new();
        };

        let notes = match self.notes.recent_notes(user_id, NOTES_RECENT_WINDOW).await {
            Ok(notes) => notes,
            Err(err) => {
                warn!(error = %err, "note suggestions unavailable");
                return Vec::new();
            }
        };

        let needle = term.to_lowercase();
        notes
            .into_iter()
            .filter(|note| note_matches(note, &needle))
            .take(NOTE_SUGGESTION_LIMIT)
            .map(note_result)
            .collect()
    }

    /// The sermon page, refreshed from the store only when the cached copy
    /// has outlived its TTL.
    ///
    /// The check-then-refresh runs under one async mutex so concurrent
    /// queries cannot trigger redundant refreshes.
    async fn cached_sermons(&self) -> Result<Vec<SermonRecord>> {
        let mut cache = self.sermon_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(cached.sermons.clone());
            }
        }

        let sermons = self.sermons.recent_sermons(SERMON_FETCH_LIMIT).await?;
        *cache = Some(CachedSermons {
            fetched_at: Instant::now(),
            sermons: sermons.clone(),
        });
        Ok(sermons)
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

fn sermon_matches(sermon: &SermonRecord, needle: &str) -> bool {
    sermon.title.to_lowercase().contains(needle)
        || sermon
            .summary
            .as_deref()
            .is_some_and(|summary| summary.to_lowercase().contains(needle))
        || sermon
            .outline
            .iter()
            .any(|point| point.to_lowercase().contains(needle))
}

fn note_matches(note: &NoteRecord, needle: &str) -> bool {
    note.title
        .as_deref()
        .is_some_and(|title| title.to_lowercase().contains(needle))
        || note
            .content
            .as_deref()
            .is_some_and(|content| content.to_lowercase().contains(needle))
}

fn verse_result(hit: VerseHit) -> SearchResult {
    SearchResult {
        id: format!("{}-{}-{}", hit.book, hit.chapter, hit.verse),
        kind: ResultKind::Bible,
        title: hit.reference(),
        subtitle: Some(hit.text.clone()),
        description: Some(hit.text.clone()),
        url: None,
        metadata: serde_json::json!({
            "book": hit.book,
            "chapter": hit.chapter,
            "verse": hit.verse,
            "version": hit.version,
        }),
        score: Some(hit.score),
    }
}

fn sermon_result(sermon: SermonRecord) -> SearchResult {
    SearchResult {
        id: sermon.id,
        kind: ResultKind::Sermon,
        title: sermon.title,
        subtitle: Some(sermon.date.clone()),
        description: sermon.summary,
        url: None,
        metadata: serde_json::json!({ "date": sermon.date }),
        score: None,
    }
}

fn note_result(note: NoteRecord) -> SearchResult {
    // Only a short snippet of the content leaves this function; the full
    // body has no place in a lightweight suggestion list.
    let snippet = note.content.as_deref().map(|content| {
        let mut snippet: String =
            content.chars().take(NOTE_SNIPPET_MAX_CHARS).collect();
        if snippet.len() < content.len() {
            snippet.push_str("...");
        }
        snippet
    });

    SearchResult {
        id: note.id,
        kind: ResultKind::Note,
        title: note.title.unwrap_or_else(|| "Untitled note".to_string()),
        subtitle: None,
        description: snippet,
        url: None,
        metadata: serde_json::json!({}),
        score: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::Error,
        fetch::TranslationSource,
        translation::TranslationBook,
    };

    struct FixedSource(Vec<TranslationBook>);

    #[async_trait]
    impl TranslationSource for FixedSource {
        async fn fetch(&self, _url: &str) -> Result<Vec<TranslationBook>> {
            Ok(self.0.clone())
        }
    }

    struct CountingSermonStore {
        sermons: Vec<SermonRecord>,
        calls: AtomicUsize,
    }

    impl CountingSermonStore {
        fn new(sermons: Vec<SermonRecord>) -> Self {
            Self {
                sermons,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SermonStore for CountingSermonStore {
        async fn recent_sermons(&self, limit: usize) -> Result<Vec<SermonRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut sermons = self.sermons.clone();
            sermons.truncate(limit);
            Ok(sermons)
        }
    }

    struct FixedNotesStore(Vec<NoteRecord>);

    #[async_trait]
    impl NotesStore for FixedNotesStore {
        async fn recent_notes(&self, _user_id: &str, limit: usize) -> Result<Vec<NoteRecord>> {
            let mut notes = self.0.clone();
            notes.truncate(limit);
            Ok(notes)
        }
    }

    struct FailingNotesStore;

    #[async_trait]
    impl NotesStore for FailingNotesStore {
        async fn recent_notes(&self, _user_id: &str, _limit: usize) -> Result<Vec<NoteRecord>> {
            Err(Error::Config("notes backend unreachable".into()))
        }
    }

    struct FailingSermonStore;

    #[async_trait]
    impl SermonStore for FailingSermonStore {
        async fn recent_sermons(&self, _limit: usize) -> Result<Vec<SermonRecord>> {
            Err(Error::Config("sermon backend unreachable".into()))
        }
    }

    fn manager() -> Arc<VersionManager> {
        let books = vec![TranslationBook {
            name: "John".to_string(),
            abbrev: None,
            chapters: vec![
                vec![],
                vec![],
                vec![
                    "a".to_string(),
                    "b".to_string(),
                    "c".to_string(),
                    "d".to_string(),
                    "e".to_string(),
                    "f".to_string(),
                    "g".to_string(),
                    "h".to_string(),
                    "i".to_string(),
                    "j".to_string(),
                    "k".to_string(),
                    "l".to_string(),
                    "m".to_string(),
                    "n".to_string(),
                    "o".to_string(),
                    "For God so loved the world that he gave his only Son".to_string(),
                ],
            ],
        }];
        Arc::new(VersionManager::new(
            Arc::new(FixedSource(books)),
            "https://bibles.test/json",
        ))
    }

    fn sermons() -> Vec<SermonRecord> {
        vec![
            SermonRecord {
                id: "s1".to_string(),
                title: "The love of God".to_string(),
                summary: Some("a sermon about love".to_string()),
                outline: vec![],
                date: "2024-01-07".to_string(),
            },
            SermonRecord {
                id: "s2".to_string(),
                title: "On patience".to_string(),
                summary: None,
                outline: vec!["love bears all things".to_string()],
                date: "2024-01-14".to_string(),
            },
            SermonRecord {
                id: "s3".to_string(),
                title: "Unrelated".to_string(),
                summary: Some("nothing here".to_string()),
                outline: vec![],
                date: "2024-01-21".to_string(),
            },
        ]
    }

    fn notes() -> Vec<NoteRecord> {
        vec![
            NoteRecord {
                id: "n1".to_string(),
                title: Some("Notes on love".to_string()),
                content: Some("love ".repeat(100)),
            },
            NoteRecord {
                id: "n2".to_string(),
                title: None,
                content: Some("unrelated scribble".to_string()),
            },
        ]
    }

    #[tokio::test]
    async fn blank_query_short_circuits_without_collaborator_calls() {
        let store = Arc::new(CountingSermonStore::new(sermons()));
        let aggregator = Aggregator::new(
            manager(),
            store.clone(),
            Arc::new(FixedNotesStore(notes())),
        );

        let response = aggregator.search("   ", Some("alice"), "kjv").await;
        assert!(response.bible.is_empty());
        assert!(response.sermons.is_empty());
        assert!(response.notes.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_three_categories_populate() {
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(CountingSermonStore::new(sermons())),
            Arc::new(FixedNotesStore(notes())),
        );

        let response = aggregator.search("love", Some("alice"), "kjv").await;
        assert!(!response.bible.is_empty());
        assert_eq!(response.sermons.len(), 2);
        assert_eq!(response.notes.len(), 1);

        let verse = &response.bible[0];
        assert_eq!(verse.kind, ResultKind::Bible);
        assert_eq!(verse.id, "John-3-16");
        assert_eq!(verse.title, "John 3:16");
        assert!(verse.description.as_deref().unwrap().contains("loved"));
    }

    #[tokio::test]
    async fn note_content_is_stripped_to_a_snippet() {
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(CountingSermonStore::new(vec![])),
            Arc::new(FixedNotesStore(notes())),
        );

        let response = aggregator.search("love", Some("alice"), "kjv").await;
        let note = &response.notes[0];
        let description = note.description.as_deref().unwrap();
        assert!(description.len() <= NOTE_SNIPPET_MAX_CHARS + 3);
        assert!(description.ends_with("..."));
    }

    #[tokio::test]
    async fn notes_skipped_without_user() {
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(CountingSermonStore::new(sermons())),
            Arc::new(FailingNotesStore),
        );

        let response = aggregator.search("love", None, "kjv").await;
        assert!(response.notes.is_empty());
        assert!(!response.bible.is_empty());
    }

    #[tokio::test]
    async fn failing_notes_store_does_not_blank_other_categories() {
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(CountingSermonStore::new(sermons())),
            Arc::new(FailingNotesStore),
        );

        let response = aggregator.search("love", Some("alice"), "kjv").await;
        assert!(!response.bible.is_empty());
        assert!(!response.sermons.is_empty());
        assert!(response.notes.is_empty());
    }

    #[tokio::test]
    async fn failing_sermon_store_does_not_blank_other_categories() {
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(FailingSermonStore),
            Arc::new(FixedNotesStore(notes())),
        );

        let response = aggregator.search("love", Some("alice"), "kjv").await;
        assert!(!response.bible.is_empty());
        assert!(response.sermons.is_empty());
        assert!(!response.notes.is_empty());
    }

    #[tokio::test]
    async fn sermon_cache_avoids_repeat_fetches_inside_ttl() {
        let store = Arc::new(CountingSermonStore::new(sermons()));
        let aggregator = Aggregator::new(
            manager(),
            store.clone(),
            Arc::new(FixedNotesStore(vec![])),
        );

        aggregator.search("love", None, "kjv").await;
        aggregator.search("patience", None, "kjv").await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sermon_cache_refreshes_after_ttl() {
        let store = Arc::new(CountingSermonStore::new(sermons()));
        let aggregator = Aggregator::new(
            manager(),
            store.clone(),
            Arc::new(FixedNotesStore(vec![])),
        )
        .with_cache_ttl(Duration::ZERO);

        aggregator.search("love", None, "kjv").await;
        aggregator.search("love", None, "kjv").await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sermon_results_capped() {
        let mut many = Vec::new();
        for i in 0..10 {
            many.push(SermonRecord {
                id: format!("s{i}"),
                title: format!("love sermon {i}"),
                summary: None,
                outline: vec![],
                date: "2024-01-01".to_string(),
            });
        }
        let aggregator = Aggregator::new(
            manager(),
            Arc::new(CountingSermonStore::new(many)),
            Arc::new(FixedNotesStore(vec![])),
        );

        let response = aggregator.search("love", None, "kjv").await;
        assert_eq!(response.sermons.len(), SERMON_SUGGESTION_LIMIT);
    }
}
