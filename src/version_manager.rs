use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::watch;

use crate::{
    error::{Error, Result},
    fetch::{DEFAULT_BASE_URL, HttpSource, TranslationSource},
    verse_index::VerseIndex,
};

/// Well-known version key whose source URL must be registered before use.
pub const CUSTOM_VERSION: &str = "custom";

/// Outcome of one load, shared with every caller that awaited it. The
/// error side carries only the message so the outcome stays cloneable.
type LoadOutcome = std::result::Result<Arc<VerseIndex>, String>;

enum VersionState {
    /// A load is in flight; the channel publishes its outcome once.
    Loading {
        generation: u64,
        tx: watch::Sender<Option<LoadOutcome>>,
    },
    /// The index is built and immutable.
    Ready(Arc<VerseIndex>),
}

/// Owns one lazily built [`VerseIndex`] per translation version.
///
/// Loading is memoized per version: concurrent callers for a version that
/// is not ready yet attach to the single in-flight load instead of issuing
/// duplicate fetches. A failed load clears its in-flight marker so a later
/// call retries cleanly; it never leaves a version stuck in a loading
/// state or registers a partially built index.
pub struct VersionManager {
    source: Arc<dyn TranslationSource>,
    base_url: String,
    states: Mutex<HashMap<String, VersionState>>,
    custom_sources: Mutex<HashMap<String, String>>,
    generation: AtomicU64,
}

impl VersionManager {
    pub fn new(source: Arc<dyn TranslationSource>, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            states: Mutex::new(HashMap::new()),
            custom_sources: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// An HTTP-backed manager pointing at the default translation host.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(HttpSource::new()), DEFAULT_BASE_URL)
    }

    /// Ensure `version` is loaded, returning its index.
    ///
    /// No-op when ready; awaits the shared in-flight load when one exists;
    /// otherwise fetches, flattens, and indexes the translation document.
    pub async fn load(&self, version: &str) -> Result<Arc<VerseIndex>> {
        self.load_inner(version, None).await
    }

    /// Like [`load`](Self::load), with an explicit source URL overriding
    /// both the registered custom sources and the base URL.
    pub async fn load_with_url(&self, version: &str, url: &str) -> Result<Arc<VerseIndex>> {
        self.load_inner(version, Some(url)).await
    }

    /// Register or replace the source URL for a named custom version and
    /// eagerly rebuild its index.
    ///
    /// Replacement is total: on success the new index atomically supplants
    /// the old one, which keeps serving queries until the swap. On failure
    /// the version's state is cleared entirely so stale verses from the
    /// previous source cannot outlive the re-registration.
    pub async fn register_custom_source(
        &self,
        name: &str,
        url: &str,
    ) -> Result<Arc<VerseIndex>> {
        self.custom_sources
            .lock()
            .unwrap()
            .insert(name.to_string(), url.to_string());

        let outcome = self.build(name, Some(url)).await;
        let mut states = self.states.lock().unwrap();
        match outcome {
            Ok(index) => {
                tracing::info!(
                    version = name,
                    verses = index.len(),
                    "custom source registered"
                );
                states.insert(name.to_string(), VersionState::Ready(index.clone()));
                Ok(index)
            }
            Err(err) => {
                states.remove(name);
                Err(err)
            }
        }
    }

    /// Register a custom source URL without triggering a rebuild.
    ///
    /// Used to hydrate previously persisted registrations at startup; the
    /// index is then built lazily on first query as usual.
    pub fn seed_custom_source(&self, name: &str, url: &str) {
        self.custom_sources
            .lock()
            .unwrap()
            .insert(name.to_string(), url.to_string());
    }

    /// Drop a custom source registration and any index built from it.
    pub fn remove_custom_source(&self, name: &str) -> bool {
        let removed = self.custom_sources.lock().unwrap().remove(name).is_some();
        if removed {
            self.states.lock().unwrap().remove(name);
        }
        removed
    }

    /// Whether `version` currently has a ready index.
    pub fn is_ready(&self, version: &str) -> bool {
        matches!(
            self.states.lock().unwrap().get(version),
            Some(VersionState::Ready(_))
        )
    }

    async fn load_inner(
        &self,
        version: &str,
        explicit_url: Option<&str>,
    ) -> Result<Arc<VerseIndex>> {
        loop {
            enum Entry {
                Ready(Arc<VerseIndex>),
                Wait(watch::Receiver<Option<LoadOutcome>>),
                Load(u64),
            }

            let entry = {
                let mut states = self.states.lock().unwrap();
                match states.get(version) {
                    Some(VersionState::Ready(index)) => Entry::Ready(index.clone()),
                    Some(VersionState::Loading { tx, .. }) => Entry::Wait(tx.subscribe()),
                    None => {
                        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                        let (tx, _rx) = watch::channel(None);
                        states.insert(
                            version.to_string(),
                            VersionState::Loading { generation, tx },
                        );
                        Entry::Load(generation)
                    }
                }
            };

            match entry {
                Entry::Ready(index) => return Ok(index),
                Entry::Load(generation) => {
                    return self.run_load(version, explicit_url, generation).await;
                }
                Entry::Wait(mut rx) => loop {
                    let outcome = (*rx.borrow()).clone();
                    if let Some(outcome) = outcome {
                        return outcome.map_err(|message| Error::Load {
                            version: version.to_string(),
                            message,
                        });
                    }
                    if rx.changed().await.is_err() {
                        // The load was superseded (e.g. by a custom-source
                        // re-registration) before publishing; re-enter the
                        // state machine.
                        break;
                    }
                },
            }
        }
    }

    async fn run_load(
        &self,
        version: &str,
        explicit_url: Option<&str>,
        generation: u64,
    ) -> Result<Arc<VerseIndex>> {
        tracing::debug!(version, "loading translation");
        let outcome = self.build(version, explicit_url).await;
        let shared: LoadOutcome = match &outcome {
            Ok(index) => Ok(index.clone()),
            Err(err) => Err(err.to_string()),
        };

        let tx = {
            let mut states = self.states.lock().unwrap();
            let current = matches!(
                states.get(version),
                Some(VersionState::Loading { generation: g, .. }) if *g == generation
            );
            if current {
                let previous = match &outcome {
                    Ok(index) => states
                        .insert(version.to_string(), VersionState::Ready(index.clone())),
                    Err(_) => states.remove(version),
                };
                match previous {
                    Some(VersionState::Loading { tx, .. }) => Some(tx),
                    _ => None,
                }
            } else {
                None
            }
        };

        if let Some(tx) = tx {
            let _ = tx.send(Some(shared));
        }

        match &outcome {
            Ok(index) => {
                tracing::info!(version, verses = index.len(), "translation ready")
            }
            Err(err) => tracing::warn!(version, error = %err, "translation load failed"),
        }
        outcome
    }

    async fn build(
        &self,
        version: &str,
        explicit_url: Option<&str>,
    ) -> Result<Arc<VerseIndex>> {
        let url = self.resolve_url(version, explicit_url)?;
        let books = self.source.fetch(&url).await?;
        let index = VerseIndex::from_books(version, &books)?;
        Ok(Arc::new(index))
    }

    fn resolve_url(&self, version: &str, explicit: Option<&str>) -> Result<String> {
        if let Some(url) = explicit {
            return Ok(url.to_string());
        }
        if let Some(url) = self.custom_sources.lock().unwrap().get(version) {
            return Ok(url.clone());
        }
        if version == CUSTOM_VERSION {
            return Err(Error::MissingSource(version.to_string()));
        }
        Ok(format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            version
        ))
    }
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
