use async_trait::async_trait;

use crate::{error::Result, translation::TranslationBook};

/// Default location for built-in translation documents, keyed by version:
/// `{base}/{version}.json`.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/thiagobodruk/bible/master/json";

/// Source of raw translation documents.
///
/// The single seam between the verse index and the network; tests swap in
/// in-memory fakes.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    /// Fetch and decode the translation document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<TranslationBook>>;
}

/// HTTP-backed translation source.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<TranslationBook>> {
        tracing::debug!(url, "fetching translation document");
        let books = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<TranslationBook>>()
            .await?;
        Ok(books)
    }
}
