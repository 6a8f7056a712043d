use serde::Serialize;

use crate::{
    canon,
    error::Result,
    reference,
    translation::VerseRecord,
    version_manager::VersionManager,
};

/// Options for [`execute_search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of hits returned.
    pub limit: usize,
    /// Minimum relevance score for free-text hits.
    pub threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            threshold: 0.0,
        }
    }
}

/// One verse hit, carrying its relevance score as auxiliary data.
///
/// The score never affects ordering; reference lookups that compute no
/// score report 1.0.
#[derive(Debug, Clone, Serialize)]
pub struct VerseHit {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub version: String,
    pub score: f32,
}

impl VerseHit {
    fn from_record(record: VerseRecord, score: f32) -> Self {
        Self {
            book: record.book,
            chapter: record.chapter,
            verse: record.verse,
            text: record.text,
            version: record.version,
            score,
        }
    }

    /// Human reference string, e.g. `John 3:16`.
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// Execute one query against one translation.
///
/// Ensures the version is loaded (awaiting any in-flight load), classifies
/// the query against the reference grammars, and falls through to fuzzy
/// free-text relevance search when no grammar matches.
///
/// Hits always come back in canonical order (book, chapter, verse
/// ascending), regardless of how they were matched: scripture reads
/// top-to-bottom in Bible order even when found by keyword.
pub async fn execute_search(
    manager: &VersionManager,
    query: &str,
    version: &str,
    options: &SearchOptions,
) -> Result<Vec<VerseHit>> {
    let index = manager.load(version).await?;
    let query = query.trim();

    let mut hits: Vec<VerseHit> = match reference::parse(query) {
        Some(reference) => index
            .verses_matching(&reference)
            .into_iter()
            .map(|record| VerseHit::from_record(record, 1.0))
            .collect(),
        None => index
            .search_text(query, options.limit, options.threshold)?
            .into_iter()
            .map(|(record, score)| VerseHit::from_record(record, score))
            .collect(),
    };

    hits.sort_by(|a, b| {
        canon::book_rank(&a.book)
            .cmp(&canon::book_rank(&b.book))
            .then(a.chapter.cmp(&b.chapter))
            .then(a.verse.cmp(&b.verse))
    });
    hits.truncate(options.limit);

    Ok(hits)
}

/// Format hits for human-readable terminal output.
pub fn format_human(hits: &[VerseHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }

    for hit in hits {
        println!("{}  {}", hit.reference(), hit.text);
    }
    println!("\n{} result(s)", hits.len());
}
