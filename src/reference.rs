use std::sync::LazyLock;

use regex::Regex;

/// A structured scripture reference parsed from a query string.
///
/// Three shorthand syntaxes are recognized, tried in this order:
/// cross-chapter range (`Proverbs 1:6-5:2`), same-chapter range
/// (`John 3:16-18`), then single reference (`John 3` / `John 3:16`).
/// Anything else is free text and parses to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    CrossChapterRange {
        book: String,
        start_chapter: u32,
        start_verse: u32,
        end_chapter: u32,
        end_verse: u32,
    },
    ChapterRange {
        book: String,
        chapter: u32,
        start_verse: u32,
        end_verse: u32,
    },
    Single {
        book: String,
        chapter: u32,
        verse: Option<u32>,
    },
}

static CROSS_CHAPTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(\d+):(\d+)\s*-\s*(\d+):(\d+)$").unwrap());
static SAME_CHAPTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(\d+):(\d+)\s*-\s*(\d+)$").unwrap());
static SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(\d+)(?::(\d+))?$").unwrap());

/// Parse a trimmed query string against the reference grammars.
///
/// Returns `None` when the query does not address scripture directly, in
/// which case the caller falls through to free-text search. This function
/// never fails: malformed references are simply not references.
pub fn parse(query: &str) -> Option<Reference> {
    let query = query.trim();

    if let Some(caps) = CROSS_CHAPTER.captures(query) {
        if let (Some(c1), Some(v1), Some(c2), Some(v2)) = (
            number(&caps, 2),
            number(&caps, 3),
            number(&caps, 4),
            number(&caps, 5),
        ) {
            return Some(Reference::CrossChapterRange {
                book: caps[1].trim().to_string(),
                start_chapter: c1,
                start_verse: v1,
                end_chapter: c2,
                end_verse: v2,
            });
        }
    }

    if let Some(caps) = SAME_CHAPTER.captures(query) {
        if let (Some(chapter), Some(v1), Some(v2)) =
            (number(&caps, 2), number(&caps, 3), number(&caps, 4))
        {
            return Some(Reference::ChapterRange {
                book: caps[1].trim().to_string(),
                chapter,
                start_verse: v1,
                end_verse: v2,
            });
        }
    }

    if let Some(caps) = SINGLE.captures(query) {
        if let Some(chapter) = number(&caps, 2) {
            let verse = match caps.get(3) {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            };
            return Some(Reference::Single {
                book: caps[1].trim().to_string(),
                chapter,
                verse,
            });
        }
    }

    None
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

impl Reference {
    /// The book portion of the reference, exactly as the user typed it.
    pub fn book(&self) -> &str {
        match self {
            Reference::CrossChapterRange { book, .. } => book,
            Reference::ChapterRange { book, .. } => book,
            Reference::Single { book, .. } => book,
        }
    }

    /// Whether a verse at `(chapter, verse)` falls inside this reference.
    ///
    /// Range bounds are inclusive; for a cross-chapter range the verse
    /// bounds only apply on the boundary chapters, and every chapter
    /// strictly between them is included in full.
    pub fn includes(&self, chapter: u32, verse: u32) -> bool {
        match *self {
            Reference::CrossChapterRange {
                start_chapter,
                start_verse,
                end_chapter,
                end_verse,
                ..
            } => {
                chapter >= start_chapter
                    && chapter <= end_chapter
                    && (chapter != start_chapter || verse >= start_verse)
                    && (chapter != end_chapter || verse <= end_verse)
            }
            Reference::ChapterRange {
                chapter: c,
                start_verse,
                end_verse,
                ..
            } => chapter == c && verse >= start_verse && verse <= end_verse,
            Reference::Single {
                chapter: c,
                verse: v,
                ..
            } => chapter == c && v.is_none_or(|v| v == verse),
        }
    }
}
