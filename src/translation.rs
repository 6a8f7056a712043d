use serde::{Deserialize, Serialize};

/// One book of a translation source document.
///
/// The wire format is an array of these per version:
/// `[{ "name": "...", "abbrev": "...", "chapters": [["verse", ...], ...] }]`
/// where `chapters[c][v]` holds the text of chapter `c + 1`, verse `v + 1`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationBook {
    pub name: String,
    #[serde(default)]
    pub abbrev: Option<String>,
    pub chapters: Vec<Vec<String>>,
}

/// One indexed (book, chapter, verse) unit of text within one version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerseRecord {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub version: String,
}

/// Flatten a translation document into individual verse records.
///
/// Chapter and verse numbers are 1-based positions in the source arrays.
pub fn flatten(books: &[TranslationBook], version: &str) -> Vec<VerseRecord> {
    let mut records = Vec::new();
    for book in books {
        for (chapter_idx, chapter) in book.chapters.iter().enumerate() {
            for (verse_idx, text) in chapter.iter().enumerate() {
                records.push(VerseRecord {
                    book: book.name.clone(),
                    chapter: chapter_idx as u32 + 1,
                    verse: verse_idx as u32 + 1,
                    text: text.clone(),
                    version: version.to_string(),
                });
            }
        }
    }
    records
}
