use tantivy::{
    Index,
    IndexReader,
    TantivyDocument,
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{
    canon,
    error::Result,
    reference::Reference,
    translation::{self, TranslationBook, VerseRecord},
};

/// Field names used in the schema.
pub mod fields {
    pub const BOOK: &str = "book";
    pub const CHAPTER: &str = "chapter";
    pub const VERSE: &str = "verse";
    pub const TEXT: &str = "text";
}

/// Minimum term length for fuzzy expansion in free-text queries.
const FUZZY_MIN_TERM_LEN: usize = 3;

const WRITER_MEMORY_BUDGET: usize = 15_000_000;

/// One translation's searchable verse index.
///
/// Holds the flat verse records for structured reference scans and an
/// in-RAM Tantivy index for free-text relevance queries. Immutable once
/// built; replacing a translation means building a fresh index.
pub struct VerseIndex {
    version: String,
    records: Vec<VerseRecord>,
    books: Vec<String>,
    index: Index,
    reader: IndexReader,
    schema: Schema,
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
struct SchemaFields {
    book: Field,
    chapter: Field,
    verse: Field,
    text: Field,
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    let book = builder.add_text_field(fields::BOOK, text_opts.clone());
    let chapter = builder.add_u64_field(fields::CHAPTER, STORED | FAST);
    let verse = builder.add_u64_field(fields::VERSE, STORED | FAST);
    let text = builder.add_text_field(fields::TEXT, text_opts);

    let schema = builder.build();
    let fields = SchemaFields {
        book,
        chapter,
        verse,
        text,
    };

    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

impl VerseIndex {
    /// Build a fresh in-memory index for one translation document.
    pub fn from_books(version: &str, books: &[TranslationBook]) -> Result<Self> {
        let records = translation::flatten(books, version);
        Self::from_records(version, records)
    }

    /// Build an index directly from flattened verse records.
    pub fn from_records(version: &str, records: Vec<VerseRecord>) -> Result<Self> {
        let (schema, f) = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizers(&index);

        let mut writer = index.writer(WRITER_MEMORY_BUDGET)?;
        for record in &records {
            writer.add_document(doc!(
                f.book => record.book.as_str(),
                f.chapter => u64::from(record.chapter),
                f.verse => u64::from(record.verse),
                f.text => record.text.as_str(),
            ))?;
        }
        writer.commit()?;

        let reader = index.reader()?;

        let mut book_names: Vec<String> = Vec::new();
        for record in &records {
            if book_names.last() != Some(&record.book)
                && !book_names.contains(&record.book)
            {
                book_names.push(record.book.clone());
            }
        }

        Ok(Self {
            version: version.to_string(),
            records,
            books: book_names,
            index,
            reader,
            schema,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// All verse records of this translation, in source order.
    pub fn records(&self) -> &[VerseRecord] {
        &self.records
    }

    /// Distinct book names of this translation, in source order.
    pub fn books(&self) -> &[String] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a typed book name against this translation's book list.
    ///
    /// Users type partial or abbreviated names, so matching is
    /// case-insensitive and tiered: exact match wins over prefix match,
    /// prefix over substring. Ties go to the book earliest in the canon.
    pub fn match_book(&self, name: &str) -> Option<&str> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        self.books
            .iter()
            .enumerate()
            .filter_map(|(position, book)| {
                let candidate = book.to_lowercase();
                let tier = if candidate == needle {
                    0
                } else if candidate.starts_with(&needle) {
                    1
                } else if candidate.contains(&needle) {
                    2
                } else {
                    return None;
                };
                Some((tier, canon::book_rank(book), position, book))
            })
            .min_by_key(|&(tier, rank, position, _)| (tier, rank, position))
            .map(|(_, _, _, book)| book.as_str())
    }

    /// All verses addressed by a structured reference.
    ///
    /// The fuzzily matched book name acts as a coarse pre-filter; the
    /// chapter/verse bounds then apply exactly. An unresolvable book name
    /// yields no verses.
    pub fn verses_matching(&self, reference: &Reference) -> Vec<VerseRecord> {
        let Some(book) = self.match_book(reference.book()) else {
            tracing::debug!(
                book = reference.book(),
                version = %self.version,
                "reference book did not match any book in translation"
            );
            return Vec::new();
        };
        let book = book.to_string();

        self.records
            .iter()
            .filter(|record| {
                record.book == book && reference.includes(record.chapter, record.verse)
            })
            .cloned()
            .collect()
    }

    /// Free-text relevance search over verse text and book names.
    ///
    /// Combines a stemmed BM25 query (book field boosted 2x) with fuzzy
    /// term queries of Levenshtein distance 1 on the verse text, filters
    /// by `threshold`, and returns at most `limit` scored records. The
    /// caller is responsible for canonical ordering.
    pub fn search_text(
        &self,
        query_str: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<(VerseRecord, f32)>> {
        if limit == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let f = self.schema_fields();
        let searcher = self.reader.searcher();

        let mut parser =
            QueryParser::for_index(&self.index, vec![f.book, f.text]);
        parser.set_field_boost(f.book, 2.0);
        let (bm25_query, _errors) = parser.parse_query_lenient(query_str);

        let mut should_clauses: Vec<(
            tantivy::query::Occur,
            Box<dyn tantivy::query::Query>,
        )> = vec![(tantivy::query::Occur::Should, bm25_query)];

        for term_str in query_str.split_whitespace() {
            if term_str.len() >= FUZZY_MIN_TERM_LEN {
                let term = tantivy::Term::from_field_text(
                    f.text,
                    &term_str.to_lowercase(),
                );
                let fuzzy = tantivy::query::FuzzyTermQuery::new(term, 1, true);
                should_clauses
                    .push((tantivy::query::Occur::Should, Box::new(fuzzy)));
            }
        }

        let combined = tantivy::query::BooleanQuery::new(should_clauses);
        let top_docs =
            searcher.search(&combined, &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            if score < threshold {
                continue;
            }
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            results.push((
                VerseRecord {
                    book: extract_text(&doc, f.book),
                    chapter: extract_u64(&doc, f.chapter) as u32,
                    verse: extract_u64(&doc, f.verse) as u32,
                    text: extract_text(&doc, f.text),
                    version: self.version.clone(),
                },
                score,
            ));
        }

        Ok(results)
    }

    fn schema_fields(&self) -> SchemaFields {
        let f = |name: &str| self.schema.get_field(name).unwrap();
        SchemaFields {
            book: f(fields::BOOK),
            chapter: f(fields::CHAPTER),
            verse: f(fields::VERSE),
            text: f(fields::TEXT),
        }
    }
}

impl std::fmt::Debug for VerseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerseIndex")
            .field("version", &self.version)
            .field("verses", &self.records.len())
            .finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;

    fn book(name: &str, chapters: Vec<Vec<&str>>) -> TranslationBook {
        TranslationBook {
            name: name.to_string(),
            abbrev: None,
            chapters: chapters
                .into_iter()
                .map(|c| c.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }

    fn sample_index() -> VerseIndex {
        let books = vec![
            book(
                "Genesis",
                vec![vec![
                    "In the beginning God created the heaven and the earth.",
                    "And the earth was without form, and void.",
                ]],
            ),
            book(
                "John",
                vec![
                    vec!["In the beginning was the Word."],
                    vec![],
                    vec![
                        "And as Moses lifted up the serpent.",
                        "For God so loved the world.",
                        "He that believeth on him is not condemned.",
                    ],
                ],
            ),
            book(
                "1 John",
                vec![vec!["That which was from the beginning."]],
            ),
        ];
        VerseIndex::from_books("kjv", &books).unwrap()
    }

    #[test]
    fn build_flattens_all_verses() {
        let index = sample_index();
        assert_eq!(index.len(), 7);
        assert_eq!(index.books(), &["Genesis", "John", "1 John"]);
        assert_eq!(index.version(), "kjv");
    }

    #[test]
    fn match_book_exact_beats_prefix() {
        let index = sample_index();
        // "John" is an exact match even though it is also a substring of
        // "1 John".
        assert_eq!(index.match_book("John"), Some("John"));
        assert_eq!(index.match_book("john"), Some("John"));
    }

    #[test]
    fn match_book_partial_names() {
        let index = sample_index();
        assert_eq!(index.match_book("Gen"), Some("Genesis"));
        assert_eq!(index.match_book("1 jo"), Some("1 John"));
    }

    #[test]
    fn match_book_unknown_is_none() {
        let index = sample_index();
        assert_eq!(index.match_book("Ezekiel"), None);
        assert_eq!(index.match_book(""), None);
    }

    #[test]
    fn verses_matching_single_reference() {
        let index = sample_index();
        let r = reference::parse("John 3:2").unwrap();
        let verses = index.verses_matching(&r);
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].book, "John");
        assert_eq!(verses[0].chapter, 3);
        assert_eq!(verses[0].verse, 2);
        assert_eq!(verses[0].text, "For God so loved the world.");
    }

    #[test]
    fn verses_matching_range() {
        let index = sample_index();
        let r = reference::parse("John 3:1-2").unwrap();
        let verses = index.verses_matching(&r);
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].verse, 1);
        assert_eq!(verses[1].verse, 2);
    }

    #[test]
    fn verses_matching_unknown_book_is_empty() {
        let index = sample_index();
        let r = reference::parse("Ezekiel 1:1").unwrap();
        assert!(index.verses_matching(&r).is_empty());
    }

    #[test]
    fn search_text_finds_relevant_verses() {
        let index = sample_index();
        let results = index.search_text("loved the world", 10, 0.0).unwrap();
        assert!(!results.is_empty());
        let (top, score) = &results[0];
        assert_eq!(top.verse, 2);
        assert_eq!(top.chapter, 3);
        assert!(*score > 0.0);
    }

    #[test]
    fn search_text_fuzzy_tolerates_a_typo() {
        let index = sample_index();
        // "begining" (one 'n') should still reach "beginning" verses.
        let results = index.search_text("begining", 10, 0.0).unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn search_text_matches_book_names() {
        let index = sample_index();
        let results = index.search_text("Genesis", 10, 0.0).unwrap();
        assert!(results.iter().any(|(r, _)| r.book == "Genesis"));
    }

    #[test]
    fn search_text_respects_limit() {
        let index = sample_index();
        let results = index.search_text("the", 2, 0.0).unwrap();
        assert!(results.len() <= 2);
    }

    #[test]
    fn search_text_threshold_filters_everything_when_high() {
        let index = sample_index();
        let results = index.search_text("beginning", 10, 999.0).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_text_zero_limit_is_empty() {
        let index = sample_index();
        assert!(index.search_text("beginning", 0, 0.0).unwrap().is_empty());
    }

    #[test]
    fn empty_translation_builds() {
        let index = VerseIndex::from_books("empty", &[]).unwrap();
        assert!(index.is_empty());
        assert!(index.search_text("anything", 10, 0.0).unwrap().is_empty());
    }
}
