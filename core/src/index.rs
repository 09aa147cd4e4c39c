use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tokenizer::tokenize;

/// Synthetic document identifier, e.g. "song_0" or "resource_12".
pub type DocId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Song,
    Resource,
}

impl SourceKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SourceKind::Song => "song",
            SourceKind::Resource => "resource",
        }
    }
}

/// Stored metadata for one indexed item. Fields are copied verbatim from the
/// producer record; the raw recognized text of a song feeds the searchable
/// text but is not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Song(SongMeta),
    Resource(ResourceMeta),
}

impl Document {
    pub fn kind(&self) -> SourceKind {
        match self {
            Document::Song(_) => SourceKind::Song,
            Document::Resource(_) => SourceKind::Resource,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Document::Song(s) => &s.title,
            Document::Resource(r) => &r.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMeta {
    pub title: String,
    pub page: Option<u32>,
    pub file: Option<String>,
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub filename: String,
    pub title: String,
    pub path: Option<String>,
    pub url: Option<String>,
    pub extension: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub collection: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub track_number: u32,
}

/// Producer-side song record as emitted by the page metadata extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ocr_raw: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

/// Producer-side resource record as emitted by the file scanner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub track_number: u32,
}

/// Per-word posting: which documents contain the word, with the occurrence
/// positions per document. Documents are kept in insertion (indexing) order;
/// a document appears at most once, with all of its occurrences aggregated.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    order: Vec<DocId>,
    by_doc: HashMap<DocId, Vec<u32>>,
}

impl PostingList {
    /// Append one document's aggregated entry. Positions must be ascending.
    pub fn append(&mut self, doc: DocId, positions: Vec<u32>) -> Result<()> {
        if self.by_doc.contains_key(&doc) {
            bail!("document {doc} already present in posting");
        }
        self.order.push(doc.clone());
        self.by_doc.insert(doc, positions);
        Ok(())
    }

    /// Number of documents containing the word.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, doc: &str) -> bool {
        self.by_doc.contains_key(doc)
    }

    pub fn positions(&self, doc: &str) -> Option<&[u32]> {
        self.by_doc.get(doc).map(Vec::as_slice)
    }

    /// Occurrence count of the word in the given document.
    pub fn frequency(&self, doc: &str) -> Option<u32> {
        self.by_doc.get(doc).map(|p| p.len() as u32)
    }

    pub fn doc_ids(&self) -> &[DocId] {
        &self.order
    }

    /// Entries in insertion order as (doc id, positions).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.order
            .iter()
            .map(|id| (id.as_str(), self.by_doc[id].as_slice()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub unique_word_count: u64,
    pub total_occurrences: u64,
    pub song_count: u64,
    pub resource_count: u64,
}

/// Holds one record per indexed item. The only minter of document ids: one
/// sequential zero-based counter per source kind.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<DocId, Document>,
    next_song: u64,
    next_resource: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document under the next id for its kind and return the id.
    pub fn add(&mut self, doc: Document) -> DocId {
        let counter = match doc.kind() {
            SourceKind::Song => &mut self.next_song,
            SourceKind::Resource => &mut self.next_resource,
        };
        let id = format!("{}_{}", doc.kind().prefix(), *counter);
        *counter += 1;
        self.docs.insert(id.clone(), doc);
        id
    }

    pub fn get(&self, id: &str) -> Result<&Document> {
        self.docs
            .get(id)
            .ok_or_else(|| anyhow!("document not found: {id}"))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn song_count(&self) -> u64 {
        self.next_song
    }

    pub fn resource_count(&self) -> u64 {
        self.next_resource
    }

    fn into_documents(self) -> HashMap<DocId, Document> {
        self.docs
    }
}

/// The full inverted index: document store, word postings, and batch stats.
/// Built once per ingestion run and read-only afterwards.
#[derive(Debug, Default)]
pub struct Index {
    pub documents: HashMap<DocId, Document>,
    pub postings: HashMap<String, PostingList>,
    pub stats: IndexStats,
}

impl Index {
    pub fn document(&self, id: &str) -> Result<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| anyhow!("document not found: {id}"))
    }

    pub fn posting(&self, word: &str) -> Option<&PostingList> {
        self.postings.get(word)
    }
}

/// Accumulates a batch of documents into an [`Index`]. Ids are assigned by
/// the internal store, so a document is indexed exactly once and each word's
/// posting receives at most one entry per document.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    store: DocumentStore,
    postings: HashMap<String, PostingList>,
    total_occurrences: u64,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one song: searchable text is the title followed by the raw
    /// recognized page text, when present.
    pub fn add_song(&mut self, record: SongRecord) -> Result<DocId> {
        let mut parts: Vec<&str> = Vec::new();
        if !record.title.is_empty() {
            parts.push(&record.title);
        }
        if !record.ocr_raw.is_empty() {
            parts.push(&record.ocr_raw);
        }
        let text = parts.join(" ");

        let id = self.store.add(Document::Song(SongMeta {
            title: record.title,
            page: record.page,
            file: record.file,
            confidence: record.confidence,
        }));
        self.index_text(&id, &text)?;
        Ok(id)
    }

    /// Index one resource: searchable text is filename, title, each tag in
    /// order, then the collection name.
    pub fn add_resource(&mut self, record: ResourceRecord) -> Result<DocId> {
        let mut parts: Vec<&str> = Vec::new();
        if !record.filename.is_empty() {
            parts.push(&record.filename);
        }
        if !record.title.is_empty() {
            parts.push(&record.title);
        }
        for tag in &record.tags {
            if !tag.is_empty() {
                parts.push(tag);
            }
        }
        if !record.collection.is_empty() {
            parts.push(&record.collection);
        }
        let text = parts.join(" ");

        let id = self.store.add(Document::Resource(ResourceMeta {
            filename: record.filename,
            title: record.title,
            path: record.path,
            url: record.url,
            extension: record.extension,
            media_type: record.media_type,
            collection: record.collection,
            tags: record.tags,
            track_number: record.track_number,
        }));
        self.index_text(&id, &text)?;
        Ok(id)
    }

    fn index_text(&mut self, id: &DocId, text: &str) -> Result<()> {
        let tokens = tokenize(text);
        let mut by_word: HashMap<String, Vec<u32>> = HashMap::new();
        for (position, token) in tokens.into_iter().enumerate() {
            by_word.entry(token).or_default().push(position as u32);
        }
        for (word, positions) in by_word {
            self.total_occurrences += positions.len() as u64;
            self.postings
                .entry(word)
                .or_default()
                .append(id.clone(), positions)?;
        }
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn finish(self) -> Index {
        let stats = IndexStats {
            document_count: self.store.len() as u64,
            unique_word_count: self.postings.len() as u64,
            total_occurrences: self.total_occurrences,
            song_count: self.store.song_count(),
            resource_count: self.store.resource_count(),
        };
        Index {
            documents: self.store.into_documents(),
            postings: self.postings,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, ocr: &str) -> SongRecord {
        SongRecord {
            title: title.to_string(),
            ocr_raw: ocr.to_string(),
            ..SongRecord::default()
        }
    }

    #[test]
    fn ids_are_sequential_per_kind() {
        let mut builder = IndexBuilder::new();
        let a = builder.add_song(song("Autumn Leaves", "")).unwrap();
        let b = builder.add_song(song("Autumn Rain", "")).unwrap();
        let c = builder
            .add_resource(ResourceRecord {
                filename: "slap-basics.pdf".into(),
                ..ResourceRecord::default()
            })
            .unwrap();
        assert_eq!(a, "song_0");
        assert_eq!(b, "song_1");
        assert_eq!(c, "resource_0");
    }

    #[test]
    fn postings_aggregate_occurrences_per_document() {
        let mut builder = IndexBuilder::new();
        let id = builder.add_song(song("Groove", "groove on the groove")).unwrap();
        let index = builder.finish();

        let posting = index.posting("groove").unwrap();
        assert_eq!(posting.len(), 1);
        assert_eq!(posting.frequency(&id), Some(3));
        // Searchable text: "Groove groove on the groove"
        assert_eq!(posting.positions(&id), Some(&[0, 1, 4][..]));
    }

    #[test]
    fn frequency_matches_position_count_for_every_word() {
        let mut builder = IndexBuilder::new();
        builder.add_song(song("Blue Bossa", "bossa groove in C minor")).unwrap();
        builder
            .add_resource(ResourceRecord {
                filename: "bossa.mp3".into(),
                title: "Blue Bossa playalong".into(),
                tags: vec!["bossa".into(), "latin".into()],
                collection: "playalongs".into(),
                ..ResourceRecord::default()
            })
            .unwrap();
        let index = builder.finish();

        for posting in index.postings.values() {
            assert_eq!(posting.doc_ids().len(), posting.len());
            for (_, positions) in posting.iter() {
                assert!(!positions.is_empty());
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn resource_fields_feed_searchable_text_in_order() {
        let mut builder = IndexBuilder::new();
        let id = builder
            .add_resource(ResourceRecord {
                filename: "track01.mp3".into(),
                title: "Walking lines".into(),
                tags: vec!["jazz".into(), "walking".into()],
                collection: "standards".into(),
                ..ResourceRecord::default()
            })
            .unwrap();
        let index = builder.finish();

        // "track01 mp3 walking lines jazz walking standards"
        assert_eq!(index.posting("track01").unwrap().positions(&id), Some(&[0][..]));
        assert_eq!(index.posting("walking").unwrap().positions(&id), Some(&[2, 5][..]));
        assert_eq!(index.posting("standards").unwrap().positions(&id), Some(&[6][..]));
    }

    #[test]
    fn missing_fields_contribute_no_tokens() {
        let mut builder = IndexBuilder::new();
        let id = builder.add_song(song("Solo", "")).unwrap();
        let index = builder.finish();
        assert_eq!(index.posting("solo").unwrap().positions(&id), Some(&[0][..]));
        assert_eq!(index.stats.total_occurrences, 1);
    }

    #[test]
    fn stats_count_kinds_and_words() {
        let mut builder = IndexBuilder::new();
        builder.add_song(song("Autumn Leaves", "")).unwrap();
        builder.add_song(song("Autumn Rain", "")).unwrap();
        builder
            .add_resource(ResourceRecord {
                filename: "autumn.pdf".into(),
                collection: "scores".into(),
                ..ResourceRecord::default()
            })
            .unwrap();
        let index = builder.finish();

        assert_eq!(index.stats.document_count, 3);
        assert_eq!(index.stats.song_count, 2);
        assert_eq!(index.stats.resource_count, 1);
        // autumn, leaves, rain, pdf, scores
        assert_eq!(index.stats.unique_word_count, 5);
        assert_eq!(index.stats.total_occurrences, 7);
    }

    #[test]
    fn rebuilding_the_same_batch_is_deterministic() {
        let build = || {
            let mut builder = IndexBuilder::new();
            builder.add_song(song("Autumn Leaves", "autumn leaves in G minor")).unwrap();
            builder
                .add_resource(ResourceRecord {
                    filename: "autumn.pdf".into(),
                    collection: "scores".into(),
                    ..ResourceRecord::default()
                })
                .unwrap();
            builder.finish()
        };
        let first = build();
        let second = build();

        assert_eq!(first.stats, second.stats);
        assert_eq!(first.documents, second.documents);
        assert_eq!(first.postings.len(), second.postings.len());
        for (word, posting) in &first.postings {
            let other = second.posting(word).unwrap();
            assert_eq!(posting.doc_ids(), other.doc_ids());
            for (doc, positions) in posting.iter() {
                assert_eq!(other.positions(doc), Some(positions));
            }
        }
    }

    #[test]
    fn document_store_assigns_and_retrieves() {
        let mut store = DocumentStore::new();
        let id = store.add(Document::Song(SongMeta {
            title: "Moondance".into(),
            page: None,
            file: None,
            confidence: None,
        }));
        assert_eq!(id, "song_0");
        assert_eq!(store.get(&id).unwrap().title(), "Moondance");
        assert!(store.get("resource_0").is_err());
    }

    #[test]
    fn store_get_fails_for_unknown_id() {
        let index = IndexBuilder::new().finish();
        let err = index.document("song_42").unwrap_err();
        assert!(err.to_string().contains("song_42"));
    }

    #[test]
    fn posting_rejects_duplicate_document_entry() {
        let mut posting = PostingList::default();
        posting.append("song_0".into(), vec![0]).unwrap();
        assert!(posting.append("song_0".into(), vec![1]).is_err());
    }
}
