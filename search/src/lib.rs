use anyhow::{anyhow, Result};
use bassline_core::persist::{load_index, LoadedIndex, INDEX_VERSION};
use bassline_core::tokenizer::tokenize;
use bassline_core::{DocId, Document, Index};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_MAX_RESULTS: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: DocId,
    pub document: Document,
    pub score: u32,
    pub matched_phrase: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub search_type: String,
    pub index_version: String,
    pub total_documents_searched: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchHit>,
    pub metadata: SearchMetadata,
}

#[derive(Debug)]
struct Attached {
    index: Index,
    version: String,
}

/// Read-only query engine over a loaded index. Rebuilds swap a completely
/// built index in atomically; concurrent readers keep the `Arc` they took
/// and never observe a partially built posting.
#[derive(Debug)]
pub struct SearchEngine {
    state: RwLock<Option<Arc<Attached>>>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    /// Load the artifact at `path` and return an engine serving it.
    pub fn open(path: &Path) -> Result<Self> {
        let engine = Self::new();
        engine.attach_artifact(path)?;
        Ok(engine)
    }

    /// Replace the served index with the artifact at `path`.
    pub fn attach_artifact(&self, path: &Path) -> Result<()> {
        let LoadedIndex { metadata, index } = load_index(path)?;
        tracing::info!(
            documents = index.stats.document_count,
            unique_words = index.stats.unique_word_count,
            version = %metadata.version,
            "index loaded"
        );
        self.swap_in(index, metadata.version);
        Ok(())
    }

    /// Replace the served index with a freshly built one.
    pub fn attach(&self, index: Index) {
        self.swap_in(index, INDEX_VERSION.to_string());
    }

    fn swap_in(&self, index: Index, version: String) {
        let attached = Arc::new(Attached { index, version });
        *self.state.write() = Some(attached);
    }

    fn attached(&self) -> Result<Arc<Attached>> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| anyhow!("no index loaded; attach an index before searching"))
    }

    /// Answer an exact-phrase query. Empty queries, unknown words, and
    /// phrases with no match all resolve to an empty result list, never an
    /// error; the only failure is searching before an index is attached.
    pub fn search(&self, query: &str, max_results: usize) -> Result<SearchResponse> {
        let attached = self.attached()?;
        let index = &attached.index;
        let tokens = tokenize(query);

        let mut candidates = match tokens.len() {
            0 => Vec::new(),
            1 => single_word_candidates(index, &tokens[0]),
            _ => phrase_candidates(index, &tokens),
        };
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates.truncate(max_results);

        let matched_phrase = tokens.join(" ");
        let results: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|c| {
                index.documents.get(&c.id).map(|doc| SearchHit {
                    id: c.id,
                    document: doc.clone(),
                    score: c.score,
                    matched_phrase: matched_phrase.clone(),
                })
            })
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            total_results: results.len(),
            results,
            metadata: SearchMetadata {
                search_type: "exact_phrase".to_string(),
                index_version: attached.version.clone(),
                total_documents_searched: index.stats.document_count,
            },
        })
    }
}

struct Candidate {
    id: DocId,
    score: u32,
}

/// Pure word-frequency query: one candidate per posting entry, in posting
/// (indexing) order.
fn single_word_candidates(index: &Index, word: &str) -> Vec<Candidate> {
    let Some(posting) = index.posting(word) else {
        return Vec::new();
    };
    posting
        .iter()
        .map(|(doc, positions)| Candidate {
            id: doc.to_string(),
            score: positions.len() as u32,
        })
        .collect()
}

/// Consecutive-phrase query: all-or-nothing containment, then positional
/// adjacency over the intersection of the tokens' documents. Candidates keep
/// the first token's posting order.
fn phrase_candidates(index: &Index, tokens: &[String]) -> Vec<Candidate> {
    let mut postings = Vec::with_capacity(tokens.len());
    for token in tokens {
        match index.posting(token) {
            Some(posting) => postings.push(posting),
            None => return Vec::new(),
        }
    }

    let Some((first, rest)) = postings.split_first() else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    'docs: for (doc, first_positions) in first.iter() {
        for posting in rest {
            if !posting.contains(doc) {
                continue 'docs;
            }
        }
        let consecutive = first_positions.iter().any(|&start| {
            rest.iter().enumerate().all(|(offset, posting)| {
                let expected = start + offset as u32 + 1;
                posting
                    .positions(doc)
                    .is_some_and(|p| p.binary_search(&expected).is_ok())
            })
        });
        if !consecutive {
            continue;
        }
        let score = postings.iter().filter_map(|p| p.frequency(doc)).sum();
        candidates.push(Candidate {
            id: doc.to_string(),
            score,
        });
    }
    candidates
}

/// Human-readable rendering of a response for the CLI.
pub fn render(response: &SearchResponse) -> String {
    let rule = "=".repeat(60);
    let mut out = Vec::new();
    out.push(rule.clone());
    out.push(format!("query: \"{}\"", response.query));
    out.push(format!(
        "{} result(s) over {} document(s), index v{}",
        response.total_results,
        response.metadata.total_documents_searched,
        response.metadata.index_version
    ));
    out.push(rule);

    for (rank, hit) in response.results.iter().enumerate() {
        out.push(String::new());
        out.push(format!("[{}] score {}", rank + 1, hit.score));
        match &hit.document {
            Document::Song(song) => {
                out.push(format!("    song: {}", song.title));
                if let Some(page) = song.page {
                    out.push(format!("    page: {page}"));
                }
                if let Some(file) = &song.file {
                    out.push(format!("    file: {file}"));
                }
            }
            Document::Resource(resource) => {
                out.push(format!("    resource: {}", resource.filename));
                if !resource.collection.is_empty() {
                    out.push(format!("    collection: {}", resource.collection));
                }
                if !resource.tags.is_empty() {
                    out.push(format!("    tags: {}", resource.tags.join(", ")));
                }
                if let Some(url) = &resource.url {
                    out.push(format!("    url: {url}"));
                }
            }
        }
    }
    out.join("\n")
}
