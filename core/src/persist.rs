use crate::index::{DocId, Document, Index, IndexStats, PostingList};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Format version written into every artifact.
pub const INDEX_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub generated_at: String,
    pub description: String,
    pub statistics: IndexStats,
}

/// On-disk posting layout: three index-aligned parallel arrays.
#[derive(Debug, Serialize, Deserialize)]
struct PostingColumns {
    documents: Vec<DocId>,
    frequencies: Vec<u32>,
    positions: Vec<Vec<u32>>,
}

/// The serialized index artifact: a single JSON document with metadata, the
/// inverted index, and the document store. Sole hand-off between the indexer
/// and the query engine.
#[derive(Debug, Serialize, Deserialize)]
struct Artifact {
    metadata: ArtifactMetadata,
    inverted_index: BTreeMap<String, PostingColumns>,
    documents: BTreeMap<DocId, Document>,
}

/// An index loaded from an artifact, with the artifact's metadata.
#[derive(Debug)]
pub struct LoadedIndex {
    pub metadata: ArtifactMetadata,
    pub index: Index,
}

pub fn save_index(path: &Path, index: &Index, generated_at: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mut inverted_index = BTreeMap::new();
    for (word, posting) in &index.postings {
        let mut columns = PostingColumns {
            documents: Vec::with_capacity(posting.len()),
            frequencies: Vec::with_capacity(posting.len()),
            positions: Vec::with_capacity(posting.len()),
        };
        for (doc, positions) in posting.iter() {
            columns.documents.push(doc.to_string());
            columns.frequencies.push(positions.len() as u32);
            columns.positions.push(positions.to_vec());
        }
        inverted_index.insert(word.clone(), columns);
    }

    let artifact = Artifact {
        metadata: ArtifactMetadata {
            version: INDEX_VERSION.to_string(),
            generated_at,
            description: "full-text inverted index over songs and lesson resources".to_string(),
            statistics: index.stats.clone(),
        },
        inverted_index,
        documents: index.documents.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    };

    let json = serde_json::to_string_pretty(&artifact)?;
    fs::write(path, json)
        .with_context(|| format!("failed to write index artifact at {}", path.display()))?;
    tracing::debug!(path = %path.display(), words = index.postings.len(), "index artifact written");
    Ok(())
}

/// Load an artifact wholesale. Any failure here is fatal to the query path;
/// the error names the path and the underlying cause so the operator can
/// regenerate the index.
pub fn load_index(path: &Path) -> Result<LoadedIndex> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read index artifact at {}", path.display()))?;
    let artifact: Artifact = serde_json::from_str(&raw)
        .with_context(|| format!("malformed index artifact at {}", path.display()))?;

    let mut postings: HashMap<String, PostingList> = HashMap::new();
    for (word, columns) in artifact.inverted_index {
        let aligned = columns.documents.len() == columns.frequencies.len()
            && columns.documents.len() == columns.positions.len();
        if !aligned {
            bail!(
                "misaligned posting arrays for word {word:?} in {}",
                path.display()
            );
        }
        let mut posting = PostingList::default();
        for ((doc, frequency), positions) in columns
            .documents
            .into_iter()
            .zip(columns.frequencies)
            .zip(columns.positions)
        {
            if frequency as usize != positions.len() {
                bail!(
                    "frequency/position mismatch for word {word:?}, document {doc} in {}",
                    path.display()
                );
            }
            posting
                .append(doc, positions)
                .with_context(|| format!("corrupt posting for word {word:?} in {}", path.display()))?;
        }
        postings.insert(word, posting);
    }

    let index = Index {
        documents: artifact.documents.into_iter().collect(),
        postings,
        stats: artifact.metadata.statistics.clone(),
    };
    tracing::debug!(
        path = %path.display(),
        documents = index.documents.len(),
        words = index.postings.len(),
        "index artifact parsed"
    );
    Ok(LoadedIndex {
        metadata: artifact.metadata,
        index,
    })
}
