pub mod index;
pub mod persist;
pub mod tokenizer;

pub use index::{
    DocId, Document, DocumentStore, Index, IndexBuilder, IndexStats, PostingList, ResourceMeta,
    ResourceRecord, SongMeta, SongRecord, SourceKind,
};
