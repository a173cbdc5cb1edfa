// ABOUTME: Polymorphic tagging library backed by SQLite
// ABOUTME: Provides tag creation, attach/detach, filtered queries, and tag-set reconciliation

pub mod db;
pub mod error;
pub mod filter;
pub mod schema;
pub mod storage;
pub mod types;

// Re-export main types
pub use error::{StorageError, StorageResult};
pub use filter::Filter;
pub use storage::{Record, TagStore};
pub use types::{
    AttachOutcome, AttachStatus, FlatTaggedItem, ReconcileSummary, Relationship, Tag, TagContext,
    TagInput, TagItem, TagType, TaggedItem, TaggedItems,
};
