// ABOUTME: Type definitions for tags, tag types, tag contexts, and tag-item associations
// ABOUTME: Mirrors the four persisted tables plus the join projections returned by queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, typed, contextualized label, optionally hierarchical via `parent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
    pub type_id: i64,
    pub context_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category of a tag (e.g., "topic", "status").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagType {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Namespace scoping a tag (e.g., "blog", "product").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagContext {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Association record linking a tag to a tagged resource.
///
/// Records which actor (`tagger`) applied the tag and under what relationship
/// semantics. `(tag_id, tagged, tagger)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagItem {
    pub id: i64,
    pub tag_id: i64,
    pub tagged: String,
    pub tagger: String,
    pub relationship: Relationship,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relationship semantics of a tag-item association, stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    RelatesTo,
    IsChildOf,
    IsNotRelatedTo,
    IsDistinctFrom,
    #[default]
    Describes,
    IsSimilarTo,
}

/// Input for creating a tag.
///
/// The natural key is `(name, parent, type_id, context_id)`; creation is
/// get-or-create on that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
    pub parent: Option<i64>,
    pub type_id: i64,
    pub context_id: i64,
}

/// One flat row of the denormalized tagged-items projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatTaggedItem {
    pub name: String,
    pub tag_id: i64,
    pub parent: Option<i64>,
    pub tag_type: String,
    pub tag_type_id: i64,
    pub context: String,
    pub context_id: i64,
    pub tag_item_id: i64,
    pub tagger: String,
    pub tagged: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag portion of a nested tagged-item response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRef {
    pub tag_id: i64,
    pub parent: Option<i64>,
}

/// Context portion of a nested tagged-item response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRef {
    pub context: String,
    pub context_id: i64,
}

/// Tag-type portion of a nested tagged-item response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTypeRef {
    pub tag_type: String,
    pub tag_type_id: i64,
}

/// Nested tagged-item response grouping `tag`, `context`, and `tag_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedItem {
    pub name: String,
    pub tag: TagRef,
    pub tag_item_id: i64,
    pub parent: Option<i64>,
    pub tagger: String,
    pub tagged: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub context: ContextRef,
    pub tag_type: TagTypeRef,
}

/// Result of a tagged-items query.
///
/// Unfiltered queries return nested objects; filtered queries return the raw
/// flat projection. The two shapes are deliberate and match the filter
/// semantics documented on [`crate::TagStore::tagged_items`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TaggedItems {
    Nested(Vec<TaggedItem>),
    Flat(Vec<FlatTaggedItem>),
}

/// Per-row outcome of a batch attach.
#[derive(Debug, Clone, Serialize)]
pub struct AttachOutcome {
    pub tag_id: i64,
    pub status: AttachStatus,
}

/// Status of a single attach attempt within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachStatus {
    Attached,
    AlreadyAttached,
    Failed(String),
}

/// Summary of a reconcile operation: which tag ids were added and removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}
