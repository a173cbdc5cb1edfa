// ABOUTME: TagStore facade over the four tagging tables using SQLite
// ABOUTME: Handles get-or-create, attach/detach, reconciliation, and filtered queries

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::filter::Filter;
use crate::schema;
use crate::types::{
    AttachOutcome, AttachStatus, ContextRef, FlatTaggedItem, ReconcileSummary, Relationship, Tag,
    TagContext, TagInput, TagItem, TagRef, TagType, TagTypeRef, TaggedItem, TaggedItems,
};

/// A row type belonging to one of the persisted collections.
///
/// Powers the generic [`TagStore::get`] passthrough.
pub trait Record: Sized {
    const TABLE: &'static str;

    fn from_row(row: &SqliteRow) -> StorageResult<Self>;
}

/// Single point of access to the tagging tables.
///
/// Holds a caller-supplied pool and nothing else; no state is retained
/// across calls.
pub struct TagStore {
    pool: SqlitePool,
}

const TAGGED_ITEMS_PROJECTION: &str = r#"
    SELECT
        t.name AS name,
        t.id AS tag_id,
        t.parent AS parent,
        tt.name AS tag_type,
        tt.id AS tag_type_id,
        tc.name AS context,
        tc.id AS context_id,
        tag_items.id AS tag_item_id,
        tag_items.tagger AS tagger,
        tag_items.tagged AS tagged,
        tag_items.created_at AS created_at,
        tag_items.updated_at AS updated_at
    FROM tag_items
    LEFT JOIN tags t ON t.id = tag_items.tag_id
    LEFT JOIN tag_types tt ON tt.id = t.type_id
    LEFT JOIN tag_contexts tc ON tc.id = t.context_id
"#;

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drop and recreate all four tables. Destructive; see [`schema::bootstrap`].
    pub async fn bootstrap(&self) -> StorageResult<()> {
        schema::bootstrap(&self.pool).await
    }

    /// Get-or-create a tag by its natural key `(name, parent, type_id, context_id)`.
    ///
    /// Returns the existing row id when the key already exists, otherwise
    /// inserts and returns the new id.
    pub async fn create_tag(&self, input: TagInput) -> StorageResult<i64> {
        debug!(
            "Creating tag: {} (type: {}, context: {}, parent: {:?})",
            input.name, input.type_id, input.context_id, input.parent
        );

        // UNIQUE won't catch a NULL-parent duplicate, so the lookup handles
        // IS NULL explicitly.
        let existing: Option<i64> = match input.parent {
            Some(parent) => {
                sqlx::query_scalar(
                    "SELECT id FROM tags WHERE name = ? AND parent = ? AND type_id = ? AND context_id = ?",
                )
                .bind(&input.name)
                .bind(parent)
                .bind(input.type_id)
                .bind(input.context_id)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar(
                    "SELECT id FROM tags WHERE name = ? AND parent IS NULL AND type_id = ? AND context_id = ?",
                )
                .bind(&input.name)
                .bind(input.type_id)
                .bind(input.context_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(StorageError::Sqlx)?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tags (name, parent, type_id, context_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.parent)
        .bind(input.type_id)
        .bind(input.context_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    /// Get-or-create a tag type by name.
    pub async fn create_type(&self, name: &str) -> StorageResult<i64> {
        debug!("Creating tag type: {}", name);
        self.create_named("tag_types", name).await
    }

    /// Get-or-create a tag context by name.
    pub async fn create_context(&self, name: &str) -> StorageResult<i64> {
        debug!("Creating tag context: {}", name);
        self.create_named("tag_contexts", name).await
    }

    async fn create_named(&self, table: &str, name: &str) -> StorageResult<i64> {
        let sql = format!("SELECT id FROM {table} WHERE name = ?");
        let existing: Option<i64> = sqlx::query_scalar(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let now = Utc::now();
        let sql = format!("INSERT INTO {table} (name, created_at, updated_at) VALUES (?, ?, ?)");
        let result = sqlx::query(&sql)
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn all_tags(&self) -> StorageResult<Vec<Tag>> {
        self.get::<Tag>(&Filter::new()).await
    }

    pub async fn all_types(&self) -> StorageResult<Vec<TagType>> {
        self.get::<TagType>(&Filter::new()).await
    }

    pub async fn all_contexts(&self) -> StorageResult<Vec<TagContext>> {
        self.get::<TagContext>(&Filter::new()).await
    }

    pub async fn all_tag_items(&self) -> StorageResult<Vec<TagItem>> {
        self.get::<TagItem>(&Filter::new()).await
    }

    /// Attach each of `tag_ids` to `tagged` on behalf of `tagger`.
    ///
    /// Best-effort batch: every insert is independent and a failure never
    /// aborts the remaining inserts. The outcome of each row is returned;
    /// an existing `(tag_id, tagged, tagger)` association reports
    /// `AlreadyAttached`.
    pub async fn attach_tags(
        &self,
        tag_ids: &[i64],
        tagged: &str,
        tagger: &str,
        relationship: Relationship,
    ) -> StorageResult<Vec<AttachOutcome>> {
        debug!(
            "Attaching {} tags to resource: {} (tagger: {})",
            tag_ids.len(),
            tagged,
            tagger
        );

        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(tag_ids.len());

        for &tag_id in tag_ids {
            let result = sqlx::query(
                "INSERT INTO tag_items (tag_id, tagged, tagger, relationship, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(tag_id)
            .bind(tagged)
            .bind(tagger)
            .bind(relationship)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await;

            let status = match result {
                Ok(_) => AttachStatus::Attached,
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    warn!(
                        "Tag {} already attached to resource {} by {}",
                        tag_id, tagged, tagger
                    );
                    AttachStatus::AlreadyAttached
                }
                Err(e) => {
                    warn!("Failed to attach tag {} to resource {}: {}", tag_id, tagged, e);
                    AttachStatus::Failed(e.to_string())
                }
            };

            outcomes.push(AttachOutcome { tag_id, status });
        }

        Ok(outcomes)
    }

    /// Attach a single tag with the default relationship, discarding the outcome.
    pub async fn attach_tag(&self, tag_id: i64, tagged: &str, tagger: &str) -> StorageResult<()> {
        self.attach_tags(&[tag_id], tagged, tagger, Relationship::default())
            .await?;
        Ok(())
    }

    /// Detach `tag_ids` from `tagged`, returning the number of rows removed.
    ///
    /// Idempotent: detaching tags that are not attached is a no-op.
    pub async fn detach_tags(&self, tag_ids: &[i64], tagged: &str) -> StorageResult<u64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        debug!(
            "Detaching {} tags from resource: {}",
            tag_ids.len(),
            tagged
        );

        let placeholders = vec!["?"; tag_ids.len()].join(", ");
        let sql = format!("DELETE FROM tag_items WHERE tagged = ? AND tag_id IN ({placeholders})");

        let mut query = sqlx::query(&sql).bind(tagged);
        for &tag_id in tag_ids {
            query = query.bind(tag_id);
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Bring the attached-tag set of `tagged` to exactly `desired`.
    ///
    /// Tags in `desired` but not currently attached are added (by `tagger`,
    /// with the default relationship); currently attached tags missing from
    /// `desired` are removed; the intersection is left untouched. The whole
    /// read-diff-delete-insert sequence runs in one transaction and rolls
    /// back on any failure. Concurrent reconciles against the same resource
    /// are not serialized against each other.
    pub async fn reconcile_tags(
        &self,
        desired: &[i64],
        tagged: &str,
        tagger: &str,
    ) -> StorageResult<ReconcileSummary> {
        debug!(
            "Reconciling tags for resource: {} ({} desired)",
            tagged,
            desired.len()
        );

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let current: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM tag_items WHERE tagged = ?")
            .bind(tagged)
            .fetch_all(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;

        let current_set: HashSet<i64> = current.iter().copied().collect();
        let desired_set: HashSet<i64> = desired.iter().copied().collect();

        let mut seen = HashSet::new();
        let to_add: Vec<i64> = desired
            .iter()
            .copied()
            .filter(|id| !current_set.contains(id) && seen.insert(*id))
            .collect();

        let mut seen = HashSet::new();
        let to_remove: Vec<i64> = current
            .iter()
            .copied()
            .filter(|id| !desired_set.contains(id) && seen.insert(*id))
            .collect();

        if !to_remove.is_empty() {
            let placeholders = vec!["?"; to_remove.len()].join(", ");
            let sql =
                format!("DELETE FROM tag_items WHERE tagged = ? AND tag_id IN ({placeholders})");
            let mut query = sqlx::query(&sql).bind(tagged);
            for &tag_id in &to_remove {
                query = query.bind(tag_id);
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(StorageError::Sqlx)?;
        }

        let now = Utc::now();
        for &tag_id in &to_add {
            sqlx::query(
                "INSERT INTO tag_items (tag_id, tagged, tagger, relationship, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(tag_id)
            .bind(tagged)
            .bind(tagger)
            .bind(Relationship::default())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(ReconcileSummary {
            added: to_add,
            removed: to_remove,
        })
    }

    /// Query the denormalized tagged-items projection.
    ///
    /// With no filter, rows are reshaped into nested objects grouping `tag`,
    /// `context`, and `tag_type`. With a filter (matched against the flat
    /// projected column names), the raw flat rows are returned unmapped.
    pub async fn tagged_items(&self, filter: Option<&Filter>) -> StorageResult<TaggedItems> {
        match filter {
            Some(filter) => {
                debug!("Fetching tagged items (filtered)");
                let sql = format!(
                    "SELECT * FROM ({TAGGED_ITEMS_PROJECTION}){}",
                    filter.to_sql()?
                );
                let rows = filter
                    .bind(sqlx::query(&sql))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(StorageError::Sqlx)?;
                let items = rows
                    .iter()
                    .map(row_to_flat)
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(TaggedItems::Flat(items))
            }
            None => {
                debug!("Fetching tagged items");
                let rows = sqlx::query(TAGGED_ITEMS_PROJECTION)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(StorageError::Sqlx)?;
                let items = rows
                    .iter()
                    .map(|row| row_to_flat(row).map(nest))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(TaggedItems::Nested(items))
            }
        }
    }

    /// All association rows for a resource, across every tagger.
    pub async fn tags_for_resource(&self, tagged: &str) -> StorageResult<Vec<TagItem>> {
        self.get::<TagItem>(&Filter::new().eq("tagged", tagged))
            .await
    }

    /// Generic passthrough: fetch rows of any collection, optionally filtered
    /// by exact-match predicates.
    pub async fn get<T: Record>(&self, filter: &Filter) -> StorageResult<Vec<T>> {
        let sql = format!("SELECT * FROM {}{}", T::TABLE, filter.to_sql()?);
        let rows = filter
            .bind(sqlx::query(&sql))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(T::from_row).collect()
    }
}

impl Record for Tag {
    const TABLE: &'static str = "tags";

    fn from_row(row: &SqliteRow) -> StorageResult<Self> {
        Ok(Tag {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            name: row.try_get("name").map_err(StorageError::Sqlx)?,
            parent: row.try_get("parent").map_err(StorageError::Sqlx)?,
            type_id: row.try_get("type_id").map_err(StorageError::Sqlx)?,
            context_id: row.try_get("context_id").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        })
    }
}

impl Record for TagType {
    const TABLE: &'static str = "tag_types";

    fn from_row(row: &SqliteRow) -> StorageResult<Self> {
        Ok(TagType {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            name: row.try_get("name").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        })
    }
}

impl Record for TagContext {
    const TABLE: &'static str = "tag_contexts";

    fn from_row(row: &SqliteRow) -> StorageResult<Self> {
        Ok(TagContext {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            name: row.try_get("name").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        })
    }
}

impl Record for TagItem {
    const TABLE: &'static str = "tag_items";

    fn from_row(row: &SqliteRow) -> StorageResult<Self> {
        Ok(TagItem {
            id: row.try_get("id").map_err(StorageError::Sqlx)?,
            tag_id: row.try_get("tag_id").map_err(StorageError::Sqlx)?,
            tagged: row.try_get("tagged").map_err(StorageError::Sqlx)?,
            tagger: row.try_get("tagger").map_err(StorageError::Sqlx)?,
            relationship: row.try_get("relationship").map_err(StorageError::Sqlx)?,
            created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
            updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
        })
    }
}

/// Convert a projection row to its flat form.
fn row_to_flat(row: &SqliteRow) -> StorageResult<FlatTaggedItem> {
    Ok(FlatTaggedItem {
        name: row.try_get("name").map_err(StorageError::Sqlx)?,
        tag_id: row.try_get("tag_id").map_err(StorageError::Sqlx)?,
        parent: row.try_get("parent").map_err(StorageError::Sqlx)?,
        tag_type: row.try_get("tag_type").map_err(StorageError::Sqlx)?,
        tag_type_id: row.try_get("tag_type_id").map_err(StorageError::Sqlx)?,
        context: row.try_get("context").map_err(StorageError::Sqlx)?,
        context_id: row.try_get("context_id").map_err(StorageError::Sqlx)?,
        tag_item_id: row.try_get("tag_item_id").map_err(StorageError::Sqlx)?,
        tagger: row.try_get("tagger").map_err(StorageError::Sqlx)?,
        tagged: row.try_get("tagged").map_err(StorageError::Sqlx)?,
        created_at: row.try_get("created_at").map_err(StorageError::Sqlx)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::Sqlx)?,
    })
}

/// Reshape a flat projection row into the nested response form.
fn nest(flat: FlatTaggedItem) -> TaggedItem {
    TaggedItem {
        name: flat.name,
        tag: TagRef {
            tag_id: flat.tag_id,
            parent: flat.parent,
        },
        tag_item_id: flat.tag_item_id,
        parent: flat.parent,
        tagger: flat.tagger,
        tagged: flat.tagged,
        created_at: flat.created_at,
        updated_at: flat.updated_at,
        context: ContextRef {
            context: flat.context,
            context_id: flat.context_id,
        },
        tag_type: TagTypeRef {
            tag_type: flat.tag_type,
            tag_type_id: flat.tag_type_id,
        },
    }
}
