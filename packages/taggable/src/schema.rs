// ABOUTME: Destructive schema bootstrap for the four tagging tables
// ABOUTME: Drops and recreates tags, tag_types, tag_contexts, and tag_items

use crate::error::{StorageError, StorageResult};
use sqlx::SqlitePool;
use tracing::debug;

/// Drop and recreate all four tagging tables.
///
/// Destructive: every existing row is lost. Intended for initial setup and
/// test fixtures only; never run this against a populated store without
/// explicit operator intent.
pub async fn bootstrap(pool: &SqlitePool) -> StorageResult<()> {
    debug!("Bootstrapping tagging schema (drop + create)");

    // Tags
    sqlx::query("DROP TABLE IF EXISTS tags")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query(
        r#"
        CREATE TABLE tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            parent INTEGER REFERENCES tags(id),
            type_id INTEGER NOT NULL REFERENCES tag_types(id),
            context_id INTEGER NOT NULL REFERENCES tag_contexts(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (name, parent, type_id, context_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(StorageError::Sqlx)?;

    // Tag types
    sqlx::query("DROP TABLE IF EXISTS tag_types")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query(
        r#"
        CREATE TABLE tag_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(StorageError::Sqlx)?;

    // Tag contexts
    sqlx::query("DROP TABLE IF EXISTS tag_contexts")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query(
        r#"
        CREATE TABLE tag_contexts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(StorageError::Sqlx)?;

    // Tag-item associations
    sqlx::query("DROP TABLE IF EXISTS tag_items")
        .execute(pool)
        .await
        .map_err(StorageError::Sqlx)?;
    sqlx::query(
        r#"
        CREATE TABLE tag_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            tagged TEXT NOT NULL,
            tagger TEXT NOT NULL,
            relationship TEXT NOT NULL DEFAULT 'describes',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tag_id, tagged, tagger)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(())
}
