// ABOUTME: Exact-match predicate builder used for filtered collection queries
// ABOUTME: Typed replacement for a dynamic where-map; columns are validated, values bound

use crate::error::{StorageError, StorageResult};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

/// An exact-match filter over the columns of a collection.
///
/// Clauses are ANDed together. Column names are library-level identifiers,
/// not user input; they are still validated as bare identifiers before being
/// interpolated into SQL, and all values are bound as parameters.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, FilterValue)>,
}

#[derive(Debug, Clone)]
pub enum FilterValue {
    Integer(i64),
    Text(String),
    Null,
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to equal `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.clauses.push((column.into(), value.into()));
        self
    }

    /// Require `column` to be NULL.
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.clauses.push((column.into(), FilterValue::Null));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render the WHERE clause (with a leading space), or an empty string for
    /// an empty filter.
    pub(crate) fn to_sql(&self) -> StorageResult<String> {
        if self.clauses.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(self.clauses.len());
        for (column, value) in &self.clauses {
            if !is_identifier(column) {
                return Err(StorageError::Database(format!(
                    "invalid filter column: {column}"
                )));
            }
            match value {
                FilterValue::Null => parts.push(format!("{column} IS NULL")),
                _ => parts.push(format!("{column} = ?")),
            }
        }

        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    /// Bind the filter values onto `query`, in clause order.
    pub(crate) fn bind<'q>(
        &'q self,
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for (_, value) in &self.clauses {
            query = match value {
                FilterValue::Integer(v) => query.bind(*v),
                FilterValue::Text(v) => query.bind(v.as_str()),
                FilterValue::Null => query,
            };
        }
        query
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_renders_nothing() {
        assert_eq!(Filter::new().to_sql().unwrap(), "");
    }

    #[test]
    fn clauses_are_anded_in_order() {
        let filter = Filter::new()
            .eq("tagged", "post-1")
            .eq("tag_id", 7)
            .is_null("parent");
        assert_eq!(
            filter.to_sql().unwrap(),
            " WHERE tagged = ? AND tag_id = ? AND parent IS NULL"
        );
    }

    #[test]
    fn invalid_column_is_rejected() {
        let filter = Filter::new().eq("tagged; DROP TABLE tags", 1);
        assert!(matches!(
            filter.to_sql(),
            Err(StorageError::Database(_))
        ));
    }

    #[test]
    fn leading_digit_is_rejected() {
        assert!(Filter::new().eq("1name", 1).to_sql().is_err());
    }
}
