//! JSON document store over a single `documents` table.
//!
//! Each row holds one document of one collection. `language` and `slug`
//! are copied out of the body into indexed columns on every write; every
//! other filter goes through `json_extract` on the body.

use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{Document, Stored, COLLECTIONS};

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Body keys a merge update may never overwrite.
const PROTECTED_FIELDS: &[&str] = &["_id", "createdAt", "updatedAt", "passwordHash"];

/// Upper bound for any single page.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatch {
    /// Case-insensitive equality on a string field.
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Which documents of a collection to return, and in what order.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub language: Option<String>,
    pub fields: Vec<(String, FieldMatch)>,
    /// 1-based page; 0 is treated as 1.
    pub page: u32,
    /// `None` returns everything.
    pub limit: Option<u32>,
    pub sort: SortOrder,
    /// Ascending sort on a body field (nulls last), ahead of `sort`.
    pub sort_field: Option<String>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn text(mut self, field: &str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.fields.push((field.to_string(), FieldMatch::Text(value.trim().to_string())));
        }
        self
    }

    pub fn flag(mut self, field: &str, value: bool) -> Self {
        self.fields.push((field.to_string(), FieldMatch::Bool(value)));
        self
    }

    pub fn paginate(mut self, page: Option<u32>, limit: Option<u32>) -> Self {
        self.page = page.unwrap_or(1).max(1);
        self.limit = limit.map(|l| l.clamp(1, MAX_PAGE_SIZE));
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.sort = SortOrder::OldestFirst;
        self
    }

    pub fn sort_by(mut self, field: &str) -> Self {
        self.sort_field = Some(field.to_string());
        self
    }
}

/// One page of results plus the totals needed to page through the rest.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<Stored<T>>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

// ── Writes ──────────────────────────────────────────────────

/// Normalize, validate and insert a new document.
pub fn insert<T: Document>(conn: &Connection, mut doc: T) -> Result<Stored<T>, DatabaseError> {
    doc.normalize();
    doc.validate()?;

    let id = Uuid::new_v4().to_string();
    let now = now();
    let body = serde_json::to_string(&doc)?;

    conn.execute(
        "INSERT INTO documents (id, collection, language, slug, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, T::COLLECTION, doc.language(), doc.slug(), body, timestamp(now)],
    )
    .map_err(write_error::<T>)?;

    Ok(Stored {
        id,
        body: doc,
        created_at: now,
        updated_at: now,
    })
}

/// Replace the body of an existing document, keeping id and `createdAt`.
pub fn replace<T: Document>(
    conn: &Connection,
    id: &str,
    mut doc: T,
) -> Result<Stored<T>, DatabaseError> {
    doc.normalize();
    doc.validate()?;

    let created_at: Option<String> = conn
        .query_row(
            "SELECT created_at FROM documents WHERE id = ?1 AND collection = ?2",
            params![id, T::COLLECTION],
            |row| row.get(0),
        )
        .optional()?;
    let created_at = created_at.ok_or_else(|| not_found::<T>(id))?;

    let now = now();
    let body = serde_json::to_string(&doc)?;
    conn.execute(
        "UPDATE documents SET language = ?1, slug = ?2, body = ?3, updated_at = ?4
         WHERE id = ?5 AND collection = ?6",
        params![doc.language(), doc.slug(), body, timestamp(now), id, T::COLLECTION],
    )
    .map_err(write_error::<T>)?;

    Ok(Stored {
        id: id.to_string(),
        body: doc,
        created_at: parse_timestamp(&created_at)?,
        updated_at: now,
    })
}

/// Shallow-merge `patch` into the stored body, then re-validate and save.
pub fn update_merge<T: Document>(
    conn: &Connection,
    id: &str,
    patch: &Value,
) -> Result<Stored<T>, DatabaseError> {
    let doc = merged::<T>(conn, id, patch)?;
    replace(conn, id, doc)
}

/// The body `update_merge` would save, normalized but not yet written.
pub fn merged<T: Document>(conn: &Connection, id: &str, patch: &Value) -> Result<T, DatabaseError> {
    let Value::Object(patch) = patch else {
        return Err(DatabaseError::Validation(
            "Update body must be a JSON object".into(),
        ));
    };

    let existing = get_by_id::<T>(conn, id)?;
    let mut body = serde_json::to_value(&existing.body)?;
    if let Value::Object(fields) = &mut body {
        for (key, value) in patch {
            if !PROTECTED_FIELDS.contains(&key.as_str()) {
                fields.insert(key.clone(), value.clone());
            }
        }
    }

    let mut doc: T =
        serde_json::from_value(body).map_err(|e| DatabaseError::Validation(e.to_string()))?;
    doc.normalize();
    Ok(doc)
}

/// Delete a document. Returns `false` when nothing matched.
pub fn delete<T: Document>(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM documents WHERE id = ?1 AND collection = ?2",
        params![id, T::COLLECTION],
    )?;
    Ok(affected > 0)
}

// ── Reads ───────────────────────────────────────────────────

pub fn find_by_id<T: Document>(
    conn: &Connection,
    id: &str,
) -> Result<Option<Stored<T>>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, body, created_at, updated_at FROM documents
             WHERE id = ?1 AND collection = ?2",
            params![id, T::COLLECTION],
            raw_row,
        )
        .optional()?;
    row.map(decode).transpose()
}

/// Like [`find_by_id`] but a missing document is `DatabaseError::NotFound`.
pub fn get_by_id<T: Document>(conn: &Connection, id: &str) -> Result<Stored<T>, DatabaseError> {
    find_by_id(conn, id)?.ok_or_else(|| not_found::<T>(id))
}

pub fn exists<T: Document>(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM documents WHERE id = ?1 AND collection = ?2",
            params![id, T::COLLECTION],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn find_by_slug<T: Document>(
    conn: &Connection,
    slug: &str,
) -> Result<Option<Stored<T>>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, body, created_at, updated_at FROM documents
             WHERE collection = ?1 AND slug = ?2
             ORDER BY created_at, rowid LIMIT 1",
            params![T::COLLECTION, slug.trim().to_lowercase()],
            raw_row,
        )
        .optional()?;
    row.map(decode).transpose()
}

/// First document (oldest) whose `field` equals `value`, case-insensitively.
pub fn find_one_by_field<T: Document>(
    conn: &Connection,
    field: &str,
    value: &str,
) -> Result<Option<Stored<T>>, DatabaseError> {
    let filter = DocumentFilter::new()
        .text(field, Some(value.to_string()))
        .oldest_first()
        .paginate(None, Some(1));
    Ok(list::<T>(conn, &filter)?.items.into_iter().next())
}

pub fn list<T: Document>(
    conn: &Connection,
    filter: &DocumentFilter,
) -> Result<Page<T>, DatabaseError> {
    let (where_sql, mut values) = where_clause(T::COLLECTION, filter)?;
    let order_sql = order_clause(filter)?;
    let total = count_where(conn, &where_sql, &values)?;

    let mut sql = format!(
        "SELECT id, body, created_at, updated_at FROM documents WHERE {where_sql} ORDER BY {order_sql}"
    );
    let page = filter.page.max(1);
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(SqlValue::Integer(i64::from(limit)));
        values.push(SqlValue::Integer(i64::from(page - 1) * i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), raw_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let items = rows.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;

    let pages = match filter.limit {
        Some(limit) if total > 0 => total.div_ceil(u64::from(limit)) as u32,
        _ => 1,
    };

    Ok(Page {
        items,
        total,
        page,
        pages,
    })
}

/// Every matching document, ignoring pagination.
pub fn list_all<T: Document>(
    conn: &Connection,
    filter: &DocumentFilter,
) -> Result<Vec<Stored<T>>, DatabaseError> {
    let mut unpaged = filter.clone();
    unpaged.limit = None;
    unpaged.page = 1;
    Ok(list::<T>(conn, &unpaged)?.items)
}

pub fn count<T: Document>(conn: &Connection, filter: &DocumentFilter) -> Result<u64, DatabaseError> {
    let (where_sql, values) = where_clause(T::COLLECTION, filter)?;
    count_where(conn, &where_sql, &values)
}

/// Distinct non-null string values of `field`, sorted.
pub fn distinct_text<T: Document>(
    conn: &Connection,
    field: &str,
    filter: &DocumentFilter,
) -> Result<Vec<String>, DatabaseError> {
    let path = json_path(field)?;
    let (where_sql, mut values) = where_clause(T::COLLECTION, filter)?;
    let sql = format!(
        "SELECT DISTINCT json_extract(body, ?) AS value FROM documents
         WHERE {where_sql} AND json_extract(body, ?) IS NOT NULL ORDER BY value"
    );
    values.insert(0, SqlValue::Text(path.clone()));
    values.push(SqlValue::Text(path));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, SqlValue>(0))?;

    let mut out = Vec::new();
    for value in rows {
        if let SqlValue::Text(text) = value? {
            if !text.trim().is_empty() {
                out.push(text);
            }
        }
    }
    Ok(out)
}

/// Document count of every known collection, zero included.
pub fn collection_counts(conn: &Connection) -> Result<Vec<(String, u64)>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT collection, COUNT(*) FROM documents GROUP BY collection")?;
    let counted = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(COLLECTIONS
        .iter()
        .map(|name| {
            let n = counted
                .iter()
                .find(|(c, _)| c == name)
                .map(|(_, n)| *n as u64)
                .unwrap_or(0);
            (name.to_string(), n)
        })
        .collect())
}

/// Raw bodies of a collection with `_id` and timestamps, oldest first.
/// Password hashes are stripped.
pub fn list_raw(conn: &Connection, collection: &str) -> Result<Vec<Value>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, body, created_at, updated_at FROM documents
         WHERE collection = ?1 ORDER BY created_at, rowid",
    )?;
    let rows = stmt
        .query_map(params![collection], raw_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, body, created_at, updated_at)| {
            let mut value: Value = serde_json::from_str(&body)
                .map_err(|e| DatabaseError::CorruptDocument(format!("{id}: {e}")))?;
            if let Value::Object(fields) = &mut value {
                fields.remove("passwordHash");
                fields.insert("_id".into(), Value::String(id));
                fields.insert("createdAt".into(), Value::String(created_at));
                fields.insert("updatedAt".into(), Value::String(updated_at));
            }
            Ok(value)
        })
        .collect()
}

// ── Internals ───────────────────────────────────────────────

type RawRow = (String, String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode<T: Document>((id, body, created_at, updated_at): RawRow) -> Result<Stored<T>, DatabaseError> {
    let body: T = serde_json::from_str(&body)
        .map_err(|e| DatabaseError::CorruptDocument(format!("{} {id}: {e}", T::COLLECTION)))?;
    Ok(Stored {
        id,
        body,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn not_found<T: Document>(id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: T::ENTITY.to_string(),
        id: id.to_string(),
    }
}

/// Unique-index violations become `Duplicate`.
fn write_error<T: Document>(err: rusqlite::Error) -> DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            DatabaseError::Duplicate {
                entity_type: T::ENTITY.to_string(),
            }
        }
        _ => err.into(),
    }
}

fn json_path(field: &str) -> Result<String, DatabaseError> {
    if !FIELD_NAME.is_match(field) {
        return Err(DatabaseError::InvalidFilter(field.to_string()));
    }
    Ok(format!("$.{field}"))
}

fn where_clause(
    collection: &str,
    filter: &DocumentFilter,
) -> Result<(String, Vec<SqlValue>), DatabaseError> {
    let mut sql = String::from("collection = ?");
    let mut values = vec![SqlValue::Text(collection.to_string())];

    if let Some(language) = &filter.language {
        sql.push_str(" AND lower(language) = lower(?)");
        values.push(SqlValue::Text(language.trim().to_string()));
    }

    for (field, matcher) in &filter.fields {
        let path = json_path(field)?;
        match matcher {
            FieldMatch::Text(value) => {
                sql.push_str(" AND lower(json_extract(body, ?)) = lower(?)");
                values.push(SqlValue::Text(path));
                values.push(SqlValue::Text(value.clone()));
            }
            FieldMatch::Bool(value) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                values.push(SqlValue::Text(path));
                values.push(SqlValue::Integer(i64::from(*value)));
            }
        }
    }

    Ok((sql, values))
}

fn order_clause(filter: &DocumentFilter) -> Result<String, DatabaseError> {
    let base = match filter.sort {
        SortOrder::NewestFirst => "created_at DESC, rowid DESC",
        SortOrder::OldestFirst => "created_at ASC, rowid ASC",
    };
    match &filter.sort_field {
        Some(field) => {
            // Validated path, safe to inline.
            let path = json_path(field)?;
            Ok(format!(
                "json_extract(body, '{path}') IS NULL, json_extract(body, '{path}') ASC, {base}"
            ))
        }
        None => Ok(base.to_string()),
    }
}

fn count_where(conn: &Connection, where_sql: &str, values: &[SqlValue]) -> Result<u64, DatabaseError> {
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM documents WHERE {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptDocument(format!("timestamp '{raw}': {e}")))
}
