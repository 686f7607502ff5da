//! Organization-scoped document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide collection/document reads, filtered queries, ordered listing
//!   and batched writes over JSON documents.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every call is scoped by `OrganizationId`; tenants never see each
//!   other's documents.
//! - Filter field paths are validated before they reach SQL.
//! - `write_batch` applies all writes or none.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::model::{now_epoch_ms, OrganizationId, RecordId};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static FIELD_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid field path regex")
});

const DOCUMENT_SELECT_SQL: &str = "SELECT id, body, created_at, updated_at FROM documents";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    AlreadyExists {
        collection: &'static str,
        id: RecordId,
    },
    /// Persisted document cannot be decoded into its record type.
    InvalidData(String),
    /// Filter or ordering cannot be expressed against stored documents.
    InvalidQuery(String),
    Serialization(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => write!(f, "{collection} document not found: {id}"),
            Self::AlreadyExists { collection, id } => {
                write!(f, "{collection} document already exists: {id}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted document: {message}"),
            Self::InvalidQuery(message) => write!(f, "invalid document query: {message}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. }
            | Self::AlreadyExists { .. }
            | Self::InvalidData(_)
            | Self::InvalidQuery(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Comparison applied by one [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    /// Array field contains the value.
    Contains,
}

/// One field condition on document bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Dotted field path, e.g. `status` or `address.city`.
    pub field: String,
    pub op: FilterOp,
    /// JSON scalar; `Eq` with `null` matches missing or null fields.
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Contains, value)
    }

    fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query options for listing documents in one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filters: Vec<Filter>,
    /// Field ordering; creation order is used when `None` and as tiebreak.
    pub order_by: Option<(String, OrderDirection)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Raw stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: RecordId,
    pub body: Value,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Upsert the document body.
    Put {
        collection: &'static str,
        id: RecordId,
        body: Value,
    },
    /// Remove the document; the batch fails if it does not exist.
    Delete {
        collection: &'static str,
        id: RecordId,
    },
}

/// Document database interface consumed by services.
pub trait DocumentStore {
    /// Creates a document; fails with `AlreadyExists` when `id` is taken.
    fn insert(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
        body: &Value,
    ) -> RepoResult<()>;
    /// Overwrites an existing document body.
    fn replace(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
        body: &Value,
    ) -> RepoResult<()>;
    fn get(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
    ) -> RepoResult<Option<StoredDocument>>;
    fn query(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        query: &DocumentQuery,
    ) -> RepoResult<Vec<StoredDocument>>;
    /// Counts documents matching the query filters; ordering and paging are ignored.
    fn count(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        query: &DocumentQuery,
    ) -> RepoResult<u64>;
    fn delete(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
    ) -> RepoResult<()>;
    /// Applies every write in one transaction.
    fn write_batch(&self, organization_id: OrganizationId, writes: &[BatchWrite])
        -> RepoResult<()>;
}

/// SQLite-backed document store.
#[derive(Debug, Clone, Copy)]
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a migrated connection from `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
        body: &Value,
    ) -> RepoResult<()> {
        let body_text = serde_json::to_string(body)?;
        let result = self.conn.execute(
            "INSERT INTO documents (
                organization_id,
                collection,
                id,
                body,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
            params![
                organization_id.to_string(),
                collection,
                id.to_string(),
                body_text,
                now_epoch_ms(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::AlreadyExists { collection, id })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn replace(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
        body: &Value,
    ) -> RepoResult<()> {
        let body_text = serde_json::to_string(body)?;
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?4,
                updated_at = ?5
             WHERE organization_id = ?1
               AND collection = ?2
               AND id = ?3;",
            params![
                organization_id.to_string(),
                collection,
                id.to_string(),
                body_text,
                now_epoch_ms(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { collection, id });
        }
        Ok(())
    }

    fn get(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
    ) -> RepoResult<Option<StoredDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE organization_id = ?1
               AND collection = ?2
               AND id = ?3;"
        ))?;

        let mut rows = stmt.query(params![
            organization_id.to_string(),
            collection,
            id.to_string()
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row, collection)?));
        }
        Ok(None)
    }

    fn query(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        query: &DocumentQuery,
    ) -> RepoResult<Vec<StoredDocument>> {
        let mut sql =
            format!("{DOCUMENT_SELECT_SQL} WHERE organization_id = ? AND collection = ?");
        let mut bind_values = vec![
            SqlValue::Text(organization_id.to_string()),
            SqlValue::Text(collection.to_string()),
        ];
        push_filters(&mut sql, &mut bind_values, &query.filters)?;

        match &query.order_by {
            Some((field, direction)) => {
                let direction = direction.as_sql();
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, ?) {direction}, created_at {direction}, rowid {direction}"
                ));
                bind_values.push(SqlValue::Text(json_path(field)?));
            }
            None => sql.push_str(" ORDER BY created_at ASC, rowid ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row, collection)?);
        }
        Ok(documents)
    }

    fn count(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        query: &DocumentQuery,
    ) -> RepoResult<u64> {
        let mut sql = String::from(
            "SELECT COUNT(*) FROM documents WHERE organization_id = ? AND collection = ?",
        );
        let mut bind_values = vec![
            SqlValue::Text(organization_id.to_string()),
            SqlValue::Text(collection.to_string()),
        ];
        push_filters(&mut sql, &mut bind_values, &query.filters)?;

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn delete(
        &self,
        organization_id: OrganizationId,
        collection: &'static str,
        id: RecordId,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents
             WHERE organization_id = ?1
               AND collection = ?2
               AND id = ?3;",
            params![organization_id.to_string(), collection, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { collection, id });
        }
        Ok(())
    }

    fn write_batch(
        &self,
        organization_id: OrganizationId,
        writes: &[BatchWrite],
    ) -> RepoResult<()> {
        let organization = organization_id.to_string();
        let now = now_epoch_ms();
        let tx = self.conn.unchecked_transaction()?;

        for write in writes {
            match write {
                BatchWrite::Put {
                    collection,
                    id,
                    body,
                } => {
                    tx.execute(
                        "INSERT INTO documents (
                            organization_id,
                            collection,
                            id,
                            body,
                            created_at,
                            updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                        ON CONFLICT (organization_id, collection, id) DO UPDATE SET
                            body = excluded.body,
                            updated_at = excluded.updated_at;",
                        params![
                            organization.as_str(),
                            *collection,
                            id.to_string(),
                            serde_json::to_string(body)?,
                            now,
                        ],
                    )?;
                }
                BatchWrite::Delete { collection, id } => {
                    let changed = tx.execute(
                        "DELETE FROM documents
                         WHERE organization_id = ?1
                           AND collection = ?2
                           AND id = ?3;",
                        params![organization.as_str(), *collection, id.to_string()],
                    )?;
                    if changed == 0 {
                        warn!(
                            "event=batch_write module=repo status=error collection={collection} error_code=delete_missing writes={}",
                            writes.len()
                        );
                        return Err(RepoError::NotFound {
                            collection: *collection,
                            id: *id,
                        });
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn push_filters(
    sql: &mut String,
    bind_values: &mut Vec<SqlValue>,
    filters: &[Filter],
) -> RepoResult<()> {
    for filter in filters {
        let path = json_path(&filter.field)?;
        match filter.op {
            FilterOp::Eq if filter.value.is_null() => {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
                bind_values.push(SqlValue::Text(path));
            }
            FilterOp::Eq | FilterOp::Gte | FilterOp::Lte => {
                let operator = match filter.op {
                    FilterOp::Gte => ">=",
                    FilterOp::Lte => "<=",
                    _ => "=",
                };
                sql.push_str(&format!(" AND json_extract(body, ?) {operator} ?"));
                bind_values.push(SqlValue::Text(path));
                bind_values.push(scalar_to_sql(&filter.field, &filter.value)?);
            }
            FilterOp::Contains => {
                sql.push_str(
                    " AND EXISTS (
                        SELECT 1
                        FROM json_each(documents.body, ?)
                        WHERE json_each.value = ?
                    )",
                );
                bind_values.push(SqlValue::Text(path));
                bind_values.push(scalar_to_sql(&filter.field, &filter.value)?);
            }
        }
    }
    Ok(())
}

fn json_path(field: &str) -> RepoResult<String> {
    if !FIELD_PATH_RE.is_match(field) {
        return Err(RepoError::InvalidQuery(format!(
            "unsupported field path `{field}`"
        )));
    }
    Ok(format!("$.{field}"))
}

fn scalar_to_sql(field: &str, value: &Value) -> RepoResult<SqlValue> {
    match value {
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(RepoError::InvalidQuery(format!(
                    "unsupported number on `{field}`"
                )))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => Err(RepoError::InvalidQuery(
            format!("filter on `{field}` needs a scalar value"),
        )),
    }
}

fn parse_document_row(row: &Row<'_>, collection: &str) -> RepoResult<StoredDocument> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid id `{id_text}` in {collection}"))
    })?;

    let body_text: String = row.get("body")?;
    let body = serde_json::from_str(&body_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid body for {collection}/{id}: {err}"))
    })?;

    Ok(StoredDocument {
        id,
        body,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
