//! Transaction record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `tx_record` table.
//! - Keep SQL details and filter composition inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate the try-status map before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Soft-deleted rows are excluded unless a query asks for them.
//! - Listing is deterministic: `id ASC`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::tx_record::{
    ComponentTryStatuses, NewTxRecord, TxRecord, TxRecordId, TxRecordUpdate,
    TxRecordValidationError, TxStatus,
};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TX_RECORD_TABLE: &str = "tx_record";

const TX_RECORD_COLUMNS: [&str; 6] = [
    "id",
    "created_at",
    "updated_at",
    "deleted_at",
    "status",
    "component_try_statuses",
];

const TX_RECORD_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    deleted_at,
    status,
    component_try_statuses
FROM tx_record";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for transaction record persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(TxRecordValidationError),
    Db(DbError),
    /// No active row with this id.
    NotFound(TxRecordId),
    /// Update issued without a storage-assigned id.
    MissingPrimaryKey,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "tx record not found: {id}"),
            Self::MissingPrimaryKey => write!(f, "tx record update requires a primary key"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tx record repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "tx record repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "tx record repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted tx record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::MissingPrimaryKey
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<TxRecordValidationError> for RepoError {
    fn from(value: TxRecordValidationError) -> Self {
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

/// Composable filters for listing transaction records.
///
/// Every set field narrows the result; the default query returns all active
/// rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRecordQuery {
    pub id: Option<TxRecordId>,
    /// Matches any of the listed statuses. `Some(empty)` matches no rows.
    pub statuses: Option<Vec<TxStatus>>,
    /// Exclusive upper bound on `created_at`, epoch milliseconds.
    pub created_before: Option<i64>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl TxRecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: TxRecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_status(mut self, status: TxStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TxStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn created_before(mut self, epoch_ms: i64) -> Self {
        self.created_before = Some(epoch_ms);
        self
    }

    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("{TX_RECORD_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !self.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        if let Some(id) = self.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Integer(id));
        }

        match self.statuses.as_deref() {
            None => {}
            Some([]) => sql.push_str(" AND 0"),
            Some(statuses) => {
                let placeholders = vec!["?"; statuses.len()].join(", ");
                sql.push_str(&format!(" AND status IN ({placeholders})"));
                bind_values.extend(statuses.iter().map(|status| Value::Integer(status.code())));
            }
        }

        if let Some(created_before) = self.created_before {
            sql.push_str(" AND created_at < ?");
            bind_values.push(Value::Integer(created_before));
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }

        (sql, bind_values)
    }
}

/// Repository interface for transaction record CRUD operations.
pub trait TxRecordRepository {
    fn get_tx_records(&self, query: &TxRecordQuery) -> RepoResult<Vec<TxRecord>>;
    fn get_tx_record(&self, id: TxRecordId, include_deleted: bool)
        -> RepoResult<Option<TxRecord>>;
    fn create_tx_record(&self, record: &NewTxRecord) -> RepoResult<TxRecordId>;
    fn update_tx_record(&self, update: &TxRecordUpdate) -> RepoResult<()>;
    fn soft_delete_tx_record(&self, id: TxRecordId) -> RepoResult<()>;
}

/// SQLite-backed transaction record repository.
pub struct SqliteTxRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTxRecordRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tx_record_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TxRecordRepository for SqliteTxRecordRepository<'_> {
    fn get_tx_records(&self, query: &TxRecordQuery) -> RepoResult<Vec<TxRecord>> {
        let (sql, bind_values) = query.to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_tx_record_row(row)?);
        }

        debug!(
            "event=tx_record_list module=repo status=ok count={}",
            records.len()
        );
        Ok(records)
    }

    fn get_tx_record(
        &self,
        id: TxRecordId,
        include_deleted: bool,
    ) -> RepoResult<Option<TxRecord>> {
        let query = TxRecordQuery::new()
            .with_id(id)
            .include_deleted(include_deleted);
        Ok(self.get_tx_records(&query)?.into_iter().next())
    }

    fn create_tx_record(&self, record: &NewTxRecord) -> RepoResult<TxRecordId> {
        record.validate()?;
        let encoded = encode_try_statuses(&record.component_try_statuses)?;

        self.conn.execute(
            "INSERT INTO tx_record (
                status,
                component_try_statuses
            ) VALUES (?1, ?2);",
            params![record.status.code(), encoded],
        )?;

        let id = self.conn.last_insert_rowid();
        info!(
            "event=tx_record_create module=repo status=ok id={id} tx_status={} components={}",
            record.status.code(),
            record.component_try_statuses.len()
        );
        Ok(id)
    }

    fn update_tx_record(&self, update: &TxRecordUpdate) -> RepoResult<()> {
        if update.id <= 0 {
            return Err(RepoError::MissingPrimaryKey);
        }
        update.validate()?;

        let mut sql = String::from(
            "UPDATE tx_record
             SET updated_at = (strftime('%s', 'now') * 1000)",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = update.status {
            sql.push_str(", status = ?");
            bind_values.push(Value::Integer(status.code()));
        }

        if let Some(statuses) = update.component_try_statuses.as_ref() {
            sql.push_str(", component_try_statuses = ?");
            bind_values.push(Value::Text(encode_try_statuses(statuses)?));
        }

        sql.push_str(" WHERE id = ? AND deleted_at IS NULL;");
        bind_values.push(Value::Integer(update.id));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound(update.id));
        }

        info!(
            "event=tx_record_update module=repo status=ok id={} tx_status={}",
            update.id,
            update
                .status
                .map_or_else(|| "unchanged".to_string(), |status| status.code().to_string())
        );
        Ok(())
    }

    fn soft_delete_tx_record(&self, id: TxRecordId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tx_record
             SET
                deleted_at = (strftime('%s', 'now') * 1000),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            [id],
        )?;

        if changed == 0 {
            if !tx_record_exists(self.conn, id)? {
                return Err(RepoError::NotFound(id));
            }
            return Ok(());
        }

        info!("event=tx_record_delete module=repo status=ok id={id}");
        Ok(())
    }
}

fn tx_record_exists(conn: &Connection, id: TxRecordId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tx_record WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn encode_try_statuses(statuses: &ComponentTryStatuses) -> RepoResult<String> {
    statuses
        .encode()
        .map_err(|err| RepoError::InvalidData(format!("cannot encode try statuses: {err}")))
}

fn parse_tx_record_row(row: &Row<'_>) -> RepoResult<TxRecord> {
    let id: TxRecordId = row.get("id")?;

    let status_code: i64 = row.get("status")?;
    let status = TxStatus::from_code(status_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_code}` in tx_record.status (id={id})"
        ))
    })?;

    let raw_statuses: String = row.get("component_try_statuses")?;
    let component_try_statuses = ComponentTryStatuses::decode(&raw_statuses).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid json in tx_record.component_try_statuses (id={id}): {err}"
        ))
    })?;

    let record = TxRecord {
        id,
        status,
        component_try_statuses,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    record.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid try statuses in tx_record.component_try_statuses (id={id}): {err}"
        ))
    })?;
    Ok(record)
}

fn ensure_tx_record_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, TX_RECORD_TABLE)? {
        return Err(RepoError::MissingRequiredTable(TX_RECORD_TABLE));
    }

    for column in TX_RECORD_COLUMNS {
        if !table_has_column(conn, TX_RECORD_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: TX_RECORD_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::TxRecordQuery;
    use crate::model::tx_record::TxStatus;

    #[test]
    fn default_query_excludes_deleted_rows() {
        let (sql, binds) = TxRecordQuery::default().to_sql();
        assert!(sql.contains("deleted_at IS NULL"));
        assert!(sql.ends_with("ORDER BY id ASC"));
        assert!(binds.is_empty());
    }

    #[test]
    fn status_set_expands_placeholders() {
        let (sql, binds) = TxRecordQuery::new()
            .with_statuses([TxStatus::Hanging, TxStatus::Failed])
            .to_sql();
        assert!(sql.contains("status IN (?, ?)"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn empty_status_set_matches_nothing() {
        let (sql, binds) = TxRecordQuery::new()
            .with_statuses(Vec::new())
            .to_sql();
        assert!(sql.contains(" AND 0"));
        assert!(!sql.contains("status IN"));
        assert!(binds.is_empty());
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, binds) = TxRecordQuery::new().offset(3).to_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(binds.len(), 1);
    }
}
