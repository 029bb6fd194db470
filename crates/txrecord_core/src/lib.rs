//! Persistence core for distributed transaction records.
//! Owns the `tx_record` schema and every read/write against it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::tx_record::{
    ComponentTryStatus, ComponentTryStatuses, NewTxRecord, TxRecord, TxRecordId, TxRecordUpdate,
    TxRecordValidationError, TxStatus,
};
pub use repo::tx_record_repo::{
    RepoError, RepoResult, SqliteTxRecordRepository, TxRecordQuery, TxRecordRepository,
};
pub use service::tx_record_service::{TxRecordService, INITIAL_TRY_STATUS};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
