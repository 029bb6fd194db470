//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `txrecord_core` linkage.
//! - Exercise one create/update cycle against a real connection.
//!
//! Usage: `txrecord_cli [DB_PATH]`. Without a path an in-memory database is used.
//! `TXRECORD_LOG_DIR` (absolute) enables file logging at `TXRECORD_LOG_LEVEL`.

use log::warn;
use std::error::Error;
use std::process::ExitCode;
use txrecord_core::db::{open_db, open_db_in_memory};
use txrecord_core::{
    core_version, default_log_level, init_logging, SqliteTxRecordRepository, TxRecordQuery,
    TxRecordService, TxStatus,
};

const LOG_DIR_ENV: &str = "TXRECORD_LOG_DIR";
const LOG_LEVEL_ENV: &str = "TXRECORD_LOG_LEVEL";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("txrecord_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        let level =
            std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().to_string());
        init_logging(&level, &log_dir)?;
    }

    println!("txrecord_core version={}", core_version());

    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn)?);

    let id = service.begin(["probe"])?;
    service.record_try_status(id, "probe", "successful")?;
    service.mark_successful(id)?;

    for status in [TxStatus::Hanging, TxStatus::Successful, TxStatus::Failed] {
        let count = service
            .list(&TxRecordQuery::new().with_status(status))?
            .len();
        println!("tx_record status={} count={count}", status.code());
    }

    if service.list_hanging(None)?.iter().any(|record| record.id == id) {
        warn!("event=cli_probe module=cli status=error id={id} reason=still_hanging");
    }

    Ok(())
}
