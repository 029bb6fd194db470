//! Domain model for distributed transaction records.
//!
//! # Responsibility
//! - Define canonical data structures persisted by the repository layer.
//!
//! # Invariants
//! - Every record is identified by a storage-assigned `TxRecordId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod tx_record;
