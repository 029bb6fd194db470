//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for transaction records.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `MissingPrimaryKey`)
//!   in addition to DB transport errors.

pub mod tx_record_repo;
