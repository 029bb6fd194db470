//! Transaction record use-case service.
//!
//! # Responsibility
//! - Provide coordinator-facing entry points on top of the repository.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - No status transition rules are enforced here.

use crate::model::tx_record::{
    ComponentTryStatus, NewTxRecord, TxRecord, TxRecordId, TxRecordUpdate, TxStatus,
};
use crate::repo::tx_record_repo::{RepoError, RepoResult, TxRecordQuery, TxRecordRepository};

/// Try-status seeded for every component of a new transaction.
pub const INITIAL_TRY_STATUS: &str = "hanging";

/// Use-case service wrapper for transaction record operations.
pub struct TxRecordService<R: TxRecordRepository> {
    repo: R,
}

impl<R: TxRecordRepository> TxRecordService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a hanging record with each component seeded to `hanging`.
    pub fn begin<I, S>(&self, component_ids: I) -> RepoResult<TxRecordId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = NewTxRecord::hanging(component_ids, INITIAL_TRY_STATUS);
        self.repo.create_tx_record(&record)
    }

    /// Replaces one component's try-status and writes the map back.
    ///
    /// Components not yet present in the map are added.
    pub fn record_try_status(
        &self,
        id: TxRecordId,
        component_id: &str,
        try_status: &str,
    ) -> RepoResult<()> {
        let record = self
            .repo
            .get_tx_record(id, false)?
            .ok_or(RepoError::NotFound(id))?;

        let mut statuses = record.component_try_statuses;
        statuses.upsert(ComponentTryStatus::new(component_id, try_status));
        self.repo
            .update_tx_record(&TxRecordUpdate::new(id).component_try_statuses(statuses))
    }

    pub fn mark_successful(&self, id: TxRecordId) -> RepoResult<()> {
        self.set_status(id, TxStatus::Successful)
    }

    pub fn mark_failed(&self, id: TxRecordId) -> RepoResult<()> {
        self.set_status(id, TxStatus::Failed)
    }

    /// Lists active hanging records, optionally only those created before a cutoff.
    pub fn list_hanging(&self, created_before: Option<i64>) -> RepoResult<Vec<TxRecord>> {
        let mut query = TxRecordQuery::new().with_status(TxStatus::Hanging);
        query.created_before = created_before;
        self.repo.get_tx_records(&query)
    }

    pub fn get(&self, id: TxRecordId, include_deleted: bool) -> RepoResult<Option<TxRecord>> {
        self.repo.get_tx_record(id, include_deleted)
    }

    pub fn list(&self, query: &TxRecordQuery) -> RepoResult<Vec<TxRecord>> {
        self.repo.get_tx_records(query)
    }

    pub fn create(&self, record: &NewTxRecord) -> RepoResult<TxRecordId> {
        self.repo.create_tx_record(record)
    }

    pub fn update(&self, update: &TxRecordUpdate) -> RepoResult<()> {
        self.repo.update_tx_record(update)
    }

    pub fn soft_delete(&self, id: TxRecordId) -> RepoResult<()> {
        self.repo.soft_delete_tx_record(id)
    }

    fn set_status(&self, id: TxRecordId, status: TxStatus) -> RepoResult<()> {
        self.repo
            .update_tx_record(&TxRecordUpdate::new(id).status(status))
    }
}
