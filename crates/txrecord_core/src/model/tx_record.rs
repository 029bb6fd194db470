//! Transaction record domain model.
//!
//! # Responsibility
//! - Define the persisted shape of one distributed transaction record.
//! - Encode/decode the per-component try-status map stored with each record.
//!
//! # Invariants
//! - `TxStatus` codes are stable on disk: hanging=1, successful=2, failed=3.
//! - Every try-status map key equals the `component_id` of its entry.
//! - `deleted_at` is the source of truth for tombstone state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Database-assigned row id of a transaction record.
pub type TxRecordId = i64;

/// Lifecycle status of a distributed transaction.
///
/// Plain status values; no transition rules are enforced in core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Started, outcome not yet decided.
    Hanging,
    /// All components confirmed.
    Successful,
    /// At least one component failed and the transaction was given up.
    Failed,
}

impl TxStatus {
    /// Returns the integer code persisted in `tx_record.status`.
    pub fn code(self) -> i64 {
        match self {
            Self::Hanging => 1,
            Self::Successful => 2,
            Self::Failed => 3,
        }
    }

    /// Parses a persisted status code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Hanging),
            2 => Some(Self::Successful),
            3 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One component's attempt outcome within a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTryStatus {
    #[serde(rename = "componentID")]
    pub component_id: String,
    /// Opaque status string owned by the coordinator.
    #[serde(rename = "tryStatus")]
    pub try_status: String,
}

impl ComponentTryStatus {
    pub fn new(component_id: impl Into<String>, try_status: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            try_status: try_status.into(),
        }
    }
}

/// Try-status map keyed by component id.
///
/// Persisted as a JSON object string in `tx_record.component_try_statuses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTryStatuses(BTreeMap<String, ComponentTryStatus>);

impl ComponentTryStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `status.component_id`.
    ///
    /// Returns the previous entry when one existed.
    pub fn upsert(&mut self, status: ComponentTryStatus) -> Option<ComponentTryStatus> {
        self.0.insert(status.component_id.clone(), status)
    }

    pub fn get(&self, component_id: &str) -> Option<&ComponentTryStatus> {
        self.0.get(component_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in component id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentTryStatus> {
        self.0.values()
    }

    /// Encodes the map as a JSON object string.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Decodes a persisted JSON object string.
    ///
    /// An empty (or whitespace-only) column value decodes to an empty map.
    pub fn decode(value: &str) -> Result<Self, serde_json::Error> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(value).map(Self)
    }

    /// Checks that every key matches its entry and no component id is blank.
    pub fn validate(&self) -> Result<(), TxRecordValidationError> {
        for (key, status) in &self.0 {
            if status.component_id.trim().is_empty() {
                return Err(TxRecordValidationError::EmptyComponentId);
            }
            if key != &status.component_id {
                return Err(TxRecordValidationError::ComponentKeyMismatch {
                    key: key.clone(),
                    component_id: status.component_id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<ComponentTryStatus> for ComponentTryStatuses {
    fn from_iter<I: IntoIterator<Item = ComponentTryStatus>>(iter: I) -> Self {
        let mut statuses = Self::default();
        for status in iter {
            statuses.upsert(status);
        }
        statuses
    }
}

/// Model-level invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxRecordValidationError {
    EmptyComponentId,
    ComponentKeyMismatch { key: String, component_id: String },
}

impl Display for TxRecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyComponentId => write!(f, "component id must not be empty"),
            Self::ComponentKeyMismatch { key, component_id } => write!(
                f,
                "try-status key `{key}` does not match component id `{component_id}`"
            ),
        }
    }
}

impl Error for TxRecordValidationError {}

/// Persisted transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: TxRecordId,
    pub status: TxStatus,
    pub component_try_statuses: ComponentTryStatuses,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every update.
    pub updated_at: i64,
    /// Soft delete tombstone in epoch milliseconds.
    pub deleted_at: Option<i64>,
}

impl TxRecord {
    /// Returns the try-status of one component, if it participates.
    pub fn component(&self, component_id: &str) -> Option<&ComponentTryStatus> {
        self.component_try_statuses.get(component_id)
    }

    /// Returns whether this record has not been soft-deleted.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn validate(&self) -> Result<(), TxRecordValidationError> {
        self.component_try_statuses.validate()
    }
}

/// Insert model; the row id and timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTxRecord {
    pub status: TxStatus,
    pub component_try_statuses: ComponentTryStatuses,
}

impl NewTxRecord {
    pub fn new(status: TxStatus) -> Self {
        Self {
            status,
            component_try_statuses: ComponentTryStatuses::default(),
        }
    }

    /// Creates a hanging record with every component seeded to `try_status`.
    pub fn hanging<I, S>(component_ids: I, try_status: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: TxStatus::Hanging,
            component_try_statuses: component_ids
                .into_iter()
                .map(|id| ComponentTryStatus::new(id, try_status))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), TxRecordValidationError> {
        self.component_try_statuses.validate()
    }
}

/// Partial update. Only `Some` fields are written; `updated_at` is always bumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecordUpdate {
    pub id: TxRecordId,
    pub status: Option<TxStatus>,
    pub component_try_statuses: Option<ComponentTryStatuses>,
}

impl TxRecordUpdate {
    pub fn new(id: TxRecordId) -> Self {
        Self {
            id,
            status: None,
            component_try_statuses: None,
        }
    }

    pub fn status(mut self, status: TxStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn component_try_statuses(mut self, statuses: ComponentTryStatuses) -> Self {
        self.component_try_statuses = Some(statuses);
        self
    }

    pub fn validate(&self) -> Result<(), TxRecordValidationError> {
        match &self.component_try_statuses {
            Some(statuses) => statuses.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentTryStatus, ComponentTryStatuses, TxStatus, TxRecordValidationError};

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(TxStatus::Hanging.code(), 1);
        assert_eq!(TxStatus::Successful.code(), 2);
        assert_eq!(TxStatus::Failed.code(), 3);
        assert_eq!(TxStatus::from_code(2), Some(TxStatus::Successful));
        assert_eq!(TxStatus::from_code(0), None);
        assert_eq!(TxStatus::from_code(4), None);
    }

    #[test]
    fn encode_uses_wire_field_names() {
        let statuses: ComponentTryStatuses =
            [ComponentTryStatus::new("payment", "successful")].into_iter().collect();
        let encoded = statuses.encode().unwrap();
        assert_eq!(
            encoded,
            r#"{"payment":{"componentID":"payment","tryStatus":"successful"}}"#
        );
    }

    #[test]
    fn decode_treats_blank_as_empty() {
        assert!(ComponentTryStatuses::decode("").unwrap().is_empty());
        assert!(ComponentTryStatuses::decode("  ").unwrap().is_empty());
        assert!(ComponentTryStatuses::decode("{}").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(ComponentTryStatuses::decode("[1, 2").is_err());
    }

    #[test]
    fn validate_rejects_key_mismatch() {
        let statuses = ComponentTryStatuses::decode(
            r#"{"stock":{"componentID":"payment","tryStatus":"hanging"}}"#,
        )
        .unwrap();
        assert!(matches!(
            statuses.validate(),
            Err(TxRecordValidationError::ComponentKeyMismatch { .. })
        ));
    }
}
