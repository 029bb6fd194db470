use txrecord_core::{
    ComponentTryStatus, ComponentTryStatuses, NewTxRecord, TxRecord, TxRecordUpdate, TxStatus,
};

#[test]
fn decode_reads_wire_field_names() {
    let statuses = ComponentTryStatuses::decode(
        r#"{"payment":{"componentID":"payment","tryStatus":"successful"},
            "stock":{"componentID":"stock","tryStatus":"hanging"}}"#,
    )
    .unwrap();

    assert_eq!(statuses.len(), 2);
    assert_eq!(
        statuses.get("payment"),
        Some(&ComponentTryStatus::new("payment", "successful"))
    );
    assert!(statuses.validate().is_ok());
}

#[test]
fn upsert_replaces_existing_component() {
    let mut statuses = ComponentTryStatuses::new();
    assert!(statuses
        .upsert(ComponentTryStatus::new("payment", "hanging"))
        .is_none());
    let previous = statuses
        .upsert(ComponentTryStatus::new("payment", "successful"))
        .unwrap();

    assert_eq!(previous.try_status, "hanging");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses.get("payment").unwrap().try_status, "successful");
}

#[test]
fn hanging_constructor_deduplicates_component_ids() {
    let record = NewTxRecord::hanging(["payment", "payment", "stock"], "hanging");
    assert_eq!(record.status, TxStatus::Hanging);
    assert_eq!(record.component_try_statuses.len(), 2);
    assert!(record
        .component_try_statuses
        .iter()
        .all(|status| status.try_status == "hanging"));
}

#[test]
fn update_builder_sets_only_requested_fields() {
    let update = TxRecordUpdate::new(3).status(TxStatus::Failed);
    assert_eq!(update.id, 3);
    assert_eq!(update.status, Some(TxStatus::Failed));
    assert!(update.component_try_statuses.is_none());
}

#[test]
fn record_serializes_with_snake_case_status() {
    let record = TxRecord {
        id: 1,
        status: TxStatus::Successful,
        component_try_statuses: ComponentTryStatuses::new(),
        created_at: 10,
        updated_at: 20,
        deleted_at: None,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["status"], "successful");
    assert_eq!(json["component_try_statuses"], serde_json::json!({}));
    assert!(record.is_active());
}
