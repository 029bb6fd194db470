use txrecord_core::db::open_db_in_memory;
use txrecord_core::{
    RepoError, SqliteTxRecordRepository, TxRecordQuery, TxRecordService, TxStatus,
    INITIAL_TRY_STATUS,
};

#[test]
fn begin_creates_hanging_record_with_seeded_components() {
    let conn = open_db_in_memory().unwrap();
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn).unwrap());

    let id = service.begin(["payment", "stock", "coupon"]).unwrap();
    let record = service.get(id, false).unwrap().unwrap();

    assert_eq!(record.status, TxStatus::Hanging);
    let components: Vec<_> = record
        .component_try_statuses
        .iter()
        .map(|status| (status.component_id.as_str(), status.try_status.as_str()))
        .collect();
    assert_eq!(
        components,
        vec![
            ("coupon", INITIAL_TRY_STATUS),
            ("payment", INITIAL_TRY_STATUS),
            ("stock", INITIAL_TRY_STATUS),
        ]
    );
}

#[test]
fn record_try_status_replaces_one_component() {
    let conn = open_db_in_memory().unwrap();
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn).unwrap());

    let id = service.begin(["payment", "stock"]).unwrap();
    service
        .record_try_status(id, "payment", "successful")
        .unwrap();
    service.record_try_status(id, "audit", "failure").unwrap();

    let record = service.get(id, false).unwrap().unwrap();
    assert_eq!(record.component("payment").unwrap().try_status, "successful");
    assert_eq!(record.component("stock").unwrap().try_status, INITIAL_TRY_STATUS);
    assert_eq!(record.component("audit").unwrap().try_status, "failure");
    assert_eq!(record.status, TxStatus::Hanging);
}

#[test]
fn record_try_status_on_missing_record_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn).unwrap());

    let err = service
        .record_try_status(7, "payment", "successful")
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(7)));
}

#[test]
fn status_writes_do_not_enforce_transitions() {
    let conn = open_db_in_memory().unwrap();
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn).unwrap());

    let id = service.begin(["payment"]).unwrap();
    service.mark_failed(id).unwrap();
    service.mark_successful(id).unwrap();

    let record = service.get(id, false).unwrap().unwrap();
    assert_eq!(record.status, TxStatus::Successful);
    assert_eq!(record.component("payment").unwrap().try_status, INITIAL_TRY_STATUS);
}

#[test]
fn list_hanging_applies_cutoff_and_skips_deleted() {
    let conn = open_db_in_memory().unwrap();
    let service = TxRecordService::new(SqliteTxRecordRepository::try_new(&conn).unwrap());

    let stale = service.begin(["payment"]).unwrap();
    let fresh = service.begin(["payment"]).unwrap();
    let deleted = service.begin(["payment"]).unwrap();
    let done = service.begin(["payment"]).unwrap();
    service.mark_successful(done).unwrap();
    service.soft_delete(deleted).unwrap();

    conn.execute("UPDATE tx_record SET created_at = 1000;", [])
        .unwrap();
    conn.execute(
        "UPDATE tx_record SET created_at = 9000 WHERE id = ?1;",
        [fresh],
    )
    .unwrap();

    let all: Vec<_> = service
        .list_hanging(None)
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(all, vec![stale, fresh]);

    let overdue: Vec<_> = service
        .list_hanging(Some(5000))
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(overdue, vec![stale]);

    let with_deleted = service
        .list(&TxRecordQuery::new().include_deleted(true))
        .unwrap();
    assert_eq!(with_deleted.len(), 4);
}
