//! Bulk import tests: snapshots are loaded raw, then recounted.

use std::sync::Arc;

use kassa_core::LedgerService;
use kassa_core::aggregate::RecountIssue;
use kassa_core::model::{AccountType, NewAccount, NewRecord};
use kassa_core::store::{LedgerSnapshot, MemoryStore};
use kassa_shared::types::{AccountId, ActorId, PeriodId};
use rust_decimal_macros::dec;

const IMPORT: &str = r#"{
    "periods": [{
        "id": "01890a5d-ac96-774b-bcce-b302099a8057",
        "title": "FY2025",
        "status": "open",
        "account_count": 0,
        "record_count": 0,
        "record_count_unapproved": 0,
        "record_count_declined": 0,
        "to_balance": "0"
    }],
    "accounts": [
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8058",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "ledger_code": "8000",
            "title": "Sales",
            "type": "result",
            "status": "open",
            "record_count": 0,
            "record_count_unapproved": 0,
            "record_count_declined": 0
        },
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8059",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "ledger_code": "102",
            "type": "asset",
            "status": "open",
            "record_count": 9,
            "record_count_unapproved": 9,
            "record_count_declined": 9
        }
    ],
    "records": [
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8060",
            "account_id": "01890a5d-ac96-774b-bcce-b302099a8058",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "value": "125.40",
            "value_type": "credit",
            "status": "approved",
            "created_at": "2025-03-01T10:00:00Z"
        },
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8061",
            "account_id": "01890a5d-ac96-774b-bcce-b302099a8058",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "value": "25.40",
            "value_type": "debit",
            "status": "declined",
            "created_at": "2025-03-02T10:00:00Z"
        },
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8062",
            "account_id": "01890a5d-ac96-774b-bcce-b302099a8059",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "value": "1000",
            "value_type": "debit",
            "status": "published",
            "created_at": "2025-03-03T10:00:00Z"
        },
        {
            "id": "01890a5d-ac96-774b-bcce-b302099a8063",
            "account_id": "01890a5d-ac96-774b-bcce-b302099a80ff",
            "period_id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "value": "1",
            "value_type": "credit",
            "status": "published",
            "created_at": "2025-03-04T10:00:00Z"
        }
    ]
}"#;

fn imported() -> LedgerService<MemoryStore> {
    let snapshot = LedgerSnapshot::from_json(IMPORT).unwrap();
    LedgerService::new(Arc::new(MemoryStore::from_snapshot(snapshot).unwrap()))
}

#[test]
fn test_recount_after_import_establishes_aggregates() {
    let ledger = imported();
    let period_id: PeriodId = "01890a5d-ac96-774b-bcce-b302099a8057".parse().unwrap();

    let drift = ledger.audit_period(period_id).unwrap();
    assert!(!drift.is_empty());

    let full = ledger.recount_all().unwrap();
    assert_eq!(full.periods.len(), 1);
    assert!(matches!(
        full.periods[0].issues.as_slice(),
        [RecountIssue::OrphanRecord { .. }]
    ));

    let period = ledger.period(period_id).unwrap();
    assert_eq!(period.totals.account_count, 2);
    assert_eq!(period.totals.records.record_count, 3);
    assert_eq!(period.totals.records.record_count_unapproved, 2);
    assert_eq!(period.totals.records.record_count_declined, 1);
    assert_eq!(period.totals.to_balance, dec!(100.00));
    assert!(ledger.audit_period(period_id).unwrap().is_empty());
}

#[test]
fn test_bumps_continue_from_recounted_state() {
    let ledger = imported();
    let actor = ActorId::new();
    let period_id: PeriodId = "01890a5d-ac96-774b-bcce-b302099a8057".parse().unwrap();
    ledger.recount_all().unwrap();

    let account = ledger
        .create_account(actor, NewAccount::new(period_id, "8100", AccountType::Result))
        .unwrap()
        .applied()
        .unwrap();
    ledger
        .create_record(actor, NewRecord::credit(account.id, dec!(0.60)))
        .unwrap()
        .applied()
        .unwrap();

    let period = ledger.period(period_id).unwrap();
    assert_eq!(period.totals.account_count, 3);
    assert_eq!(period.totals.to_balance, dec!(100.60));
    assert!(ledger.audit_period(period_id).unwrap().is_empty());
}

const STRAY_ACCOUNT: &str = r#"{
    "accounts": [{
        "id": "01890a5d-ac96-774b-bcce-b302099a8070",
        "period_id": "01890a5d-ac96-774b-bcce-b302099a80ee",
        "ledger_code": "8000",
        "type": "result",
        "status": "open",
        "record_count": 1,
        "record_count_unapproved": 1,
        "record_count_declined": 0
    }],
    "records": [{
        "id": "01890a5d-ac96-774b-bcce-b302099a8071",
        "account_id": "01890a5d-ac96-774b-bcce-b302099a8070",
        "period_id": "01890a5d-ac96-774b-bcce-b302099a80ee",
        "value": "9.99",
        "value_type": "credit",
        "status": "published",
        "created_at": "2025-03-05T10:00:00Z"
    }]
}"#;

#[test]
fn test_account_without_period_is_reported_and_kept() {
    let snapshot = LedgerSnapshot::from_json(STRAY_ACCOUNT).unwrap();
    let store = MemoryStore::from_snapshot(snapshot.clone()).unwrap();
    let ledger = LedgerService::new(Arc::new(store));
    let account_id: AccountId = "01890a5d-ac96-774b-bcce-b302099a8070".parse().unwrap();
    let period_id: PeriodId = "01890a5d-ac96-774b-bcce-b302099a80ee".parse().unwrap();

    let full = ledger.recount_all().unwrap();
    assert!(full.periods.is_empty());
    assert_eq!(
        full.unreachable,
        vec![RecountIssue::OrphanAccount {
            account_id,
            period_id,
        }]
    );

    let exported = ledger.store().snapshot().unwrap();
    assert_eq!(exported.accounts, snapshot.accounts);
    assert_eq!(exported.records, snapshot.records);
}

#[test]
fn test_export_round_trips_repaired_state() {
    let ledger = imported();
    ledger.recount_all().unwrap();

    let exported = ledger.store().snapshot().unwrap();
    let json = exported.to_json_pretty().unwrap();
    let reloaded = LedgerSnapshot::from_json(&json).unwrap();
    assert_eq!(reloaded, exported);
}
