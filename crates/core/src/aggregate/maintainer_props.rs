//! Property-based tests for the Aggregate Maintainer.
//!
//! Any sequence of inserts, status changes and removals applied through
//! bumps must leave the same counters a recount produces.

use chrono::Utc;
use kassa_shared::types::{AccountId, RecordId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::aggregate::{AggregateMaintainer, CounterDelta};
use crate::hierarchy::Lineage;
use crate::model::{
    Account, AccountStatus, AccountType, Period, Record, RecordCounters, RecordStatus, ValueType,
};
use crate::store::{EntityStore, MemoryStore};

#[derive(Debug, Clone)]
enum Op {
    Insert {
        account: usize,
        cents: i64,
        value_type: ValueType,
    },
    Change {
        record: usize,
        to: RecordStatus,
    },
    Remove {
        record: usize,
    },
}

fn arb_status() -> impl Strategy<Value = RecordStatus> {
    prop_oneof![
        Just(RecordStatus::Published),
        Just(RecordStatus::Declined),
        Just(RecordStatus::Approved),
        Just(RecordStatus::Closed),
    ]
}

fn arb_value_type() -> impl Strategy<Value = ValueType> {
    prop_oneof![Just(ValueType::Debit), Just(ValueType::Credit)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..3, 0i64..1_000_000, arb_value_type()).prop_map(
            |(account, cents, value_type)| Op::Insert {
                account,
                cents,
                value_type,
            }
        ),
        4 => (any::<usize>(), arb_status()).prop_map(|(record, to)| Op::Change { record, to }),
        1 => any::<usize>().prop_map(|record| Op::Remove { record }),
    ]
}

fn seeded() -> (MemoryStore, Period, Vec<Account>) {
    let store = MemoryStore::new();
    let period = Period::open("FY2026");
    store.insert_period(period.clone()).unwrap();
    let accounts: Vec<Account> = [AccountType::Result, AccountType::Asset, AccountType::Result]
        .into_iter()
        .enumerate()
        .map(|(i, account_type)| Account {
            id: AccountId::new(),
            period_id: period.id,
            ledger_code: format!("{}", 100 + i),
            title: String::new(),
            account_type,
            status: AccountStatus::Open,
            counters: RecordCounters::default(),
        })
        .collect();
    for account in &accounts {
        store.insert_account(account.clone()).unwrap();
    }
    // account_count is maintained by account creation, not by records.
    AggregateMaintainer::new(&store)
        .bump_period(period.id, &CounterDelta {
            account_count: 3,
            ..CounterDelta::default()
        })
        .unwrap();
    (store, period, accounts)
}

/// Runs the operations through bumps only. Returns the live record ids.
fn run_bumps(store: &MemoryStore, accounts: &[Account], ops: &[Op]) -> Vec<RecordId> {
    let maintainer = AggregateMaintainer::new(store);
    let mut live: Vec<RecordId> = Vec::new();

    for op in ops {
        match op {
            Op::Insert {
                account,
                cents,
                value_type,
            } => {
                let account = &accounts[*account];
                let record = Record {
                    id: RecordId::new(),
                    account_id: account.id,
                    period_id: account.period_id,
                    offset_account: None,
                    value: Decimal::new(*cents, 2),
                    value_type: *value_type,
                    status: RecordStatus::Published,
                    memo: String::new(),
                    version: 1,
                    created_at: Utc::now(),
                };
                let balance = CounterDelta::balance_of(account.account_type, &record.movement());
                let lineage = Lineage {
                    account_id: account.id,
                    period_id: account.period_id,
                };
                store.insert_record(record.clone()).unwrap();
                maintainer
                    .apply(lineage, &CounterDelta::for_insert(record.status, balance))
                    .unwrap();
                live.push(record.id);
            }
            Op::Change { record, to } => {
                if live.is_empty() {
                    continue;
                }
                let id = live[record % live.len()];
                let before = store.record(id).unwrap().unwrap();
                if before.status == *to {
                    continue;
                }
                let after = store.update_record_status(id, before.version, *to).unwrap();
                let lineage = Lineage {
                    account_id: after.account_id,
                    period_id: after.period_id,
                };
                maintainer
                    .apply(lineage, &CounterDelta::for_status_change(before.status, after.status))
                    .unwrap();
            }
            Op::Remove { record } => {
                if live.is_empty() {
                    continue;
                }
                let id = live.swap_remove(record % live.len());
                let removed = store.delete_record(id).unwrap();
                let account = accounts.iter().find(|a| a.id == removed.account_id).unwrap();
                let balance = CounterDelta::balance_of(account.account_type, &removed.movement());
                let lineage = Lineage {
                    account_id: removed.account_id,
                    period_id: removed.period_id,
                };
                maintainer
                    .apply(lineage, &CounterDelta::for_removal(removed.status, balance))
                    .unwrap();
            }
        }
    }
    live
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Bumped counters equal recounted counters after any sequence.
    #[test]
    fn prop_bump_matches_recount(ops in prop::collection::vec(arb_op(), 0..60)) {
        let (store, period, accounts) = seeded();
        run_bumps(&store, &accounts, &ops);

        let bumped_period = store.period(period.id).unwrap().unwrap();
        let bumped_accounts: Vec<Account> = store.list_accounts(period.id, None).unwrap();

        let report = AggregateMaintainer::new(&store).recount_period(period.id).unwrap();

        prop_assert!(report.issues.is_empty());
        prop_assert_eq!(bumped_period.totals, report.totals);
        for (bumped, recounted) in bumped_accounts.iter().zip(&report.accounts) {
            prop_assert_eq!(bumped.id, recounted.account_id);
            prop_assert_eq!(bumped.counters, recounted.counters);
        }
    }

    /// A period's unapproved count is the sum over its accounts.
    #[test]
    fn prop_period_unapproved_is_sum_of_accounts(ops in prop::collection::vec(arb_op(), 0..60)) {
        let (store, period, accounts) = seeded();
        run_bumps(&store, &accounts, &ops);

        let period = store.period(period.id).unwrap().unwrap();
        let sum: u64 = store
            .list_accounts(period.id, None)
            .unwrap()
            .iter()
            .map(|a| a.counters.record_count_unapproved)
            .sum();
        prop_assert_eq!(period.unapproved(), sum);
    }

    /// Unapproved count matches the status predicate over live records.
    #[test]
    fn prop_unapproved_counts_match_predicate(ops in prop::collection::vec(arb_op(), 0..60)) {
        let (store, _, accounts) = seeded();
        let live = run_bumps(&store, &accounts, &ops);

        for account in &accounts {
            let expected = live
                .iter()
                .filter_map(|id| store.record(*id).unwrap())
                .filter(|r| r.account_id == account.id && r.status.is_unapproved())
                .count() as u64;
            let stored = store.account(account.id).unwrap().unwrap();
            prop_assert_eq!(stored.counters.record_count_unapproved, expected);
        }
    }
}
