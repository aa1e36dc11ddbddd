//! Incremental bumps and authoritative recounts of ledger aggregates.
//!
//! Both paths derive counters from the same status predicates
//! ([`RecordStatus::is_unapproved`], [`RecordStatus::is_declined`]) and the
//! same balance rule ([`CounterDelta::balance_of`]), so a recount over a
//! record set always reproduces what the bumps accumulated for it.

use std::collections::HashSet;

use kassa_shared::types::{AccountId, PeriodId};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::delta::CounterDelta;
use super::report::{AccountRecount, Drift, FullRecount, RecountIssue, RecountReport};
use crate::error::LedgerError;
use crate::hierarchy::Lineage;
use crate::model::{Account, EntityRef, Period, PeriodTotals, RecordCounters};
use crate::store::{EntityStore, RecordFilter};

/// Maintains the denormalized counters of accounts and periods.
pub struct AggregateMaintainer<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> AggregateMaintainer<'a, S>
where
    S: EntityStore + ?Sized,
{
    /// Creates a maintainer over a store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Adds a delta to an account's record counters.
    pub fn bump_account(
        &self,
        account_id: AccountId,
        delta: &CounterDelta,
    ) -> Result<Account, LedgerError> {
        let account = self.store.adjust_account_counters(account_id, delta)?;
        debug!(%account_id, ?delta, "Bumped account counters");
        Ok(account)
    }

    /// Adds a delta to a period's totals.
    pub fn bump_period(
        &self,
        period_id: PeriodId,
        delta: &CounterDelta,
    ) -> Result<Period, LedgerError> {
        let period = self.store.adjust_period_counters(period_id, delta)?;
        debug!(%period_id, ?delta, "Bumped period totals");
        Ok(period)
    }

    /// Applies a delta at account scope, then at period scope.
    ///
    /// If the period bump fails the account has already moved; a recount of
    /// the period repairs it.
    pub fn apply(&self, lineage: Lineage, delta: &CounterDelta) -> Result<(), LedgerError> {
        if delta.is_zero() {
            return Ok(());
        }
        self.bump_account(lineage.account_id, delta)?;
        self.bump_period(lineage.period_id, delta)?;
        Ok(())
    }

    /// Recomputes one account's counters from its records and stores them.
    ///
    /// Whatever the overwrite changed is bumped into the owning period, so
    /// the period keeps summing its accounts. The period's balance is not
    /// touched; recount the period for that.
    pub fn recount_account(&self, account_id: AccountId) -> Result<AccountRecount, LedgerError> {
        let account = self
            .store
            .account(account_id)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let recount = self.tally_account(&account)?;
        let replaced = self
            .store
            .write_account_counters(account_id, recount.counters)?;
        debug!(%account_id, counters = ?recount.counters, "Recounted account");

        let correction = CounterDelta::between(&replaced, &recount.counters);
        if !correction.is_zero() {
            if self.store.period(account.period_id)?.is_some() {
                self.bump_period(account.period_id, &correction)?;
            } else {
                warn!(%account_id, period_id = %account.period_id, "Account has no period");
            }
        }
        Ok(recount)
    }

    /// Recomputes every account of a period, then the period itself.
    pub fn recount_period(&self, period_id: PeriodId) -> Result<RecountReport, LedgerError> {
        let period = self
            .store
            .period(period_id)?
            .ok_or(LedgerError::PeriodNotFound(period_id))?;
        let report = self.tally_period(&period)?;

        for account in &report.accounts {
            self.store
                .write_account_counters(account.account_id, account.counters)?;
        }
        self.store.write_period_totals(period_id, report.totals)?;

        info!(
            %period_id,
            accounts = report.accounts.len(),
            records = report.totals.records.record_count,
            unapproved = report.totals.records.record_count_unapproved,
            to_balance = %report.totals.to_balance,
            issues = report.issues.len(),
            "Recounted period"
        );
        Ok(report)
    }

    /// Recounts every period in parallel.
    ///
    /// Accounts whose period is gone, and records whose account and period
    /// are both gone, cannot be attributed to any report; they are listed in
    /// [`FullRecount::unreachable`] and left untouched.
    pub fn recount_all(&self) -> Result<FullRecount, LedgerError> {
        let periods = self.store.list_periods(None)?;
        let reports = periods
            .par_iter()
            .map(|period| self.recount_period(period.id))
            .collect::<Result<Vec<_>, _>>()?;

        let known: HashSet<PeriodId> = periods.iter().map(|p| p.id).collect();
        let mut unreachable = Vec::new();
        for account in self.store.list_all_accounts()? {
            if known.contains(&account.period_id) {
                continue;
            }
            warn!(
                account_id = %account.id,
                period_id = %account.period_id,
                "Account has no period"
            );
            unreachable.push(RecountIssue::OrphanAccount {
                account_id: account.id,
                period_id: account.period_id,
            });
        }
        for record in self.store.list_records(&RecordFilter::default())? {
            if known.contains(&record.period_id)
                || self.store.account(record.account_id)?.is_some()
            {
                continue;
            }
            warn!(
                record_id = %record.id,
                account_id = %record.account_id,
                "Record has no account and no period"
            );
            unreachable.push(RecountIssue::OrphanRecord {
                record_id: record.id,
                account_id: record.account_id,
            });
        }

        Ok(FullRecount {
            periods: reports,
            unreachable,
        })
    }

    /// Compares stored aggregates of a period and its accounts with a fresh
    /// tally. Nothing is written.
    pub fn audit_period(&self, period_id: PeriodId) -> Result<Vec<Drift>, LedgerError> {
        let period = self
            .store
            .period(period_id)?
            .ok_or(LedgerError::PeriodNotFound(period_id))?;
        let stored: Vec<Account> = self.store.list_accounts(period_id, None)?;
        let report = self.tally_period(&period)?;

        let mut drift = Vec::new();
        for (account, recount) in stored.iter().zip(&report.accounts) {
            drift.extend(Drift::between_counters(
                EntityRef::Account(account.id),
                &account.counters,
                &recount.counters,
            ));
        }
        drift.extend(Drift::between_totals(period_id, &period.totals, &report.totals));

        if !drift.is_empty() {
            warn!(%period_id, drifted = drift.len(), "Stored aggregates drifted from records");
        }
        Ok(drift)
    }

    fn tally_account(&self, account: &Account) -> Result<AccountRecount, LedgerError> {
        let records = self
            .store
            .list_records(&RecordFilter::by_account(account.id))?;

        let mut issues = Vec::new();
        let mut balance = Decimal::ZERO;
        for record in &records {
            if record.period_id != account.period_id {
                warn!(
                    record_id = %record.id,
                    recorded = %record.period_id,
                    actual = %account.period_id,
                    "Record period disagrees with its account"
                );
                issues.push(RecountIssue::PeriodMismatch {
                    record_id: record.id,
                    recorded: record.period_id,
                    actual: account.period_id,
                });
            }
            balance += CounterDelta::balance_of(account.account_type, &record.movement());
        }

        Ok(AccountRecount {
            account_id: account.id,
            counters: RecordCounters::tally(records.iter().map(|r| r.status)),
            balance,
            issues,
        })
    }

    fn tally_period(&self, period: &Period) -> Result<RecountReport, LedgerError> {
        let accounts = self.store.list_accounts(period.id, None)?;

        let mut totals = PeriodTotals {
            account_count: accounts.len() as u64,
            ..PeriodTotals::default()
        };
        let mut recounts = Vec::with_capacity(accounts.len());
        let mut issues = Vec::new();
        for account in &accounts {
            let recount = self.tally_account(account)?;
            totals.records.absorb(&recount.counters);
            totals.to_balance += recount.balance;
            issues.extend(recount.issues.iter().copied());
            recounts.push(recount);
        }

        // Records linked to this period whose account no longer exists.
        let owned: HashSet<AccountId> = accounts.iter().map(|a| a.id).collect();
        for record in self.store.list_records(&RecordFilter::by_period(period.id))? {
            if owned.contains(&record.account_id)
                || self.store.account(record.account_id)?.is_some()
            {
                continue;
            }
            warn!(
                record_id = %record.id,
                account_id = %record.account_id,
                "Skipping orphan record"
            );
            issues.push(RecountIssue::OrphanRecord {
                record_id: record.id,
                account_id: record.account_id,
            });
        }

        Ok(RecountReport {
            period_id: period.id,
            totals,
            accounts: recounts,
            issues,
        })
    }
}
