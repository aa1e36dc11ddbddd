//! Ledger service facade.
//!
//! Every mutation takes the acting [`ActorId`] and explicit entity ids. The
//! record lifecycle lives in [`crate::lifecycle::engine`], closing in
//! [`crate::closing::guard`]; this module holds construction, the catalog
//! operations and read views.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kassa_shared::AppConfig;
use kassa_shared::config::ClosingCountSource;
use kassa_shared::types::{AccountId, ActorId, PeriodId, RecordId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{AggregateMaintainer, CounterDelta, Drift, FullRecount, RecountReport};
use crate::authz::{AccountAction, Action, AllowAll, Authorizer, PeriodAction};
use crate::error::LedgerError;
use crate::hierarchy::HierarchyResolver;
use crate::model::{
    Account, AccountStatus, AccountType, EntityRef, NewAccount, Period, PeriodStatus, Record,
    RecordCounters,
};
use crate::outcome::{Outcome, Refusal};
use crate::store::{EntityStore, RecordFilter, StoreError};

/// Entry point for all ledger operations.
pub struct LedgerService<S: ?Sized> {
    pub(crate) store: Arc<S>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) resolver: HierarchyResolver,
    pub(crate) count_source: ClosingCountSource,
}

/// Read view of a period for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    /// Period id.
    pub id: PeriodId,
    /// Title.
    pub title: String,
    /// Status.
    pub status: PeriodStatus,
    /// When it was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Number of accounts.
    pub account_count: u64,
    /// Record counters over all accounts.
    pub records: RecordCounters,
    /// Net result balance.
    pub to_balance: Decimal,
    /// True if the closing guard would currently let it close.
    pub closable: bool,
}

/// Read view of an account for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    /// Account id.
    pub id: AccountId,
    /// Owning period.
    pub period_id: PeriodId,
    /// Ledger code.
    pub ledger_code: String,
    /// Title.
    pub title: String,
    /// Type.
    pub account_type: AccountType,
    /// Status.
    pub status: AccountStatus,
    /// Record counters.
    pub records: RecordCounters,
    /// True if the closing guard would currently let it close.
    pub closable: bool,
}

impl<S> LedgerService<S>
where
    S: EntityStore + ?Sized,
{
    /// Creates a service that allows every action and trusts stored counters.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            authorizer: Arc::new(AllowAll),
            resolver: HierarchyResolver::new(),
            count_source: ClosingCountSource::default(),
        }
    }

    /// Creates a service configured from the application config.
    pub fn from_config(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            store,
            authorizer: Arc::new(AllowAll),
            resolver: HierarchyResolver::from_config(&config.hierarchy),
            count_source: config.ledger.closing_count_source,
        }
    }

    /// Replaces the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Replaces the closing count source.
    #[must_use]
    pub fn with_count_source(mut self, count_source: ClosingCountSource) -> Self {
        self.count_source = count_source;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The hierarchy resolver.
    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    /// The aggregate maintainer over this service's store.
    pub fn aggregates(&self) -> AggregateMaintainer<'_, S> {
        AggregateMaintainer::new(&*self.store)
    }

    /// Returns the refusal to report if the actor may not perform the action.
    pub(crate) fn authorize(
        &self,
        actor: ActorId,
        action: Action,
        target: EntityRef,
    ) -> Option<Refusal> {
        if self.authorizer.permits(actor, action, target) {
            None
        } else {
            warn!(%actor, %action, %target, "Action forbidden");
            Some(Refusal::Forbidden { actor, action })
        }
    }

    // ========== Catalog ==========

    /// Creates an open period.
    pub fn create_period(
        &self,
        actor: ActorId,
        title: impl Into<String>,
    ) -> Result<Outcome<Period>, LedgerError> {
        let period = Period::open(title);
        if let Some(refusal) = self.authorize(
            actor,
            Action::Period(PeriodAction::Create),
            EntityRef::Period(period.id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }

        self.store.insert_period(period.clone())?;
        info!(period_id = %period.id, title = %period.title, "Period created");
        Ok(Outcome::Applied(period))
    }

    /// Creates an account under an open period.
    pub fn create_account(
        &self,
        actor: ActorId,
        new: NewAccount,
    ) -> Result<Outcome<Account>, LedgerError> {
        let period = self.period(new.period_id)?;
        if let Some(refusal) = self.authorize(
            actor,
            Action::Account(AccountAction::Create),
            EntityRef::Period(period.id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }
        if !period.is_open() {
            return Ok(Outcome::Refused(Refusal::ParentClosed(EntityRef::Period(
                period.id,
            ))));
        }
        let taken = self
            .store
            .list_accounts(period.id, None)?
            .iter()
            .any(|a| a.ledger_code == new.ledger_code);
        if taken {
            return Err(LedgerError::DuplicateLedgerCode {
                period_id: period.id,
                ledger_code: new.ledger_code,
            });
        }

        let account = Account {
            id: AccountId::new(),
            period_id: period.id,
            ledger_code: new.ledger_code,
            title: new.title,
            account_type: new.account_type,
            status: AccountStatus::Open,
            counters: RecordCounters::default(),
        };
        self.store.insert_account(account.clone())?;
        self.aggregates()
            .bump_period(period.id, &CounterDelta::account_added())?;

        info!(
            account_id = %account.id,
            period_id = %period.id,
            ledger_code = %account.ledger_code,
            account_type = %account.account_type,
            "Account created"
        );
        Ok(Outcome::Applied(account))
    }

    /// Deletes an account that has no records.
    pub fn delete_account(
        &self,
        actor: ActorId,
        account_id: AccountId,
    ) -> Result<Outcome<Account>, LedgerError> {
        let account = self.account(account_id)?;
        let entity = EntityRef::Account(account_id);
        if let Some(refusal) =
            self.authorize(actor, Action::Account(AccountAction::Delete), entity)
        {
            return Ok(Outcome::Refused(refusal));
        }

        let records = self
            .store
            .list_records(&RecordFilter::by_account(account_id))?
            .len() as u64;
        if records > 0 {
            return Ok(Outcome::Refused(Refusal::HasDescendants {
                entity,
                count: records,
            }));
        }

        match self.store.delete_account(account_id, false) {
            Ok(_) => {}
            Err(StoreError::HasChildren(_)) => {
                // A record was added after the check.
                return Ok(Outcome::Refused(Refusal::HasDescendants { entity, count: 1 }));
            }
            Err(e) => return Err(e.into()),
        }
        self.resolver.forget_account(account_id);
        self.aggregates()
            .bump_period(account.period_id, &CounterDelta::account_removed())?;

        info!(%account_id, period_id = %account.period_id, "Account deleted");
        Ok(Outcome::Applied(account))
    }

    /// Deletes a period. Without `cascade` the period must have no accounts.
    ///
    /// Returns the number of accounts removed with it.
    pub fn delete_period(
        &self,
        actor: ActorId,
        period_id: PeriodId,
        cascade: bool,
    ) -> Result<Outcome<usize>, LedgerError> {
        let period = self.period(period_id)?;
        let entity = EntityRef::Period(period_id);
        if let Some(refusal) = self.authorize(actor, Action::Period(PeriodAction::Delete), entity)
        {
            return Ok(Outcome::Refused(refusal));
        }

        let removed = match self.store.delete_period(period_id, cascade) {
            Ok(removed) => removed,
            Err(StoreError::HasChildren(_)) => {
                return Ok(Outcome::Refused(Refusal::HasDescendants {
                    entity,
                    count: self.store.list_accounts(period_id, None)?.len() as u64,
                }));
            }
            Err(e) => return Err(e.into()),
        };
        self.resolver.clear();

        info!(%period_id, title = %period.title, accounts = removed, "Period deleted");
        Ok(Outcome::Applied(removed))
    }

    // ========== Reads ==========

    /// Fetches a period.
    pub fn period(&self, period_id: PeriodId) -> Result<Period, LedgerError> {
        self.store
            .period(period_id)?
            .ok_or(LedgerError::PeriodNotFound(period_id))
    }

    /// Fetches an account.
    pub fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .account(account_id)?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Fetches a record.
    pub fn record(&self, record_id: RecordId) -> Result<Record, LedgerError> {
        self.store
            .record(record_id)?
            .ok_or(LedgerError::RecordNotFound(record_id))
    }

    /// Lists a period's accounts.
    pub fn accounts(&self, period_id: PeriodId) -> Result<Vec<Account>, LedgerError> {
        Ok(self.store.list_accounts(period_id, None)?)
    }

    /// Lists records matching a filter.
    pub fn records(&self, filter: &RecordFilter) -> Result<Vec<Record>, LedgerError> {
        Ok(self.store.list_records(filter)?)
    }

    /// Summarizes a period from its stored totals.
    pub fn period_summary(&self, period_id: PeriodId) -> Result<PeriodSummary, LedgerError> {
        let period = self.period(period_id)?;
        Ok(PeriodSummary {
            id: period.id,
            closable: period.is_open() && period.unapproved() == 0,
            title: period.title,
            status: period.status,
            closed_at: period.closed_at,
            account_count: period.totals.account_count,
            records: period.totals.records,
            to_balance: period.totals.to_balance,
        })
    }

    /// Summarizes an account from its stored counters.
    pub fn account_summary(&self, account_id: AccountId) -> Result<AccountSummary, LedgerError> {
        let account = self.account(account_id)?;
        Ok(AccountSummary {
            id: account.id,
            period_id: account.period_id,
            closable: account.is_open() && account.counters.record_count_unapproved == 0,
            ledger_code: account.ledger_code,
            title: account.title,
            account_type: account.account_type,
            status: account.status,
            records: account.counters,
        })
    }

    // ========== Repair ==========

    /// Recounts a period and its accounts from their records.
    pub fn recount_period(&self, period_id: PeriodId) -> Result<RecountReport, LedgerError> {
        self.aggregates().recount_period(period_id)
    }

    /// Recounts every period. Run after bulk imports.
    pub fn recount_all(&self) -> Result<FullRecount, LedgerError> {
        self.aggregates().recount_all()
    }

    /// Lists stored aggregates of a period that disagree with its records.
    pub fn audit_period(&self, period_id: PeriodId) -> Result<Vec<Drift>, LedgerError> {
        self.aggregates().audit_period(period_id)
    }
}

impl<S: ?Sized> std::fmt::Debug for LedgerService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("resolver", &self.resolver)
            .field("count_source", &self.count_source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{Role, RolePolicy};
    use crate::model::{AccountType, NewRecord};
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn service() -> LedgerService<MemoryStore> {
        LedgerService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_account_bumps_account_count() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();

        ledger
            .create_account(actor, NewAccount::new(period.id, "102", AccountType::Asset))
            .unwrap()
            .applied()
            .unwrap();
        ledger
            .create_account(actor, NewAccount::new(period.id, "8000", AccountType::Result))
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(ledger.period(period.id).unwrap().totals.account_count, 2);
        assert!(ledger.audit_period(period.id).unwrap().is_empty());
    }

    #[test]
    fn test_ledger_code_unique_per_period() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();
        let other = ledger.create_period(actor, "FY2027").unwrap().applied().unwrap();

        let new = NewAccount::new(period.id, "102", AccountType::Asset);
        assert!(ledger.create_account(actor, new.clone()).unwrap().is_applied());
        assert!(matches!(
            ledger.create_account(actor, new),
            Err(LedgerError::DuplicateLedgerCode { .. })
        ));
        assert!(
            ledger
                .create_account(actor, NewAccount::new(other.id, "102", AccountType::Asset))
                .unwrap()
                .is_applied()
        );
    }

    #[test]
    fn test_account_refused_under_closed_period() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();
        assert!(ledger.close_period(actor, period.id).unwrap().is_applied());

        let outcome = ledger
            .create_account(actor, NewAccount::new(period.id, "102", AccountType::Asset))
            .unwrap();
        assert_eq!(
            outcome.refusal(),
            Some(&Refusal::ParentClosed(EntityRef::Period(period.id)))
        );
    }

    #[test]
    fn test_delete_account_refused_while_it_has_records() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();
        let account = ledger
            .create_account(actor, NewAccount::new(period.id, "102", AccountType::Asset))
            .unwrap()
            .applied()
            .unwrap();
        let record = ledger
            .create_record(actor, NewRecord::debit(account.id, dec!(10)))
            .unwrap()
            .applied()
            .unwrap();

        assert!(matches!(
            ledger.delete_account(actor, account.id).unwrap().refusal(),
            Some(Refusal::HasDescendants { count: 1, .. })
        ));

        assert!(ledger.delete_record(actor, record.id).unwrap().is_applied());
        assert!(ledger.delete_account(actor, account.id).unwrap().is_applied());
        let period = ledger.period(period.id).unwrap();
        assert_eq!(period.totals.account_count, 0);
        assert_eq!(period.totals.records, RecordCounters::default());
    }

    #[test]
    fn test_delete_period_requires_cascade() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();
        let account = ledger
            .create_account(actor, NewAccount::new(period.id, "102", AccountType::Asset))
            .unwrap()
            .applied()
            .unwrap();
        ledger
            .create_record(actor, NewRecord::credit(account.id, dec!(1)))
            .unwrap()
            .applied()
            .unwrap();

        assert!(matches!(
            ledger.delete_period(actor, period.id, false).unwrap().refusal(),
            Some(Refusal::HasDescendants { count: 1, .. })
        ));
        assert_eq!(
            ledger.delete_period(actor, period.id, true).unwrap().applied(),
            Some(1)
        );
        assert!(matches!(
            ledger.account(account.id),
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_viewer_cannot_create() {
        let viewer = ActorId::new();
        let ledger =
            service().with_authorizer(Arc::new(RolePolicy::new().grant(viewer, Role::Viewer)));

        let outcome = ledger.create_period(viewer, "FY2026").unwrap();
        assert!(matches!(
            outcome.refusal(),
            Some(Refusal::Forbidden { actor, .. }) if *actor == viewer
        ));
        assert!(ledger.store().list_periods(None).unwrap().is_empty());
    }

    #[test]
    fn test_summaries_reflect_counters() {
        let ledger = service();
        let actor = ActorId::new();
        let period = ledger.create_period(actor, "FY2026").unwrap().applied().unwrap();
        let account = ledger
            .create_account(actor, NewAccount::new(period.id, "8000", AccountType::Result))
            .unwrap()
            .applied()
            .unwrap();
        ledger
            .create_record(actor, NewRecord::credit(account.id, dec!(50)))
            .unwrap()
            .applied()
            .unwrap();

        let summary = ledger.period_summary(period.id).unwrap();
        assert_eq!(summary.records.record_count_unapproved, 1);
        assert_eq!(summary.to_balance, dec!(50));
        assert!(!summary.closable);

        let account = ledger.account_summary(account.id).unwrap();
        assert_eq!(account.records.record_count, 1);
        assert!(!account.closable);
    }
}
