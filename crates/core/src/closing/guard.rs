//! Closing Guard.
//!
//! An account or period closes only while no unapproved record remains
//! under it. After the status write the stored count is read again; a
//! record that slipped in meanwhile reverts the close. Reopening is
//! unguarded.

use chrono::Utc;
use kassa_shared::config::ClosingCountSource;
use kassa_shared::types::{AccountId, ActorId, PeriodId};
use tracing::{info, warn};

use crate::authz::{AccountAction, Action, PeriodAction};
use crate::error::LedgerError;
use crate::model::{Account, AccountStatus, EntityRef, Period, PeriodStatus};
use crate::outcome::{Outcome, Refusal};
use crate::service::LedgerService;
use crate::store::EntityStore;

impl<S> LedgerService<S>
where
    S: EntityStore + ?Sized,
{
    /// Unapproved records under an account, from the configured source.
    pub fn unapproved_in_account(&self, account_id: AccountId) -> Result<u64, LedgerError> {
        match self.count_source {
            ClosingCountSource::Stored => {
                Ok(self.account(account_id)?.counters.record_count_unapproved)
            }
            ClosingCountSource::Recount => Ok(self
                .aggregates()
                .recount_account(account_id)?
                .counters
                .record_count_unapproved),
        }
    }

    /// Unapproved records under every account of a period.
    pub fn unapproved_in_period(&self, period_id: PeriodId) -> Result<u64, LedgerError> {
        match self.count_source {
            ClosingCountSource::Stored => Ok(self.period(period_id)?.unapproved()),
            ClosingCountSource::Recount => Ok(self
                .aggregates()
                .recount_period(period_id)?
                .totals
                .records
                .record_count_unapproved),
        }
    }

    /// Closes an account with no unapproved records.
    ///
    /// The owning period may be in any status.
    pub fn close_account(
        &self,
        actor: ActorId,
        account_id: AccountId,
    ) -> Result<Outcome<Account>, LedgerError> {
        let entity = EntityRef::Account(account_id);
        let account = self.account(account_id)?;
        if let Some(refusal) = self.authorize(actor, Action::Account(AccountAction::Close), entity)
        {
            return Ok(Outcome::Refused(refusal));
        }
        if account.status == AccountStatus::Closed {
            return Ok(Outcome::Refused(Refusal::Unchanged(entity)));
        }

        let unapproved = self.unapproved_in_account(account_id)?;
        if unapproved > 0 {
            info!(%account_id, unapproved, "Account close blocked");
            return Ok(Outcome::Refused(Refusal::BlockedByUnapproved { entity, unapproved }));
        }

        let closed = self
            .store
            .update_account_status(account_id, AccountStatus::Closed)?;
        let recheck = self.account(account_id)?.counters.record_count_unapproved;
        if recheck > 0 {
            warn!(
                %account_id,
                unapproved = recheck,
                "Record added during account close, reopening"
            );
            self.store
                .update_account_status(account_id, AccountStatus::Open)?;
            return Ok(Outcome::Refused(Refusal::BlockedByUnapproved {
                entity,
                unapproved: recheck,
            }));
        }

        info!(%account_id, period_id = %closed.period_id, "Account closed");
        Ok(Outcome::Applied(closed))
    }

    /// Closes a period with no unapproved records under any of its accounts.
    ///
    /// Accounts keep their own status.
    pub fn close_period(
        &self,
        actor: ActorId,
        period_id: PeriodId,
    ) -> Result<Outcome<Period>, LedgerError> {
        let entity = EntityRef::Period(period_id);
        let period = self.period(period_id)?;
        if let Some(refusal) = self.authorize(actor, Action::Period(PeriodAction::Close), entity) {
            return Ok(Outcome::Refused(refusal));
        }
        if period.status == PeriodStatus::Closed {
            return Ok(Outcome::Refused(Refusal::Unchanged(entity)));
        }

        let unapproved = self.unapproved_in_period(period_id)?;
        if unapproved > 0 {
            info!(%period_id, unapproved, "Period close blocked");
            return Ok(Outcome::Refused(Refusal::BlockedByUnapproved { entity, unapproved }));
        }

        let closed = self.store.update_period_status(
            period_id,
            PeriodStatus::Closed,
            Some(Utc::now()),
            Some(period.status),
        )?;
        let recheck = self.period(period_id)?.unapproved();
        if recheck > 0 {
            warn!(%period_id, unapproved = recheck, "Record added during period close, reopening");
            self.store.update_period_status(
                period_id,
                period.status,
                period.closed_at,
                period.status_before_close,
            )?;
            return Ok(Outcome::Refused(Refusal::BlockedByUnapproved {
                entity,
                unapproved: recheck,
            }));
        }

        info!(
            %period_id,
            title = %closed.title,
            to_balance = %closed.totals.to_balance,
            "Period closed"
        );
        Ok(Outcome::Applied(closed))
    }

    /// Reopens a closed period, restoring its status from before the close.
    pub fn reopen_period(
        &self,
        actor: ActorId,
        period_id: PeriodId,
    ) -> Result<Outcome<Period>, LedgerError> {
        let entity = EntityRef::Period(period_id);
        let period = self.period(period_id)?;
        if let Some(refusal) = self.authorize(actor, Action::Period(PeriodAction::Reopen), entity)
        {
            return Ok(Outcome::Refused(refusal));
        }
        if period.status != PeriodStatus::Closed {
            return Ok(Outcome::Refused(Refusal::Unchanged(entity)));
        }

        let restored = period.status_before_close.unwrap_or(PeriodStatus::Open);
        let reopened = self.store.update_period_status(
            period_id,
            restored,
            None,
            period.status_before_close,
        )?;
        info!(%period_id, status = ?reopened.status, "Period reopened");
        Ok(Outcome::Applied(reopened))
    }

    /// Reopens a closed account.
    pub fn reopen_account(
        &self,
        actor: ActorId,
        account_id: AccountId,
    ) -> Result<Outcome<Account>, LedgerError> {
        let entity = EntityRef::Account(account_id);
        let account = self.account(account_id)?;
        if let Some(refusal) =
            self.authorize(actor, Action::Account(AccountAction::Reopen), entity)
        {
            return Ok(Outcome::Refused(refusal));
        }
        if account.status != AccountStatus::Closed {
            return Ok(Outcome::Refused(Refusal::Unchanged(entity)));
        }

        let reopened = self
            .store
            .update_account_status(account_id, AccountStatus::Open)?;
        info!(%account_id, "Account reopened");
        Ok(Outcome::Applied(reopened))
    }
}
