//! Record Lifecycle Engine.
//!
//! Each operation follows the same order: resolve lineage, authorize, read,
//! validate, write the record, then bump the account and the period. Status
//! writes are compare-and-set on the record version.

use chrono::Utc;
use kassa_shared::types::{AccountId, ActorId, RecordId};
use tracing::{debug, info, warn};

use crate::aggregate::CounterDelta;
use crate::authz::{Action, RecordAction};
use crate::error::LedgerError;
use crate::hierarchy::Lineage;
use crate::lifecycle::machine::{RecordLifecycle, RecordTransition};
use crate::model::{EntityRef, Movement, NewRecord, Record, RecordEdit, RecordStatus};
use crate::outcome::{Outcome, Refusal};
use crate::service::LedgerService;
use crate::store::{EntityStore, StoreError};

impl<S> LedgerService<S>
where
    S: EntityStore + ?Sized,
{
    /// Creates a published record.
    ///
    /// Exactly one of debit or credit must be given. The period is resolved
    /// from the account when not supplied.
    pub fn create_record(
        &self,
        actor: ActorId,
        new: NewRecord,
    ) -> Result<Outcome<Record>, LedgerError> {
        let movement = Movement::from_sides(new.debit, new.credit)?;
        let lineage = self
            .resolver
            .lineage_for_new(&*self.store, new.account_id, new.period_id)?;
        if let Some(refusal) = self.authorize(
            actor,
            Action::Record(RecordAction::Create),
            EntityRef::Account(lineage.account_id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }

        let account = self.account(lineage.account_id)?;
        if let Some(closed) = self.closed_parent(lineage)? {
            return Ok(Outcome::Refused(Refusal::ParentClosed(closed)));
        }
        if let Some(offset) = new.offset_account {
            self.ensure_account(offset)?;
        }

        let record = Record {
            id: RecordId::new(),
            account_id: lineage.account_id,
            period_id: lineage.period_id,
            offset_account: new.offset_account,
            value: movement.value(),
            value_type: movement.value_type(),
            status: RecordStatus::Published,
            memo: new.memo,
            version: 1,
            created_at: Utc::now(),
        };
        let delta = CounterDelta::for_insert(
            record.status,
            CounterDelta::balance_of(account.account_type, &movement),
        );

        self.store.insert_record(record.clone())?;
        self.resolver.remember_record(record.id, lineage);
        self.aggregates().apply(lineage, &delta)?;

        // A parent may have closed between the check and the bump.
        if let Some(closed) = self.closed_parent(lineage)? {
            warn!(
                record_id = %record.id,
                %closed,
                "Parent closed during record creation, rolling back"
            );
            self.store.delete_record(record.id)?;
            self.resolver.forget_record(record.id);
            self.aggregates().apply(lineage, &delta.negated())?;
            return Ok(Outcome::Refused(Refusal::ParentClosed(closed)));
        }

        info!(
            record_id = %record.id,
            account_id = %record.account_id,
            period_id = %record.period_id,
            value = %record.value,
            value_type = ?record.value_type,
            "Record created"
        );
        Ok(Outcome::Applied(record))
    }

    /// Declines a published or approved record.
    pub fn decline_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
    ) -> Result<Outcome<Record>, LedgerError> {
        self.transition_record(actor, record_id, RecordTransition::Decline)
    }

    /// Approves a published or declined record.
    pub fn approve_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
    ) -> Result<Outcome<Record>, LedgerError> {
        self.transition_record(actor, record_id, RecordTransition::Approve)
    }

    /// Closes an approved record. Closed records never change again.
    pub fn close_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
    ) -> Result<Outcome<Record>, LedgerError> {
        self.transition_record(actor, record_id, RecordTransition::Close)
    }

    fn transition_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
        transition: RecordTransition,
    ) -> Result<Outcome<Record>, LedgerError> {
        let lineage = self.resolver.resolve_record(&*self.store, record_id)?;
        if let Some(refusal) = self.authorize(
            actor,
            Action::Record(transition.action()),
            EntityRef::Record(record_id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }

        let record = self.record(record_id)?;
        let target = match RecordLifecycle::apply(record.status, transition) {
            Ok(target) => target,
            Err(e) => {
                debug!(%record_id, ?transition, error = %e, "Transition refused");
                return Ok(Outcome::Refused(e.into_refusal(record_id)));
            }
        };

        let delta = CounterDelta::for_status_change(record.status, target);
        let raises_unapproved = delta.record_count_unapproved > 0;
        if raises_unapproved && let Some(closed) = self.closed_parent(lineage)? {
            return Ok(Outcome::Refused(Refusal::ParentClosed(closed)));
        }

        let updated = match self
            .store
            .update_record_status(record_id, record.version, target)
        {
            Ok(updated) => updated,
            Err(StoreError::VersionConflict { .. }) => {
                warn!(%record_id, ?transition, "Concurrent record update, transition refused");
                return Ok(Outcome::Refused(Refusal::Conflict(record_id)));
            }
            Err(e) => return Err(e.into()),
        };
        self.aggregates().apply(lineage, &delta)?;

        if raises_unapproved && let Some(closed) = self.closed_parent(lineage)? {
            return self.revert_transition(&updated, record.status, lineage, &delta, closed);
        }

        info!(
            %record_id,
            from = %record.status,
            to = %updated.status,
            "Record status changed"
        );
        Ok(Outcome::Applied(updated))
    }

    /// Undoes a status write that raced with a parent close.
    fn revert_transition(
        &self,
        updated: &Record,
        previous: RecordStatus,
        lineage: Lineage,
        delta: &CounterDelta,
        closed: EntityRef,
    ) -> Result<Outcome<Record>, LedgerError> {
        warn!(record_id = %updated.id, %closed, "Parent closed during transition, rolling back");
        match self
            .store
            .update_record_status(updated.id, updated.version, previous)
        {
            Ok(_) => {
                self.aggregates().apply(lineage, &delta.negated())?;
                Ok(Outcome::Refused(Refusal::ParentClosed(closed)))
            }
            Err(StoreError::VersionConflict { .. }) => {
                warn!(
                    record_id = %updated.id,
                    "Rollback lost to a concurrent update, recount advised"
                );
                Ok(Outcome::Refused(Refusal::Conflict(updated.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Edits a record's memo and offset account.
    ///
    /// `value` and `value_type` are write-once: when the edit carries them
    /// they are ignored and the stored movement is kept.
    pub fn update_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
        edit: RecordEdit,
    ) -> Result<Outcome<Record>, LedgerError> {
        let record = self.record(record_id)?;
        if let Some(refusal) = self.authorize(
            actor,
            Action::Record(RecordAction::Edit),
            EntityRef::Record(record_id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }
        if !record.status.is_editable() {
            return Ok(Outcome::Refused(Refusal::RecordClosed(record_id)));
        }

        if edit.value.is_some() || edit.value_type.is_some() {
            debug!(%record_id, "Ignoring change to write-once movement");
        }

        let memo = edit.memo.unwrap_or_else(|| record.memo.clone());
        let offset_account = edit.offset_account.unwrap_or(record.offset_account);
        if memo == record.memo && offset_account == record.offset_account {
            return Ok(Outcome::Applied(record));
        }
        if let Some(offset) = offset_account {
            self.ensure_account(offset)?;
        }

        match self
            .store
            .update_record_details(record_id, record.version, memo, offset_account)
        {
            Ok(updated) => {
                info!(%record_id, "Record updated");
                Ok(Outcome::Applied(updated))
            }
            Err(StoreError::VersionConflict { .. }) => {
                warn!(%record_id, "Concurrent record update, edit refused");
                Ok(Outcome::Refused(Refusal::Conflict(record_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a record that is not closed.
    pub fn delete_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
    ) -> Result<Outcome<Record>, LedgerError> {
        let lineage = self.resolver.resolve_record(&*self.store, record_id)?;
        if let Some(refusal) = self.authorize(
            actor,
            Action::Record(RecordAction::Delete),
            EntityRef::Record(record_id),
        ) {
            return Ok(Outcome::Refused(refusal));
        }

        let record = self.record(record_id)?;
        if !record.status.is_editable() {
            return Ok(Outcome::Refused(Refusal::RecordClosed(record_id)));
        }
        let account = self.account(lineage.account_id)?;

        let removed = self.store.delete_record(record_id)?;
        if !removed.status.is_editable() {
            // Closed between the read and the delete.
            self.store.insert_record(removed)?;
            return Ok(Outcome::Refused(Refusal::RecordClosed(record_id)));
        }
        self.resolver.forget_record(record_id);

        let delta = CounterDelta::for_removal(
            removed.status,
            CounterDelta::balance_of(account.account_type, &removed.movement()),
        );
        self.aggregates().apply(lineage, &delta)?;

        info!(
            %record_id,
            account_id = %removed.account_id,
            status = %removed.status,
            "Record deleted"
        );
        Ok(Outcome::Applied(removed))
    }

    /// Returns true if the actor may edit the record now.
    ///
    /// Closed records are never editable, whatever the actor's rights.
    pub fn can_edit_record(
        &self,
        actor: ActorId,
        record_id: RecordId,
    ) -> Result<bool, LedgerError> {
        let record = self.record(record_id)?;
        Ok(record.status.is_editable()
            && self.authorizer.permits(
                actor,
                Action::Record(RecordAction::Edit),
                EntityRef::Record(record_id),
            ))
    }

    /// The first closed ancestor of a lineage, account before period.
    fn closed_parent(&self, lineage: Lineage) -> Result<Option<EntityRef>, LedgerError> {
        if !self.account(lineage.account_id)?.is_open() {
            return Ok(Some(EntityRef::Account(lineage.account_id)));
        }
        if !self.period(lineage.period_id)?.is_open() {
            return Ok(Some(EntityRef::Period(lineage.period_id)));
        }
        Ok(None)
    }

    fn ensure_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        self.account(account_id).map(|_| ())
    }
}
