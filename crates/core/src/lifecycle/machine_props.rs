//! Property-based tests for the record state machine.

use proptest::prelude::*;

use crate::aggregate::CounterDelta;
use crate::lifecycle::error::TransitionError;
use crate::lifecycle::machine::{RecordLifecycle, RecordTransition};
use crate::model::RecordStatus;

fn arb_status() -> impl Strategy<Value = RecordStatus> {
    prop_oneof![
        Just(RecordStatus::Published),
        Just(RecordStatus::Declined),
        Just(RecordStatus::Approved),
        Just(RecordStatus::Closed),
    ]
}

fn arb_transition() -> impl Strategy<Value = RecordTransition> {
    prop_oneof![
        Just(RecordTransition::Decline),
        Just(RecordTransition::Approve),
        Just(RecordTransition::Close),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An applied transition always lands on its target and is in the table.
    #[test]
    fn prop_applied_transitions_are_valid(from in arb_status(), transition in arb_transition()) {
        if let Ok(to) = RecordLifecycle::apply(from, transition) {
            prop_assert_eq!(to, transition.target());
            prop_assert_ne!(from, to);
            prop_assert!(RecordLifecycle::is_valid_transition(from, to));
        }
    }

    /// Applying the same transition twice: the second is refused as unchanged.
    #[test]
    fn prop_transitions_are_idempotent(from in arb_status(), transition in arb_transition()) {
        if let Ok(to) = RecordLifecycle::apply(from, transition) {
            prop_assert_eq!(
                RecordLifecycle::apply(to, transition),
                Err(TransitionError::AlreadyInState(to))
            );
        }
    }

    /// Closed records never leave Closed.
    #[test]
    fn prop_closed_is_terminal(transition in arb_transition()) {
        prop_assert!(RecordLifecycle::apply(RecordStatus::Closed, transition).is_err());
    }

    /// Only approved records can be closed.
    #[test]
    fn prop_close_requires_approved(from in arb_status()) {
        let closed = RecordLifecycle::close(from);
        prop_assert_eq!(closed.is_ok(), from == RecordStatus::Approved);
    }

    /// Status changes never move record_count or the balance.
    #[test]
    fn prop_transition_delta_keeps_totals(from in arb_status(), transition in arb_transition()) {
        if let Ok(to) = RecordLifecycle::apply(from, transition) {
            let delta = CounterDelta::for_status_change(from, to);
            prop_assert_eq!(delta.record_count, 0);
            prop_assert!(delta.to_balance.is_zero());
            prop_assert!(delta.record_count_unapproved.abs() <= 1);
            prop_assert!(delta.record_count_declined.abs() <= 1);
        }
    }
}
