//! Bookkeeping for values shown before the backend has confirmed them.
//!
//! A toggle writes its optimistic value into the entity immediately and
//! records a ticketed [`FieldState::Pending`] here. When the gateway answers,
//! only the most recent ticket for that target may settle the field, so a
//! slow response to an earlier click never overwrites a later one.

use chamoe_types::{ToggleCounts, ToggleKind};
use std::collections::HashMap;

pub type Ticket = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState<T> {
    Confirmed(T),
    Pending {
        optimistic: T,
        previous: T,
        ticket: Ticket,
    },
}

impl<T: Clone> FieldState<T> {
    /// The value the UI should display
    pub fn value(&self) -> &T {
        match self {
            FieldState::Confirmed(value) => value,
            FieldState::Pending { optimistic, .. } => optimistic,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FieldState::Pending { .. })
    }

    pub fn propose(&mut self, value: T, ticket: Ticket) {
        let previous = self.value().clone();
        *self = FieldState::Pending {
            optimistic: value,
            previous,
            ticket,
        };
    }

    /// Settle with the backend's value. Ignored unless `ticket` is the latest proposal.
    pub fn confirm(&mut self, ticket: Ticket, confirmed: T) -> bool {
        match self {
            FieldState::Pending { ticket: latest, .. } if *latest == ticket => {
                *self = FieldState::Confirmed(confirmed);
                true
            }
            _ => false,
        }
    }

    /// Revert to the value shown before `ticket` was proposed.
    /// Returns the restored value, or `None` if a later proposal superseded it.
    pub fn reject(&mut self, ticket: Ticket) -> Option<T> {
        match self {
            FieldState::Pending {
                ticket: latest,
                previous,
                ..
            } if *latest == ticket => {
                let previous = previous.clone();
                *self = FieldState::Confirmed(previous.clone());
                Some(previous)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToggleKey {
    pub kind: ToggleKind,
    pub target: String,
}

impl ToggleKey {
    pub fn new(kind: ToggleKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

/// Outcome of settling a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Write these counts back into the entity
    Apply(ToggleCounts),
    /// Superseded by a later toggle, or failure left as-is
    Keep,
}

/// Pending toggles of one controller, keyed by target
#[derive(Debug, Default)]
pub struct ToggleLedger {
    fields: HashMap<ToggleKey, FieldState<ToggleCounts>>,
    next_ticket: Ticket,
}

impl ToggleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an optimistic change from `previous` to `optimistic`.
    pub fn begin(&mut self, key: ToggleKey, previous: ToggleCounts, optimistic: ToggleCounts) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.fields
            .entry(key)
            .or_insert(FieldState::Confirmed(previous))
            .propose(optimistic, ticket);
        ticket
    }

    pub fn confirm(&mut self, key: &ToggleKey, ticket: Ticket, confirmed: ToggleCounts) -> Settlement {
        let settled = self
            .fields
            .get_mut(key)
            .map(|field| field.confirm(ticket, confirmed))
            .unwrap_or(false);
        if settled {
            self.fields.remove(key);
            Settlement::Apply(confirmed)
        } else {
            Settlement::Keep
        }
    }

    /// Settle a failed toggle. With `rollback` off the optimistic value stays.
    pub fn fail(&mut self, key: &ToggleKey, ticket: Ticket, rollback: bool) -> Settlement {
        let Some(field) = self.fields.get_mut(key) else {
            return Settlement::Keep;
        };
        let result = if rollback {
            field.reject(ticket).map(Settlement::Apply)
        } else {
            let current = *field.value();
            field.confirm(ticket, current).then_some(Settlement::Keep)
        };
        match result {
            Some(settlement) => {
                self.fields.remove(key);
                settlement
            }
            None => Settlement::Keep,
        }
    }

    pub fn is_pending(&self, key: &ToggleKey) -> bool {
        self.fields.get(key).map(|f| f.is_pending()).unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(active: bool, count: u32) -> ToggleCounts {
        ToggleCounts { active, count }
    }

    #[test]
    fn test_field_state_confirm_and_reject() {
        let mut field = FieldState::Confirmed(5);
        field.propose(6, 1);
        assert_eq!(*field.value(), 6);
        assert!(field.is_pending());
        assert!(!field.confirm(2, 9));
        assert!(field.confirm(1, 6));
        assert_eq!(field, FieldState::Confirmed(6));

        field.propose(7, 3);
        assert_eq!(field.reject(3), Some(6));
        assert_eq!(field, FieldState::Confirmed(6));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut ledger = ToggleLedger::new();
        let key = ToggleKey::new(ToggleKind::PostLike, "1");
        let first = ledger.begin(key.clone(), counts(false, 5), counts(true, 6));
        let second = ledger.begin(key.clone(), counts(true, 6), counts(false, 5));

        // First response arrives late; the second click wins
        assert_eq!(ledger.confirm(&key, first, counts(true, 6)), Settlement::Keep);
        assert!(ledger.is_pending(&key));
        assert_eq!(
            ledger.confirm(&key, second, counts(false, 5)),
            Settlement::Apply(counts(false, 5))
        );
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_failure_without_rollback_keeps_optimistic_value() {
        let mut ledger = ToggleLedger::new();
        let key = ToggleKey::new(ToggleKind::PostShare, "1");
        let ticket = ledger.begin(key.clone(), counts(false, 2), counts(true, 3));
        assert_eq!(ledger.fail(&key, ticket, false), Settlement::Keep);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_failure_with_rollback_restores_previous() {
        let mut ledger = ToggleLedger::new();
        let key = ToggleKey::new(ToggleKind::Follow, "user2");
        let ticket = ledger.begin(key.clone(), counts(false, 100), counts(true, 101));
        assert_eq!(
            ledger.fail(&key, ticket, true),
            Settlement::Apply(counts(false, 100))
        );
    }

    #[test]
    fn test_superseded_failure_does_not_roll_back() {
        let mut ledger = ToggleLedger::new();
        let key = ToggleKey::new(ToggleKind::CommentLike, "c1");
        let first = ledger.begin(key.clone(), counts(false, 0), counts(true, 1));
        let _second = ledger.begin(key.clone(), counts(true, 1), counts(false, 0));
        assert_eq!(ledger.fail(&key, first, true), Settlement::Keep);
        assert!(ledger.is_pending(&key));
    }
}
