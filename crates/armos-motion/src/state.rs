//! [`StateCell`] – lock-free single source of truth for the operating state.
//!
//! The current state is written by the command worker and read concurrently
//! by the status reporter and the arbitrator's own duplicate guard.  It
//! lives in an `AtomicU8` (the held-object id in an `AtomicI64`):
//! transitions happen only on the command worker, readers take plain
//! atomic loads, and no thread ever observes a torn value.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use armos_types::OperatingState;

/// Sentinel stored in the held-object cell when nothing is held.
const NO_OBJECT: i64 = -1;

/// Atomically-updated operating state plus held-object id.
///
/// Single-writer by convention (the command worker); any thread may read.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
    held_object: AtomicI64,
}

/// Shared handle onto a [`StateCell`].
pub type StateHandle = Arc<StateCell>;

impl StateCell {
    /// A fresh cell: `Idle`, nothing held.
    pub fn new() -> StateHandle {
        Arc::new(Self {
            state: AtomicU8::new(OperatingState::Idle as u8),
            held_object: AtomicI64::new(NO_OBJECT),
        })
    }

    /// Current operating state.
    pub fn get(&self) -> OperatingState {
        // The cell only ever stores values written by `set`, so the
        // fallback is unreachable; Failed is the conservative choice.
        OperatingState::from_u8(self.state.load(Ordering::Acquire))
            .unwrap_or(OperatingState::Failed)
    }

    /// Transition to `state`.  Called only from the command worker.
    pub fn set(&self, state: OperatingState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Id of the currently held object, if any.
    pub fn held_object(&self) -> Option<i32> {
        match self.held_object.load(Ordering::Acquire) {
            NO_OBJECT => None,
            id => Some(id as i32),
        }
    }

    /// Record (or clear) the held object.
    pub fn set_held_object(&self, id: Option<i32>) {
        self.held_object
            .store(id.map(i64::from).unwrap_or(NO_OBJECT), Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(OperatingState::Idle as u8),
            held_object: AtomicI64::new(NO_OBJECT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cell_is_idle_with_nothing_held() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), OperatingState::Idle);
        assert_eq!(cell.held_object(), None);
    }

    #[test]
    fn set_and_get_round_trip_every_state() {
        let cell = StateCell::new();
        for v in 0..7u8 {
            let state = OperatingState::from_u8(v).unwrap();
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn held_object_set_and_clear() {
        let cell = StateCell::new();
        cell.set_held_object(Some(42));
        assert_eq!(cell.held_object(), Some(42));
        cell.set_held_object(None);
        assert_eq!(cell.held_object(), None);
    }

    #[test]
    fn readable_from_another_thread() {
        let cell = StateCell::new();
        cell.set(OperatingState::Pointing);
        let reader = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || cell.get())
        };
        assert_eq!(reader.join().unwrap(), OperatingState::Pointing);
    }
}
