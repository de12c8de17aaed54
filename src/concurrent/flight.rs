//! In-flight computations shared between a leader and its waiters.

use parking_lot::{Condvar, Mutex};

/// How a flight ended, as seen by a waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Landing<V> {
    /// The leader produced a value and stored it.
    Ready(V),
    /// The leader's function failed; the error stays with the leader.
    Failed,
    /// The leader unwound without finishing.
    Abandoned,
}

/// One computation of one key. Created by the leader, waited on by everyone
/// else who asks for that key while it runs.
pub(crate) struct Flight<V> {
    state: Mutex<Option<Landing<V>>>,
    landed: Condvar,
}

impl<V> Flight<V> {
    pub(crate) fn new() -> Self {
        Flight {
            state: Mutex::new(None),
            landed: Condvar::new(),
        }
    }

    /// Publishes the outcome and wakes every waiter. Only the first landing counts.
    pub(crate) fn land(&self, landing: Landing<V>) {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = Some(landing);
            self.landed.notify_all();
        }
    }

    /// Blocks until the flight lands.
    pub(crate) fn wait(&self) -> Landing<V>
    where
        V: Clone,
    {
        let mut state = self.state.lock();
        loop {
            if let Some(landing) = state.as_ref() {
                return landing.clone();
            }
            self.landed.wait(&mut state);
        }
    }
}
