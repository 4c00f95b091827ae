//! Pause gate and cancellation token shared between a transfer and its caller.
//!
//! These are the only pieces of a transfer that other threads may touch.
//! Cancellation is an atomic flag; the pause gate is a mutex-guarded bool
//! with a condition variable, so a paused worker sleeps instead of polling.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Two-state gate; `Closed` blocks the worker at its next suspension point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Open,
    Closed,
}

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    paused: Mutex<bool>,
    gate: Condvar,
}

/// Cloneable handle to the control surface of one transfer
#[derive(Debug, Clone, Default)]
pub struct TransferControl {
    shared: Arc<Shared>,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn paused(&self) -> MutexGuard<'_, bool> {
        self.shared
            .paused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cancellation. Idempotent.
    ///
    /// Also wakes a worker parked at the pause gate so it can observe the
    /// request without waiting for `resume`.
    pub fn request_cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.paused();
        self.shared.gate.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Close the gate
    pub fn pause(&self) {
        *self.paused() = true;
    }

    /// Open the gate and release any waiting worker
    pub fn resume(&self) {
        *self.paused() = false;
        self.shared.gate.notify_all();
    }

    /// Flip the gate, returning the new state
    pub fn toggle_pause(&self) -> GateState {
        let mut paused = self.paused();
        *paused = !*paused;
        if !*paused {
            self.shared.gate.notify_all();
        }
        if *paused { GateState::Closed } else { GateState::Open }
    }

    pub fn gate_state(&self) -> GateState {
        if *self.paused() {
            GateState::Closed
        } else {
            GateState::Open
        }
    }

    /// Block while the gate is closed and no cancellation was requested.
    ///
    /// Returns `true` if the caller actually had to wait.
    pub(crate) fn wait_at_gate(&self) -> bool {
        let guard = self.paused();
        if !*guard || self.is_cancelled() {
            return false;
        }
        let _guard = self
            .shared
            .gate
            .wait_while(guard, |paused| *paused && !self.is_cancelled())
            .unwrap_or_else(PoisonError::into_inner);
        true
    }
}
