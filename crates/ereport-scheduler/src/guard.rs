use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

/// Whether a report run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { started_at: DateTime<Utc> },
}

/// Single-flight guard for report runs.
///
/// At most one [`TickPermit`] exists at a time; overlapping ticks get `None`
/// from [`TickGuard::try_begin`] and skip their run.
#[derive(Debug, Clone)]
pub struct TickGuard {
    state: Arc<Mutex<RunState>>,
}

impl Default for TickGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl TickGuard {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn state(&self) -> RunState {
        *self.lock()
    }

    /// Claim the run. Returns `None` while another permit is alive.
    pub fn try_begin(&self, started_at: DateTime<Utc>) -> Option<TickPermit> {
        let mut state = self.lock();
        match *state {
            RunState::Running { .. } => None,
            RunState::Idle => {
                *state = RunState::Running { started_at };
                Some(TickPermit {
                    state: Arc::clone(&self.state),
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of an in-progress run. Dropping it returns the guard to idle, also
/// when the run bails out early.
#[derive(Debug)]
pub struct TickPermit {
    state: Arc<Mutex<RunState>>,
}

impl Drop for TickPermit {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RunState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_permit_at_a_time() {
        let guard = TickGuard::new();
        let started = Utc::now();
        let permit = guard.try_begin(started).unwrap();
        assert_eq!(guard.state(), RunState::Running { started_at: started });
        assert!(guard.try_begin(Utc::now()).is_none());
        assert!(guard.clone().try_begin(Utc::now()).is_none());

        drop(permit);
        assert_eq!(guard.state(), RunState::Idle);
        assert!(guard.try_begin(Utc::now()).is_some());
    }
}
