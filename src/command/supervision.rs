// Bounded tracking: finish on reaching the target, on a deadline, or on
// request, and always leave the drive stopped

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use super::Command;
use crate::controller::Tolerance;
use crate::drive::HolonomicDrive;

/// A primitive that tracks a reference and can tell when it is there
pub trait Tracking {
    fn set_tolerance(&mut self, tolerance: Tolerance);

    fn at_reference(&self) -> bool;
}

/// How a supervised primitive ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reached,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Default)]
struct HandleState {
    cancel: AtomicBool,
    outcome: Mutex<Option<Outcome>>,
}

/// Shared view of a supervised primitive: request cancellation, read the
/// outcome once it has ended. A cancelled handle stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct SupervisionHandle {
    state: Arc<HandleState>,
}

impl SupervisionHandle {
    /// Asks the primitive to stop at its next tick
    pub fn cancel(&self) {
        self.state.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.state.cancel.load(Ordering::SeqCst)
    }

    /// `None` while the primitive is still running (or has not started)
    pub fn outcome(&self) -> Option<Outcome> {
        *self
            .state
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_outcome(&self, outcome: Option<Outcome>) {
        *self
            .state
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = outcome;
    }
}

/// Runs a tracking primitive until it is within `tolerance`, `timeout` has
/// elapsed since it started, or it is cancelled, whichever comes first.
///
/// The tolerance is applied before the first tick. Every exit, including
/// being superseded by another command, issues exactly one `stop()`.
pub struct Supervised<C> {
    inner: C,
    tolerance: Tolerance,
    timeout: Duration,
    deadline: Duration,
    handle: SupervisionHandle,
    finishing: Option<Outcome>,
    stopped: bool,
}

impl<C: Tracking> Supervised<C> {
    pub fn new(inner: C, tolerance: Tolerance, timeout: Duration) -> Self {
        Self {
            inner,
            tolerance,
            timeout,
            deadline: timeout,
            handle: SupervisionHandle::default(),
            finishing: None,
            stopped: false,
        }
    }

    /// Handle for cancelling this primitive and reading how it ended
    pub fn handle(&self) -> SupervisionHandle {
        self.handle.clone()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<D, C> Command<D> for Supervised<C>
where
    D: HolonomicDrive + ?Sized,
    C: Command<D> + Tracking,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn initialize(&mut self, drive: &mut D, now: Duration) {
        self.inner.set_tolerance(self.tolerance);
        self.inner.initialize(drive, now);
        self.deadline = now + self.timeout;
        self.finishing = None;
        self.stopped = false;
        self.handle.set_outcome(None);
    }

    fn execute(&mut self, drive: &mut D, now: Duration) {
        if self.finishing.is_some() {
            return;
        }
        // Cancellation wins over the tick: no further command once requested
        if self.handle.is_cancel_requested() {
            self.finishing = Some(Outcome::Cancelled);
            return;
        }
        self.inner.execute(drive, now);
    }

    fn is_finished(&mut self, _drive: &D, now: Duration) -> bool {
        if self.finishing.is_none() {
            self.finishing = if self.inner.at_reference() {
                Some(Outcome::Reached)
            } else if now >= self.deadline {
                Some(Outcome::TimedOut)
            } else if self.handle.is_cancel_requested() {
                Some(Outcome::Cancelled)
            } else {
                None
            };
        }
        self.finishing.is_some()
    }

    fn end(&mut self, drive: &mut D, interrupted: bool) {
        let outcome = match self.finishing {
            Some(outcome) if !interrupted => outcome,
            _ => Outcome::Cancelled,
        };

        self.inner.end(drive, interrupted);
        if !self.stopped {
            drive.stop();
            self.stopped = true;
        }

        match outcome {
            Outcome::Reached => info!("{} reached its target", self.inner.name()),
            Outcome::TimedOut => warn!(
                "{} timed out after {:.2}s",
                self.inner.name(),
                self.timeout.as_secs_f64()
            ),
            Outcome::Cancelled => info!("{} cancelled", self.inner.name()),
        }
        self.handle.set_outcome(Some(outcome));
    }
}
