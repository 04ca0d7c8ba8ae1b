/*
 *   Copyright (c) 2026 Async RwLock Contributors
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! The deferred completion: a one-shot, multi-producer / single-consumer
//! signal a waiter awaits and the monitor (or a timeout/cancellation race)
//! completes exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::deadline::Deadline;

const PENDING: u8 = 0;
const SUCCESS: u8 = 1;
const TIMED_OUT: u8 = 2;
const CANCELLED: u8 = 3;
const FAULTED: u8 = 4;

/// The terminal (or pending) state of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Pending,
    Success,
    TimedOut,
    Cancelled,
    Faulted,
}

impl Outcome {
    fn to_raw(self) -> u8 {
        match self {
            Outcome::Pending => PENDING,
            Outcome::Success => SUCCESS,
            Outcome::TimedOut => TIMED_OUT,
            Outcome::Cancelled => CANCELLED,
            Outcome::Faulted => FAULTED,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            SUCCESS => Outcome::Success,
            TIMED_OUT => Outcome::TimedOut,
            CANCELLED => Outcome::Cancelled,
            FAULTED => Outcome::Faulted,
            _ => Outcome::Pending,
        }
    }
}

/// What woke up [`Signal::wait`].
pub(crate) enum WaitEvent {
    /// The signal was completed by someone else (the monitor granting the
    /// wait node, or disposal faulting it).
    Notified,
    /// The caller-supplied deadline elapsed first.
    TimedOut,
    /// The caller-supplied cancellation token tripped first.
    Cancelled,
}

#[derive(Debug)]
struct SignalInner {
    outcome: AtomicU8,
    notify: Notify,
}

/// A one-shot deferred completion carrying a boolean grant/no-grant outcome.
///
/// Cloning a `Signal` shares the same underlying cell: every clone observes
/// the same terminal state once one is reached. `complete_*` transitions are
/// idempotent-after-terminal -- once the outcome leaves [`Outcome::Pending`]
/// every subsequent `complete_*` call is a harmless no-op, which is exactly
/// what lets the release path and a racing timeout both attempt completion
/// without coordination beyond the CAS itself.
#[derive(Debug, Clone)]
pub(crate) struct Signal {
    inner: Arc<SignalInner>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                outcome: AtomicU8::new(PENDING),
                notify: Notify::new(),
            }),
        }
    }

    /// A signal that is already resolved successfully -- the fast path for an
    /// acquire that was granted without ever touching the wait queue.
    pub(crate) fn pre_completed() -> Self {
        let signal = Self::new();
        signal.try_complete(Outcome::Success);
        signal
    }

    /// Attempt the `Pending -> outcome` transition. Returns whether this call
    /// won the race (i.e. actually performed the transition).
    pub(crate) fn try_complete(&self, outcome: Outcome) -> bool {
        let won = self
            .inner
            .outcome
            .compare_exchange(PENDING, outcome.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            // Notify after the transition so a waiter that wakes always
            // observes a terminal outcome, never a spurious pending read.
            self.inner.notify.notify_one();
        }
        won
    }

    pub(crate) fn complete_success(&self) -> bool { self.try_complete(Outcome::Success) }

    pub(crate) fn complete_fault(&self) -> bool { self.try_complete(Outcome::Faulted) }

    pub(crate) fn outcome(&self) -> Outcome { Outcome::from_raw(self.inner.outcome.load(Ordering::Acquire)) }

    pub(crate) fn is_terminal(&self) -> bool { self.outcome() != Outcome::Pending }

    /// Race the signal's own completion against an optional deadline and an
    /// optional cancellation token. Exactly one of the three resolution paths
    /// wins; the caller (the lock's acquire orchestrator) is responsible for
    /// re-checking [`Self::outcome`] afterwards to resolve the case where the
    /// grant and the timeout/cancellation raced each other for the monitor.
    pub(crate) async fn wait(&self, deadline: Deadline, cancel: Option<&CancellationToken>) -> WaitEvent {
        tokio::select! {
            () = self.inner.notify.notified() => WaitEvent::Notified,
            () = sleep_until_deadline(deadline) => WaitEvent::TimedOut,
            () = cancelled_or_pending(cancel) => WaitEvent::Cancelled,
        }
    }
}

async fn sleep_until_deadline(deadline: Deadline) {
    match deadline {
        Deadline::Infinite => std::future::pending().await,
        Deadline::After(duration) => tokio::time::sleep(duration).await,
    }
}

async fn cancelled_or_pending(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_signal_is_pending() {
        let signal = Signal::new();
        assert_eq!(signal.outcome(), Outcome::Pending);
        assert!(!signal.is_terminal());
    }

    #[test]
    fn pre_completed_is_success() {
        let signal = Signal::pre_completed();
        assert_eq!(signal.outcome(), Outcome::Success);
    }

    #[test]
    fn complete_is_idempotent_after_terminal() {
        let signal = Signal::new();
        assert!(signal.try_complete(Outcome::Success));
        // The release path may race a timeout; the loser must see `false`
        // and the outcome must not be clobbered.
        assert!(!signal.try_complete(Outcome::TimedOut));
        assert_eq!(signal.outcome(), Outcome::Success);
    }

    #[test]
    fn clones_observe_the_same_terminal_state() {
        let signal = Signal::new();
        let clone = signal.clone();
        assert!(clone.complete_fault());
        assert_eq!(signal.outcome(), Outcome::Faulted);
    }

    #[tokio::test]
    async fn wait_resolves_immediately_once_already_terminal() {
        let signal = Signal::pre_completed();
        let event = signal.wait(Deadline::Infinite, None).await;
        assert!(matches!(event, WaitEvent::Notified));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_on_a_contended_zero_deadline() {
        let signal = Signal::new();
        let event = signal.wait(Deadline::After(std::time::Duration::ZERO), None).await;
        assert!(matches!(event, WaitEvent::TimedOut));
        // The timeout firing does not itself settle the signal -- that is
        // the lock orchestrator's job (it must still win the monitor race).
        assert_eq!(signal.outcome(), Outcome::Pending);
    }

    #[tokio::test]
    async fn wait_observes_cancellation() {
        let signal = Signal::new();
        let token = CancellationToken::new();
        token.cancel();
        let event = signal.wait(Deadline::Infinite, Some(&token)).await;
        assert!(matches!(event, WaitEvent::Cancelled));
    }
}
