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

//! The acquire/release orchestrator: the glue between the grant predicates
//! ([`crate::state`]), the wait queue ([`crate::queue`]), and the deferred
//! completion ([`crate::signal`]).

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::deadline::Deadline;
use crate::error::LockError;
use crate::queue::{WaitKind, WaitQueue};
use crate::signal::{Outcome, Signal, WaitEvent};
use crate::state::LockState;

#[cfg(feature = "tracing")]
macro_rules! trace_state {
    ($msg:expr, $state:expr) => {
        tracing::trace!(
            readers = $state.readers,
            writer_held = $state.writer_held,
            upgraded = $state.upgraded,
            $msg
        );
    };
    ($msg:expr, $state:expr, $kind:expr) => {
        tracing::trace!(
            readers = $state.readers,
            writer_held = $state.writer_held,
            upgraded = $state.upgraded,
            kind = ?$kind,
            $msg
        );
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_state {
    ($msg:expr, $state:expr) => {
        let _ = &$state;
    };
    ($msg:expr, $state:expr, $kind:expr) => {
        let _ = (&$state, &$kind);
    };
}

#[derive(Debug, Default)]
struct Inner {
    state: LockState,
    queue: WaitQueue,
    disposed: bool,
}

/// An asynchronous reader/writer lock with an upgradeable read mode.
///
/// Acquisition never parks an OS thread: `acquire_*` methods are `async fn`s
/// that either resolve immediately (the lock was idle and the predicate
/// held) or suspend until the monitor grants the queued waiter, a deadline
/// elapses, or cancellation trips. Release (`release_*`) is synchronous and
/// non-blocking; it never `.await`s.
///
/// Recursive acquisition is not supported -- a task that already holds any
/// mode and acquires again on the same instance will deadlock against
/// itself, the same way a blocking `RwLock` would. The lock does not track
/// which caller holds which grant; releasing a mode you did not acquire is a
/// caller bug that surfaces as [`LockError::NotHeld`] (or, worse, as a
/// release of someone else's grant if the precondition happens to hold --
/// callers are expected not to do this, matching the spec's threat model).
///
/// See [`crate::guard`] for an RAII-guard layer built on top of this manual
/// acquire/release surface.
#[derive(Debug, Default)]
pub struct AsyncRwLock {
    inner: Mutex<Inner>,
}

impl AsyncRwLock {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Acquire a shared read grant. Grantable whenever no writer is held,
    /// subject to the fairness rule: an arriving reader queues behind any
    /// already-queued writer rather than jumping ahead of it.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock has been disposed, or
    /// [`LockError::Cancelled`] if `cancel` tripped before a grant arrived.
    pub async fn acquire_read(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<bool, LockError> {
        self.acquire(WaitKind::ReadShared, deadline, cancel).await
    }

    /// Acquire an exclusive write grant. Grantable when no writer is held and
    /// either no readers are held, or exactly one reader is held and it is
    /// the upgradeable reader (the in-place upgrade case).
    ///
    /// # Errors
    ///
    /// See [`Self::acquire_read`].
    pub async fn acquire_write(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<bool, LockError> {
        self.acquire(WaitKind::Write, deadline, cancel).await
    }

    /// Acquire an upgradeable read grant: a read grant that reserves the
    /// exclusive right to later acquire the write mode in place, without
    /// releasing first. At most one upgradeable reader is held at a time.
    ///
    /// # Errors
    ///
    /// See [`Self::acquire_read`].
    pub async fn acquire_upgradeable_read(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<bool, LockError> {
        self.acquire(WaitKind::ReadUpgradeable, deadline, cancel).await
    }

    async fn acquire(
        &self,
        kind: WaitKind,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<bool, LockError> {
        let (signal, key) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.disposed {
                return Err(LockError::Disposed);
            }
            if inner.queue.is_empty() && inner.state.grant_predicate(kind) {
                inner.state.apply_grant(kind);
                trace_state!("acquire: granted immediately", &inner.state, kind);
                // Pre-completed: no scheduling needed, return without ever
                // calling `Signal::wait`.
                return Ok(true);
            }
            let signal = Signal::new();
            let key = inner.queue.append(kind, signal.clone());
            trace_state!("acquire: enqueued waiter", &inner.state, kind);
            (signal, key)
        };

        match signal.wait(deadline, cancel.as_ref()).await {
            WaitEvent::Notified => self.resolve_notified(&signal),
            WaitEvent::TimedOut => {
                if self.unlink_if_pending(key, &signal, Outcome::TimedOut) {
                    Ok(false)
                } else {
                    self.resolve_notified(&signal)
                }
            }
            WaitEvent::Cancelled => {
                if self.unlink_if_pending(key, &signal, Outcome::Cancelled) {
                    Err(LockError::Cancelled)
                } else {
                    self.resolve_notified(&signal)
                }
            }
        }
    }

    /// Map a signal whose outcome was just settled by someone else (a grant
    /// or a disposal) into the acquire-method return type.
    fn resolve_notified(&self, signal: &Signal) -> Result<bool, LockError> {
        match signal.outcome() {
            Outcome::Success => Ok(true),
            Outcome::Faulted => Err(LockError::Disposed),
            Outcome::Pending | Outcome::TimedOut | Outcome::Cancelled => {
                debug_assert!(
                    false,
                    "a signal observed as settled-by-someone-else must be Success or Faulted"
                );
                Err(LockError::Disposed)
            }
        }
    }

    /// Settle `key`'s signal to `outcome` and unlink it from the queue, but
    /// only if it is still pending -- i.e. only if the grant path hasn't
    /// already raced us to it. The node-present-in-queue-iff-signal-pending
    /// invariant (maintained by every grant/drain/dispose path completing a
    /// node's signal in the same monitor hold that unlinks it) is what makes
    /// this race-free without touching the queue at all when we lose.
    fn unlink_if_pending(&self, key: usize, signal: &Signal, outcome: Outcome) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !signal.try_complete(outcome) {
            return false;
        }
        inner.queue.unlink(key);
        true
    }

    /// Release a shared read grant.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock has been disposed, or
    /// [`LockError::NotHeld`] if the caller does not currently hold a plain
    /// read grant (in particular: this does *not* release an upgradeable
    /// read -- use [`Self::release_upgradeable`] for that).
    pub fn release_read(&self) -> Result<(), LockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return Err(LockError::Disposed);
        }
        let st = inner.state;
        if st.writer_held || st.readers == 0 || (st.readers == 1 && st.upgraded) {
            return Err(LockError::NotHeld);
        }
        inner.state.readers -= 1;
        if inner.state.readers == 0 {
            grant_queued_writer(&mut inner);
        }
        // No reader drain here: any queued reader at this point is
        // necessarily behind a queued writer (fairness), and that writer's
        // own predicate isn't satisfied while readers remain.
        trace_state!("release_read", &inner.state);
        Ok(())
    }

    /// Release an exclusive write grant.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock has been disposed, or
    /// [`LockError::NotHeld`] if no write grant is currently held.
    pub fn release_write(&self) -> Result<(), LockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return Err(LockError::Disposed);
        }
        if !inner.state.writer_held {
            return Err(LockError::NotHeld);
        }
        let head_is_writer = inner.queue.peek_head().is_some_and(|node| node.kind == WaitKind::Write);
        if head_is_writer {
            // Writer-to-writer handoff: `writer_held` stays true.
            let key = inner.queue.head_key().unwrap();
            let node = inner.queue.unlink(key);
            node.signal.complete_success();
        } else {
            inner.state.writer_held = false;
            drain_readers(&mut inner);
        }
        trace_state!("release_write", &inner.state);
        Ok(())
    }

    /// Release an upgradeable read grant.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock has been disposed, or
    /// [`LockError::NotHeld`] if no upgradeable read is currently held. A
    /// caller that upgraded in place (acquired write on top of an
    /// upgradeable read) must call [`Self::release_write`] first; this
    /// method's precondition requires `writer_held` to already be false.
    pub fn release_upgradeable(&self) -> Result<(), LockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return Err(LockError::Disposed);
        }
        let st = inner.state;
        if st.writer_held || !st.upgraded || st.readers == 0 {
            return Err(LockError::NotHeld);
        }
        inner.state.upgraded = false;
        inner.state.readers -= 1;
        if inner.state.readers == 0 {
            if !grant_queued_writer(&mut inner) {
                drain_readers(&mut inner);
            }
        } else {
            drain_readers(&mut inner);
        }
        trace_state!("release_upgradeable", &inner.state);
        Ok(())
    }

    #[must_use]
    pub fn current_read_count(&self) -> usize { self.inner.lock().unwrap().state.readers }

    #[must_use]
    pub fn is_read_held(&self) -> bool { self.inner.lock().unwrap().state.readers > 0 }

    #[must_use]
    pub fn is_write_held(&self) -> bool { self.inner.lock().unwrap().state.writer_held }

    #[must_use]
    pub fn is_upgradeable_read_held(&self) -> bool {
        let state = self.inner.lock().unwrap().state;
        state.upgraded && !state.writer_held
    }

    /// Dispose the lock: every pending waiter fails with
    /// [`LockError::Disposed`], and every subsequent acquire/release call on
    /// this instance also fails that way. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        while let Some(key) = inner.queue.head_key() {
            let node = inner.queue.unlink(key);
            node.signal.complete_fault();
        }
        trace_state!("dispose", &inner.state);
    }

    /// Convenience wrapper: turns a `false` (timed out) outcome into
    /// [`LockError::Timeout`], for callers that prefer an infallible-looking
    /// acquire that either yields a grant or an error.
    ///
    /// # Errors
    ///
    /// See [`Self::acquire_read`], plus [`LockError::Timeout`] in place of a
    /// bare `Ok(false)`.
    pub async fn acquire_read_or_timeout(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<(), LockError> {
        or_timeout(self.acquire_read(deadline, cancel).await)
    }

    /// See [`Self::acquire_read_or_timeout`].
    ///
    /// # Errors
    ///
    /// See [`Self::acquire_read_or_timeout`].
    pub async fn acquire_write_or_timeout(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<(), LockError> {
        or_timeout(self.acquire_write(deadline, cancel).await)
    }

    /// See [`Self::acquire_read_or_timeout`].
    ///
    /// # Errors
    ///
    /// See [`Self::acquire_read_or_timeout`].
    pub async fn acquire_upgradeable_read_or_timeout(
        &self,
        deadline: Deadline,
        cancel: Option<CancellationToken>,
    ) -> Result<(), LockError> {
        or_timeout(self.acquire_upgradeable_read(deadline, cancel).await)
    }
}

impl Drop for AsyncRwLock {
    /// A dropped lock never leaves awaiters parked forever: run the same
    /// terminal transition `dispose` does.
    fn drop(&mut self) { self.dispose(); }
}

fn or_timeout(result: Result<bool, LockError>) -> Result<(), LockError> {
    match result? {
        true => Ok(()),
        false => Err(LockError::Timeout),
    }
}

/// If `readers == 0` (checked by the caller beforehand) and the queue head is
/// a `Write` waiter, grant it directly and complete its signal before
/// returning -- completion happens here, still under the monitor, rather
/// than being deferred to after the `MutexGuard` drops: a waiter's node
/// leaving the slab and its signal leaving `Pending` must be the same atomic
/// step from an outside observer's perspective, or a concurrently-racing
/// timeout/cancellation on another thread could observe the node gone but
/// the signal still `Pending`, win its own CAS, and then unlink an
/// already-removed key. Returns whether a writer was granted.
fn grant_queued_writer(inner: &mut Inner) -> bool {
    let head_is_writer = inner.queue.peek_head().is_some_and(|node| node.kind == WaitKind::Write);
    if !head_is_writer {
        return false;
    }
    let key = inner.queue.head_key().unwrap();
    let node = inner.queue.unlink(key);
    inner.state.apply_grant(WaitKind::Write);
    node.signal.complete_success();
    true
}

/// Walk the queue from the head, granting every reader in the grantable
/// prefix, stopping at the first writer. An already-upgraded queue head in
/// `ReadUpgradeable` mode is *skipped* (left linked, cursor advances past it)
/// rather than unlinked, preserving its place for when the current
/// upgradeable reader exits. Each granted signal is completed immediately,
/// under the same monitor hold that unlinks its node -- see
/// [`grant_queued_writer`] for why the two must not be split across the
/// `MutexGuard`'s drop.
fn drain_readers(inner: &mut Inner) {
    let mut cursor = inner.queue.head_key();
    while let Some(key) = cursor {
        let kind = inner.queue.node(key).kind;
        match kind {
            WaitKind::ReadShared => {
                let node = inner.queue.unlink(key);
                inner.state.apply_grant(WaitKind::ReadShared);
                cursor = node.next;
                node.signal.complete_success();
            }
            WaitKind::ReadUpgradeable if inner.state.upgraded => {
                cursor = inner.queue.node(key).next;
            }
            WaitKind::ReadUpgradeable => {
                let node = inner.queue.unlink(key);
                inner.state.apply_grant(WaitKind::ReadUpgradeable);
                cursor = node.next;
                node.signal.complete_success();
            }
            WaitKind::Write => break,
        }
    }
}
