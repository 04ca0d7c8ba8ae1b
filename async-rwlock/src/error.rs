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

//! The closed set of failure modes for every fallible operation on
//! [`crate::AsyncRwLock`]. Every public method returns `Result<_, LockError>` --
//! there is no panicking path for caller-triggerable conditions.

/// Errors raised by [`crate::AsyncRwLock`] operations.
///
/// None of these variants carry heap data, so the type is `Copy`. Errors are
/// surfaced to the immediate caller; the lock never swallows or retries them
/// internally. A failed release leaves state unchanged, and a failed acquire
/// never enters the wait queue.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// Any operation attempted on a lock that has already been disposed.
    #[error("the lock has been disposed")]
    Disposed,

    /// A release method was called for a mode whose precondition does not
    /// hold -- e.g. `release_read` on a lock only holding an upgradeable
    /// read, or `release_write` with no writer held.
    #[error("release was called for a mode that is not currently held")]
    NotHeld,

    /// An acquire argument failed validation (currently: a deadline decoded
    /// from an external signed-integer representation that was negative and
    /// not the infinite sentinel). See [`crate::Deadline::from_millis`].
    #[error("invalid argument")]
    InvalidArgument,

    /// Convenience-wrapper surface: an acquire call with a finite deadline
    /// resolved to `false` (i.e. the grant did not arrive before the
    /// deadline elapsed).
    #[error("acquire timed out before the lock was granted")]
    Timeout,

    /// The caller's [`tokio_util::sync::CancellationToken`] tripped before
    /// the lock was granted.
    #[error("acquire was cancelled before the lock was granted")]
    Cancelled,
}
