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

use std::time::Duration;

use crate::error::LockError;

/// How long an acquire call is willing to wait for a grant.
///
/// A bare [`Duration`] can't be negative in Rust, so the "non-negative finite
/// duration or the infinite sentinel" argument constraint from the acquire
/// contract is enforced by construction for [`Deadline::After`] -- there is no
/// `InvalidArgument` path when building a `Deadline` straight from a
/// `Duration`. The validation still matters for callers decoding a deadline
/// from an external representation that *can* express "negative" (a config
/// file, a wire message, an FFI boundary); [`Deadline::from_millis`] is that
/// entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// No deadline: wait until the lock is granted, the lock is disposed, or
    /// cancellation trips.
    Infinite,
    /// Wait at most this long for a grant.
    After(Duration),
}

impl Default for Deadline {
    /// `infinite` is the default, per the acquire contract.
    fn default() -> Self { Deadline::Infinite }
}

impl Deadline {
    #[must_use]
    pub fn infinite() -> Self { Deadline::Infinite }

    #[must_use]
    pub fn after(duration: Duration) -> Self { Deadline::After(duration) }

    /// Decode a signed millisecond count from an external source into a
    /// `Deadline`. `-1` is the infinite sentinel (the conventional "no
    /// timeout" value for poll-style APIs); any other negative value fails
    /// validation before a wait is ever registered.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidArgument`] if `millis` is negative and not
    /// `-1`.
    pub fn from_millis(millis: i64) -> Result<Self, LockError> {
        match millis {
            -1 => Ok(Deadline::Infinite),
            m if m < 0 => Err(LockError::InvalidArgument),
            #[allow(clippy::cast_sign_loss)] // m >= 0 is guaranteed by the arm above.
            m => Ok(Deadline::After(Duration::from_millis(m as u64))),
        }
    }

    #[must_use]
    pub fn is_infinite(self) -> bool { matches!(self, Deadline::Infinite) }
}
