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

//! An asynchronous reader/writer lock with an upgradeable read mode.
//!
//! Three acquisition kinds share one lock: a shared read, an exclusive
//! write, and an upgradeable read -- a read grant that reserves the
//! exclusive right to later become the writer without ever releasing its
//! read hold in between. Waiters queue in strict FIFO order: a writer that
//! arrives while readers are held is never overtaken by a reader that
//! arrives after it, even though readers in general don't exclude each
//! other.
//!
//! Acquisition (`acquire_read`, `acquire_write`, `acquire_upgradeable_read`)
//! is `async` and never blocks an OS thread while waiting for a grant.
//! Release (`release_read`, `release_write`, `release_upgradeable`) is
//! synchronous and never `.await`s, so it can be called from a `Drop` impl.
//! [`AsyncRwLock::read`], [`AsyncRwLock::write`], and
//! [`AsyncRwLock::upgradeable_read`] wrap the manual pair in an RAII guard
//! for callers who don't need manual control.
//!
//! ```
//! # use async_rwlock::AsyncRwLock;
//! # async fn run() {
//! let lock = AsyncRwLock::new();
//! {
//!     let _reader = lock.read().await.unwrap();
//!     assert_eq!(lock.current_read_count(), 1);
//! }
//! let _writer = lock.write().await.unwrap();
//! # }
//! ```

mod deadline;
mod error;
mod guard;
mod lock;
mod queue;
mod signal;
mod state;

pub use deadline::Deadline;
pub use error::LockError;
pub use guard::{ReadGuard, UpgradeableReadGuard, UpgradedWriteGuard, WriteGuard};
pub use lock::AsyncRwLock;
