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

//! RAII guards layered on top of [`AsyncRwLock`]'s manual acquire/release
//! surface. The lock itself is deliberately not RAII-only (manual release is
//! part of the documented contract, and some callers want that), but most
//! callers want `Drop` to do the releasing for them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::deadline::Deadline;
use crate::error::LockError;
use crate::lock::AsyncRwLock;

impl AsyncRwLock {
    /// Acquire a read guard, waiting indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock is disposed.
    pub async fn read(&self) -> Result<ReadGuard<'_>, LockError> {
        self.acquire_read(Deadline::Infinite, None).await?;
        Ok(ReadGuard { lock: self })
    }

    /// Acquire a read guard, failing with [`LockError::Timeout`] if `timeout`
    /// elapses first.
    ///
    /// # Errors
    ///
    /// See [`Self::read`], plus [`LockError::Timeout`].
    pub async fn read_timeout(&self, timeout: Duration) -> Result<ReadGuard<'_>, LockError> {
        match self.acquire_read(Deadline::after(timeout), None).await? {
            true => Ok(ReadGuard { lock: self }),
            false => Err(LockError::Timeout),
        }
    }

    /// Acquire a read guard, failing with [`LockError::Cancelled`] if `cancel`
    /// trips first.
    ///
    /// # Errors
    ///
    /// See [`Self::read`], plus [`LockError::Cancelled`].
    pub async fn read_cancellable(&self, cancel: CancellationToken) -> Result<ReadGuard<'_>, LockError> {
        self.acquire_read(Deadline::Infinite, Some(cancel)).await?;
        Ok(ReadGuard { lock: self })
    }

    /// Acquire a write guard, waiting indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock is disposed.
    pub async fn write(&self) -> Result<WriteGuard<'_>, LockError> {
        self.acquire_write(Deadline::Infinite, None).await?;
        Ok(WriteGuard { lock: self })
    }

    /// See [`Self::read_timeout`].
    ///
    /// # Errors
    ///
    /// See [`Self::write`], plus [`LockError::Timeout`].
    pub async fn write_timeout(&self, timeout: Duration) -> Result<WriteGuard<'_>, LockError> {
        match self.acquire_write(Deadline::after(timeout), None).await? {
            true => Ok(WriteGuard { lock: self }),
            false => Err(LockError::Timeout),
        }
    }

    /// See [`Self::read_cancellable`].
    ///
    /// # Errors
    ///
    /// See [`Self::write`], plus [`LockError::Cancelled`].
    pub async fn write_cancellable(&self, cancel: CancellationToken) -> Result<WriteGuard<'_>, LockError> {
        self.acquire_write(Deadline::Infinite, Some(cancel)).await?;
        Ok(WriteGuard { lock: self })
    }

    /// Acquire an upgradeable read guard, waiting indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock is disposed.
    pub async fn upgradeable_read(&self) -> Result<UpgradeableReadGuard<'_>, LockError> {
        self.acquire_upgradeable_read(Deadline::Infinite, None).await?;
        Ok(UpgradeableReadGuard { lock: self })
    }

    /// See [`Self::read_timeout`].
    ///
    /// # Errors
    ///
    /// See [`Self::upgradeable_read`], plus [`LockError::Timeout`].
    pub async fn upgradeable_read_timeout(
        &self,
        timeout: Duration,
    ) -> Result<UpgradeableReadGuard<'_>, LockError> {
        match self.acquire_upgradeable_read(Deadline::after(timeout), None).await? {
            true => Ok(UpgradeableReadGuard { lock: self }),
            false => Err(LockError::Timeout),
        }
    }

    /// See [`Self::read_cancellable`].
    ///
    /// # Errors
    ///
    /// See [`Self::upgradeable_read`], plus [`LockError::Cancelled`].
    pub async fn upgradeable_read_cancellable(
        &self,
        cancel: CancellationToken,
    ) -> Result<UpgradeableReadGuard<'_>, LockError> {
        self.acquire_upgradeable_read(Deadline::Infinite, Some(cancel)).await?;
        Ok(UpgradeableReadGuard { lock: self })
    }
}

/// A held shared read grant. Releases on drop.
#[derive(Debug)]
pub struct ReadGuard<'a> {
    lock: &'a AsyncRwLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        // The only way `release_read` fails here is `Disposed`, and disposal
        // already forced every held grant's owner out via their own
        // in-flight `acquire`/`wait` -- a guard that exists was granted
        // before disposal, so this is a best-effort release on a codepath
        // that is not expected to error in practice.
        let _ = self.lock.release_read();
    }
}

/// A held exclusive write grant. Releases on drop.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    lock: &'a AsyncRwLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.release_write();
    }
}

/// A held upgradeable read grant. Releases on drop, unless consumed by
/// [`Self::upgrade`].
#[derive(Debug)]
pub struct UpgradeableReadGuard<'a> {
    lock: &'a AsyncRwLock,
}

impl<'a> UpgradeableReadGuard<'a> {
    /// Upgrade in place to the write mode, without ever releasing the
    /// upgradeable hold in between. On success, consumes `self` and returns a
    /// combined guard whose `Drop` releases both the write grant and the
    /// upgradeable grant, in that order.
    ///
    /// On failure (disposal, a timeout, or cancellation racing the upgrade),
    /// returns `self` back to the caller along with the error, so the
    /// upgradeable read is not silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Disposed`] if the lock is disposed.
    pub async fn upgrade(self) -> Result<UpgradedWriteGuard<'a>, (Self, LockError)> {
        match self.lock.acquire_write(Deadline::Infinite, None).await {
            Ok(true) => {
                let lock = self.lock;
                // `self`'s `Drop` would call `release_upgradeable`, which
                // `UpgradedWriteGuard`'s `Drop` also does (after releasing
                // the write grant first). Forgetting `self` here hands the
                // upgradeable-release obligation to the combined guard
                // instead of discharging it twice.
                std::mem::forget(self);
                Ok(UpgradedWriteGuard { lock })
            }
            Ok(false) => unreachable!("an infinite deadline never times out"),
            Err(err) => Err((self, err)),
        }
    }

    /// Upgrade in place, failing with [`LockError::Timeout`] if `timeout`
    /// elapses first.
    ///
    /// # Errors
    ///
    /// See [`Self::upgrade`], plus [`LockError::Timeout`].
    pub async fn upgrade_timeout(
        self,
        timeout: Duration,
    ) -> Result<UpgradedWriteGuard<'a>, (Self, LockError)> {
        match self.lock.acquire_write(Deadline::after(timeout), None).await {
            Ok(true) => {
                let lock = self.lock;
                std::mem::forget(self);
                Ok(UpgradedWriteGuard { lock })
            }
            Ok(false) => Err((self, LockError::Timeout)),
            Err(err) => Err((self, err)),
        }
    }
}

impl Drop for UpgradeableReadGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.release_upgradeable();
    }
}

/// The result of [`UpgradeableReadGuard::upgrade`]: holds both the write
/// grant and the upgradeable grant it was upgraded from. Dropping releases
/// the write grant first, then the upgradeable grant, matching the order the
/// manual API requires.
#[derive(Debug)]
pub struct UpgradedWriteGuard<'a> {
    lock: &'a AsyncRwLock,
}

impl Drop for UpgradedWriteGuard<'_> {
    fn drop(&mut self) {
        let _ = self.lock.release_write();
        let _ = self.lock.release_upgradeable();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn read_guard_releases_on_drop() {
        let lock = AsyncRwLock::new();
        {
            let _guard = lock.read().await.unwrap();
            assert_eq!(lock.current_read_count(), 1);
        }
        assert_eq!(lock.current_read_count(), 0);
    }

    #[tokio::test]
    async fn write_guard_excludes_readers_until_dropped() {
        let lock = AsyncRwLock::new();
        let guard = lock.write().await.unwrap();
        assert!(lock.is_write_held());
        drop(guard);
        assert!(!lock.is_write_held());
        let _read = lock.read().await.unwrap();
    }

    #[tokio::test]
    async fn upgradeable_guard_upgrades_in_place_without_a_gap() {
        let lock = AsyncRwLock::new();
        let guard = lock.upgradeable_read().await.unwrap();
        assert_eq!(lock.current_read_count(), 1);
        let write_guard = guard.upgrade().await.unwrap_or_else(|_| panic!("upgrade should succeed"));
        assert!(lock.is_write_held());
        drop(write_guard);
        assert!(!lock.is_write_held());
        assert!(!lock.is_upgradeable_read_held());
        assert_eq!(lock.current_read_count(), 0);
    }

    #[tokio::test]
    async fn failed_upgrade_returns_the_original_guard() {
        let lock = AsyncRwLock::new();
        // Hold a second plain reader so the in-place upgrade can't proceed.
        let _blocker = lock.read().await.unwrap();
        let guard = lock.upgradeable_read().await.unwrap();
        let timeout = Duration::from_millis(1);
        match guard.upgrade_timeout(timeout).await {
            Ok(_) => panic!("upgrade should not succeed while a second reader is held"),
            Err((guard, err)) => {
                assert_eq!(err, LockError::Timeout);
                assert!(lock.is_upgradeable_read_held());
                drop(guard);
            }
        }
    }
}
