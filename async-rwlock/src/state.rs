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

//! The bookkeeping the lock mutates under its monitor, and the predicate
//! table that decides whether a given acquisition kind is currently
//! grantable.

use crate::queue::WaitKind;

/// Reader count, write-held flag, and upgradeable flag. `disposed` lives
/// alongside this in [`crate::lock`]'s `Inner`, not here, since disposal
/// bypasses the grant predicates entirely.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LockState {
    pub(crate) readers: usize,
    pub(crate) writer_held: bool,
    pub(crate) upgraded: bool,
}

impl LockState {
    /// Would `kind` be granted against the current state, ignoring the
    /// queue? Callers are responsible for the fairness rule (only consult
    /// this when the queue is empty, or when walking the queue's own
    /// grantable prefix in [`crate::lock::drain_readers`]).
    pub(crate) fn grant_predicate(&self, kind: WaitKind) -> bool {
        match kind {
            WaitKind::ReadShared => !self.writer_held,
            WaitKind::ReadUpgradeable => !self.writer_held && !self.upgraded,
            WaitKind::Write => !self.writer_held && (self.readers == 0 || (self.readers == 1 && self.upgraded)),
        }
    }

    /// Apply the state mutation that corresponds to granting `kind`. Does not
    /// touch the queue.
    pub(crate) fn apply_grant(&mut self, kind: WaitKind) {
        match kind {
            WaitKind::ReadShared => self.readers += 1,
            WaitKind::ReadUpgradeable => {
                self.readers += 1;
                self.upgraded = true;
            }
            WaitKind::Write => self.writer_held = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(LockState { readers: 0, writer_held: false, upgraded: false }, WaitKind::ReadShared, true  ; "idle grants a reader")]
    #[test_case(LockState { readers: 3, writer_held: false, upgraded: false }, WaitKind::ReadShared, true  ; "readers stack")]
    #[test_case(LockState { readers: 0, writer_held: true,  upgraded: false }, WaitKind::ReadShared, false ; "writer blocks a reader")]
    #[test_case(LockState { readers: 0, writer_held: false, upgraded: false }, WaitKind::ReadUpgradeable, true  ; "idle grants upgradeable")]
    #[test_case(LockState { readers: 1, writer_held: false, upgraded: true  }, WaitKind::ReadUpgradeable, false ; "only one upgradeable reader at a time")]
    #[test_case(LockState { readers: 2, writer_held: false, upgraded: false }, WaitKind::ReadUpgradeable, true  ; "plain readers don't block upgradeable")]
    #[test_case(LockState { readers: 0, writer_held: false, upgraded: false }, WaitKind::Write, true  ; "idle grants a writer")]
    #[test_case(LockState { readers: 1, writer_held: false, upgraded: false }, WaitKind::Write, false ; "a plain reader blocks a writer")]
    #[test_case(LockState { readers: 1, writer_held: false, upgraded: true  }, WaitKind::Write, true  ; "in-place upgrade is grantable")]
    #[test_case(LockState { readers: 2, writer_held: false, upgraded: true  }, WaitKind::Write, false ; "a second reader blocks in-place upgrade")]
    #[test_case(LockState { readers: 0, writer_held: true,  upgraded: false }, WaitKind::Write, false ; "a writer blocks a writer")]
    fn predicate_table(state: LockState, kind: WaitKind, expected: bool) {
        assert_eq!(state.grant_predicate(kind), expected);
    }

    #[test]
    fn apply_grant_read_shared() {
        let mut state = LockState::default();
        state.apply_grant(WaitKind::ReadShared);
        assert_eq!(state, LockState { readers: 1, writer_held: false, upgraded: false });
    }

    #[test]
    fn apply_grant_read_upgradeable() {
        let mut state = LockState::default();
        state.apply_grant(WaitKind::ReadUpgradeable);
        assert_eq!(state, LockState { readers: 1, writer_held: false, upgraded: true });
    }

    #[test]
    fn apply_grant_write_does_not_touch_readers() {
        let mut state = LockState { readers: 1, writer_held: false, upgraded: true };
        state.apply_grant(WaitKind::Write);
        assert_eq!(state, LockState { readers: 1, writer_held: true, upgraded: true });
    }
}
