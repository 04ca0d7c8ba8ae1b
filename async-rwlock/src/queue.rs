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

//! The FIFO wait queue: a doubly linked list of [`WaitNode`]s with O(1)
//! append, unlink, and head inspection.
//!
//! A true intrusive list would store raw `*mut WaitNode` prev/next pointers.
//! This instead backs the list with a [`slab::Slab`] arena and stores `usize`
//! keys for `prev`/`next` -- the same complexity bounds without `unsafe`,
//! at the cost of one arena indirection per hop.

use slab::Slab;

use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitKind {
    ReadShared,
    ReadUpgradeable,
    Write,
}

#[derive(Debug)]
pub(crate) struct WaitNode {
    pub(crate) kind: WaitKind,
    pub(crate) signal: Signal,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    nodes: Slab<WaitNode>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Slab::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool { self.head.is_none() }

    /// Link a new node at the tail. Returns its key for later `unlink`.
    pub(crate) fn append(&mut self, kind: WaitKind, signal: Signal) -> usize {
        let key = self.nodes.insert(WaitNode {
            kind,
            signal,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        key
    }

    /// Excise the node at `key` from wherever it sits and return it.
    ///
    /// # Panics
    ///
    /// Panics if `key` does not refer to a node currently in the queue. Every
    /// call site in this crate only unlinks a key it has just observed via
    /// [`Self::head_key`]/[`Self::node`] under the same monitor hold, so this
    /// can't fire in practice; see [`crate::lock`] for the invariant that
    /// makes that true (a signal's outcome is `Pending` iff its node is still
    /// linked).
    pub(crate) fn unlink(&mut self, key: usize) -> WaitNode {
        let node = self.nodes.remove(key);
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        node
    }

    pub(crate) fn head_key(&self) -> Option<usize> { self.head }

    pub(crate) fn peek_head(&self) -> Option<&WaitNode> { self.head.map(|key| &self.nodes[key]) }

    pub(crate) fn node(&self, key: usize) -> &WaitNode { &self.nodes[key] }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(queue: &WaitQueue) -> Vec<WaitKind> {
        let mut out = Vec::new();
        let mut cursor = queue.head_key();
        while let Some(key) = cursor {
            let node = queue.node(key);
            out.push(node.kind);
            cursor = node.next;
        }
        out
    }

    #[test]
    fn append_is_fifo() {
        let mut queue = WaitQueue::new();
        queue.append(WaitKind::ReadShared, Signal::new());
        queue.append(WaitKind::Write, Signal::new());
        queue.append(WaitKind::ReadUpgradeable, Signal::new());
        assert_eq!(
            kinds(&queue),
            vec![WaitKind::ReadShared, WaitKind::Write, WaitKind::ReadUpgradeable]
        );
    }

    #[test]
    fn unlink_middle_preserves_order() {
        let mut queue = WaitQueue::new();
        let a = queue.append(WaitKind::ReadShared, Signal::new());
        let _b = queue.append(WaitKind::Write, Signal::new());
        let c = queue.append(WaitKind::ReadUpgradeable, Signal::new());
        let _ = a;
        queue.unlink(queue.head_key().unwrap()); // unlink `a` (the head)
        assert_eq!(kinds(&queue), vec![WaitKind::Write, WaitKind::ReadUpgradeable]);
        queue.unlink(c);
        assert_eq!(kinds(&queue), vec![WaitKind::Write]);
    }

    #[test]
    fn unlink_drains_to_empty_and_resets_tail() {
        let mut queue = WaitQueue::new();
        let only = queue.append(WaitKind::Write, Signal::new());
        queue.unlink(only);
        assert!(queue.is_empty());
        assert!(queue.peek_head().is_none());
        // Appending again after the queue is empty must not inherit a stale tail.
        queue.append(WaitKind::ReadShared, Signal::new());
        assert_eq!(kinds(&queue), vec![WaitKind::ReadShared]);
    }

    #[test]
    fn reused_slab_slot_does_not_resurrect_old_links() {
        let mut queue = WaitQueue::new();
        let a = queue.append(WaitKind::ReadShared, Signal::new());
        queue.unlink(a);
        // The slab is likely to reuse `a`'s slot for this insert.
        let b = queue.append(WaitKind::Write, Signal::new());
        assert_eq!(kinds(&queue), vec![WaitKind::Write]);
        assert_eq!(queue.head_key(), Some(b));
    }
}
