//! Transactional undo scope for block application.
//!
//! All maintenance for one block runs against an [UndoSession], a storage
//! middleware that records the prior value of every key it overwrites. On
//! success the session is committed into the [UndoLog] as one frame per
//! block; on any fatal error the session reverts and the underlying storage
//! is untouched. The log retains `head - last_irreversible + 1` frames, the
//! same window the fork database keeps, so the node can always unwind back to
//! an irreversible block.
use cosmwasm_std::{Order, Record, Storage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Prior values recorded while applying one block.
///
/// Serializable so a node can persist its retained frames across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoFrame {
    /// The block whose application this frame can undo
    pub block_num: u32,
    prior: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl UndoFrame {
    fn apply(self, store: &mut dyn Storage) {
        for (key, old) in self.prior {
            match old {
                Some(value) => store.set(&key, &value),
                None => store.remove(&key),
            }
        }
    }
}

/// Storage middleware recording enough to reverse every mutation.
pub struct UndoSession<'a> {
    inner: &'a mut dyn Storage,
    prior: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> UndoSession<'a> {
    /// Start a session over the given storage.
    pub fn new(inner: &'a mut dyn Storage) -> Self {
        UndoSession {
            inner,
            prior: BTreeMap::new(),
        }
    }

    fn record(&mut self, key: &[u8]) {
        if !self.prior.contains_key(key) {
            let old = self.inner.get(key);
            self.prior.insert(key.to_vec(), old);
        }
    }

    /// Abandon the session, restoring every touched key.
    pub fn revert(self) {
        let UndoSession { inner, prior } = self;
        UndoFrame {
            block_num: 0,
            prior,
        }
        .apply(inner);
    }

    /// Keep the mutations and package the recorded priors as a frame.
    pub fn into_frame(self, block_num: u32) -> UndoFrame {
        UndoFrame {
            block_num,
            prior: self.prior,
        }
    }
}

impl Storage for UndoSession<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        self.inner.range(start, end, order)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.record(key);
        self.inner.set(key, value);
    }

    fn remove(&mut self, key: &[u8]) {
        self.record(key);
        self.inner.remove(key);
    }
}

/// Retention of committed undo frames, oldest first.
#[derive(Default)]
pub struct UndoLog {
    frames: VecDeque<UndoFrame>,
    max_size: usize,
}

impl UndoLog {
    /// An empty log retaining up to `max_size` frames.
    pub fn new(max_size: usize) -> Self {
        UndoLog {
            frames: VecDeque::new(),
            max_size,
        }
    }

    /// Append a committed frame, dropping the oldest beyond the window.
    pub fn commit(&mut self, frame: UndoFrame) {
        self.frames.push_back(frame);
        self.trim();
    }

    /// Resize the retention window. Matches the fork window: one frame per
    /// block between last irreversible and head, inclusive.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.trim();
    }

    /// Unwind the most recent frame onto the given storage. Returns the block
    /// number that was undone.
    pub fn undo_head(&mut self, store: &mut dyn Storage) -> Option<u32> {
        let frame = self.frames.pop_back()?;
        let block_num = frame.block_num;
        frame.apply(store);
        Some(block_num)
    }

    /// Number of retained frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Is the log empty?
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn trim(&mut self) {
        while self.frames.len() > self.max_size {
            self.frames.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::MemoryStorage;

    fn dump(store: &dyn Storage) -> Vec<Record> {
        store.range(None, None, Order::Ascending).collect()
    }

    #[test]
    fn revert_restores_prior_state() {
        let mut store = MemoryStorage::new();
        store.set(b"keep", b"old");
        store.set(b"gone", b"doomed");
        let before = dump(&store);

        let mut session = UndoSession::new(&mut store);
        session.set(b"keep", b"new");
        session.set(b"fresh", b"value");
        session.remove(b"gone");
        session.revert();

        assert_eq!(dump(&store), before);
    }

    #[test]
    fn undo_head_reverses_committed_block() {
        let mut store = MemoryStorage::new();
        store.set(b"a", b"1");
        let before = dump(&store);

        let mut log = UndoLog::new(8);
        let mut session = UndoSession::new(&mut store);
        session.set(b"a", b"2");
        session.set(b"b", b"3");
        log.commit(session.into_frame(7));

        assert_eq!(store.get(b"a"), Some(b"2".to_vec()));
        assert_eq!(log.undo_head(&mut store), Some(7));
        assert_eq!(dump(&store), before);
        assert!(log.is_empty());
    }

    #[test]
    fn window_trims_oldest() {
        let mut store = MemoryStorage::new();
        let mut log = UndoLog::new(2);
        for i in 0..4u32 {
            let mut session = UndoSession::new(&mut store);
            session.set(b"x", &[i as u8]);
            log.commit(session.into_frame(i));
        }
        assert_eq!(log.len(), 2);
        log.set_max_size(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.undo_head(&mut store), Some(3));
    }

    #[test]
    fn first_write_wins_in_frame() {
        let mut store = MemoryStorage::new();
        store.set(b"k", b"orig");
        let mut session = UndoSession::new(&mut store);
        session.set(b"k", b"a");
        session.set(b"k", b"b");
        session.remove(b"k");
        session.revert();
        assert_eq!(store.get(b"k"), Some(b"orig".to_vec()));
    }
}
