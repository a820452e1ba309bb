//! The Node Pool (spec.md §4.1): global, single-threaded, unique storage of
//! nodes keyed by fingerprint, with a full structural comparison on every
//! fingerprint hit.
//!
//! The Pool holds only `Weak` references (design note, option (b)): a node
//! lives exactly as long as some `Handle` outside the Pool keeps it alive,
//! which is how spec.md's "ref count drops to zero -> removed from Pool"
//! lifecycle falls out of ordinary Rust ownership instead of manual
//! bookkeeping.

use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::fingerprint::Fingerprint;
use crate::node::{Handle, Node, NodeData};

const INITIAL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct Pool {
    buckets: IndexMap<Fingerprint, Vec<Weak<Node>>>,
}

impl Pool {
    pub fn new() -> Self {
        Pool {
            buckets: IndexMap::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Bare lookup without allocation, used by the Parser to test for
    /// existing macros/data-type `Word`s before deciding whether to build a
    /// fresh node. Dead (collected) weak entries encountered along the way
    /// are pruned.
    pub fn lookup(&mut self, fp: Fingerprint, data: &NodeData) -> Option<Handle> {
        let bucket = self.buckets.get_mut(&fp)?;
        bucket.retain(|w| w.strong_count() > 0);
        bucket
            .iter()
            .find_map(|w| w.upgrade().filter(|rc| rc.data == *data))
            .map(Handle)
    }

    /// If a node with equal fingerprint *and* equal structure already exists
    /// (and is still alive), returns a fresh ref to it — the caller's
    /// freshly-built `data` is dropped. Otherwise allocates, inserts, and
    /// returns the new handle.
    ///
    /// `IndexMap` grows (and rehashes) on its own standard policy once load
    /// factor demands it, which satisfies spec.md's "starts at 256 slots,
    /// grows by doubling" requirement without a hand-rolled open-addressing
    /// table — see DESIGN.md.
    pub fn intern(&mut self, fp: Fingerprint, data: NodeData) -> Handle {
        if let Some(existing) = self.lookup(fp, &data) {
            return existing;
        }
        let handle = Handle(Rc::new(Node { fp, data }));
        self.buckets
            .entry(fp)
            .or_insert_with(Vec::new)
            .push(Rc::downgrade(&handle.0));
        handle
    }

    /// Number of still-live nodes currently tracked by the Pool. Prunes dead
    /// entries as a side effect, so repeated calls stay cheap.
    pub fn len(&mut self) -> usize {
        let mut n = 0;
        for bucket in self.buckets.values_mut() {
            bucket.retain(|w| w.strong_count() > 0);
            n += bucket.len();
        }
        n
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
