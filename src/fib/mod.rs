mod entry;
mod shared;

pub use entry::{FibEntry, MAX_NAME_LENGTH, MAX_NEXTHOPS};
pub use shared::{FibReader, SharedFib};

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::name::Name;

// Forwarding Information Base, indexed by the hash of each entry's full name.
// Longest prefix match probes the index once per prefix length, from the longest
//  prefix that could possibly be present down to the root.
#[derive(Clone, Default)]
pub struct Fib {
    entries: HashMap<u64, Vec<Arc<FibEntry>>>,
    // Number of entries per component count, used to bound the probing
    depth_counts: Vec<usize>,
    len: usize,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Component count of the longest entry name
    pub fn max_depth(&self) -> usize {
        self.depth_counts
            .iter()
            .rposition(|c| *c > 0)
            .unwrap_or(0)
    }

    // Inserts or replaces the entry with the same name. Returns true if it is new.
    pub fn insert(&mut self, mut entry: FibEntry) -> bool {
        let hash = entry.name().compute_hash();
        let depth = entry.name().len();
        let bucket = self.entries.entry(hash).or_default();

        match bucket.iter().position(|e| e.name() == entry.name()) {
            Some(idx) => {
                entry.set_seq_num(bucket[idx].seq_num().wrapping_add(1));
                debug!("FIB replace {} nexthops={:?}", entry.name(), entry.nexthops());
                bucket[idx] = Arc::new(entry);
                false
            }
            None => {
                debug!("FIB insert {} nexthops={:?}", entry.name(), entry.nexthops());
                bucket.push(Arc::new(entry));
                if self.depth_counts.len() <= depth {
                    self.depth_counts.resize(depth + 1, 0);
                }
                self.depth_counts[depth] += 1;
                self.len += 1;
                true
            }
        }
    }

    // Replaces an existing entry. Returns false and changes nothing if the name is absent.
    pub fn update(&mut self, entry: FibEntry) -> bool {
        if self.find(entry.name()).is_none() {
            return false;
        }
        self.insert(entry);
        true
    }

    pub fn erase(&mut self, name: &Name<'_>) -> bool {
        let hash = name.compute_hash();
        let Some(bucket) = self.entries.get_mut(&hash) else {
            return false;
        };
        let Some(idx) = bucket.iter().position(|e| e.name() == name) else {
            return false;
        };
        bucket.swap_remove(idx);
        if bucket.is_empty() {
            self.entries.remove(&hash);
        }
        if let Some(count) = self.depth_counts.get_mut(name.len()) {
            *count -= 1;
        }
        self.len -= 1;
        debug!("FIB erase {}", name);
        true
    }

    // Exact match
    pub fn find(&self, name: &Name<'_>) -> Option<&Arc<FibEntry>> {
        self.find_prefix(name.compute_hash(), name.value())
    }

    fn find_prefix(&self, hash: u64, value: &[u8]) -> Option<&Arc<FibEntry>> {
        self.entries
            .get(&hash)?
            .iter()
            .find(|e| e.name().value() == value)
    }

    // Longest prefix match. Falls back to the root entry if there is one.
    pub fn lookup(&self, name: &Name<'_>) -> Option<&Arc<FibEntry>> {
        if self.len == 0 {
            return None;
        }
        let start = name.len().min(self.max_depth());
        let prefixes: Vec<(usize, u64)> = name.prefix_hashes().take(start + 1).collect();
        prefixes
            .iter()
            .rev()
            .find_map(|(size, hash)| self.find_prefix(*hash, &name.value()[..*size]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FibEntry>> {
        self.entries.values().flatten()
    }
}
