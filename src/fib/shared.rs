use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, RwLock,
};

use log::debug;

use super::{Fib, FibEntry};
use crate::name::Name;

// A FIB shared between one management writer and many forwarding readers.
// Writers copy the current table, modify the copy and swap it in, then bump the version.
// Readers keep their own snapshot and only touch the lock when the version has moved.
pub struct SharedFib {
    current: RwLock<Arc<Fib>>,
    version: AtomicU64,
    writer: Mutex<()>,
}

impl SharedFib {
    pub fn new(fib: Fib) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(Arc::new(fib)),
            version: AtomicU64::new(0),
            writer: Mutex::new(()),
        })
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn load(&self) -> Arc<Fib> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    // Applies the modification to a copy of the table and publishes it
    pub fn update<R>(&self, modify: impl FnOnce(&mut Fib) -> R) -> R {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = Fib::clone(&self.load());
        let result = modify(&mut next);
        let len = next.len();

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("FIB swapped to version {} with {} entries", version, len);
        result
    }

    pub fn insert(&self, entry: FibEntry) -> bool {
        self.update(|fib| fib.insert(entry))
    }

    pub fn erase(&self, name: &Name<'_>) -> bool {
        self.update(|fib| fib.erase(name))
    }

    pub fn reader(self: &Arc<Self>) -> FibReader {
        FibReader {
            version: self.version(),
            snapshot: self.load(),
            shared: Arc::clone(self),
        }
    }
}

pub struct FibReader {
    shared: Arc<SharedFib>,
    snapshot: Arc<Fib>,
    version: u64,
}

impl FibReader {
    // Picks up the latest table if it changed. Returns true if it did.
    pub fn refresh(&mut self) -> bool {
        let version = self.shared.version();
        if version == self.version {
            return false;
        }
        self.snapshot = self.shared.load();
        self.version = version;
        true
    }

    pub fn fib(&mut self) -> &Fib {
        self.refresh();
        &self.snapshot
    }

    pub fn lookup(&mut self, name: &Name<'_>) -> Option<Arc<FibEntry>> {
        self.fib().lookup(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{packet::FaceId, testing::name};

    #[test]
    fn test_reader_sees_updates() {
        let shared = SharedFib::new(Fib::new());
        let mut reader = shared.reader();
        assert!(reader.lookup(&name("/A/B")).is_none());
        assert!(!reader.refresh());

        let entry = FibEntry::with_nexthops(&name("/A"), &[FaceId(1)]).unwrap();
        assert!(shared.insert(entry));
        assert_eq!(shared.version(), 1);

        let found = reader.lookup(&name("/A/B")).unwrap();
        assert_eq!(found.nexthops(), &[FaceId(1)]);

        // An old snapshot stays usable after the swap
        let old = shared.load();
        assert!(shared.erase(&name("/A")));
        assert_eq!(old.len(), 1);
        assert!(reader.lookup(&name("/A/B")).is_none());
    }

    #[test]
    fn test_concurrent_readers() {
        let shared = SharedFib::new(Fib::new());
        let root = FibEntry::with_nexthops(&name("/"), &[FaceId(9)]).unwrap();
        shared.insert(root);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut reader = shared.reader();
                std::thread::spawn(move || {
                    let n = name("/X/Y");
                    for _ in 0..1000 {
                        assert!(reader.lookup(&n).is_some());
                    }
                })
            })
            .collect();

        for i in 0..50u32 {
            let entry = FibEntry::with_nexthops(&name(&format!("/X/{}", i)), &[FaceId(i)]).unwrap();
            shared.insert(entry);
        }
        for h in handles {
            assert!(h.join().is_ok());
        }
        assert_eq!(shared.load().len(), 51);
    }
}
