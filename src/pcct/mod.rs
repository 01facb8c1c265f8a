mod cs;
mod pit;
mod timeout;

pub use cs::CsEntry;
pub use pit::{InRecord, OutRecord, PitEntry};

use std::{collections::HashMap, mem, sync::Arc};

use log::{debug, trace, warn};

use crate::{
    clock::Timestamp,
    error::{Error, Result},
    fib::FibEntry,
    hash::Sha256Digest,
    name::Name,
    packet::{Data, FaceId, Interest, Nack, PitToken},
};
use cs::LruList;
use timeout::{Deadline, TimeoutQueue};

pub const DEFAULT_INTEREST_LIFETIME_MS: u64 = 4000; // 4 sec

// Stale timers tolerated on top of two per pending entry
const TIMER_SLACK: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcctConfig {
    // Total slots, PIT and CS together. Fixed at construction.
    pub capacity: usize,
    pub cs_capacity: usize,
    // Used when an Interest carries no InterestLifetime
    pub default_interest_lifetime_ms: u64,
    pub max_in_records: usize,
}

impl Default for PcctConfig {
    fn default() -> Self {
        Self {
            capacity: 65535,
            cs_capacity: 32768,
            default_interest_lifetime_ms: DEFAULT_INTEREST_LIFETIME_MS,
            max_in_records: 16,
        }
    }
}

// Handles carry the generation of their slot, so they go stale once the entry is erased
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PitId {
    slot: u32,
    generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CsId {
    slot: u32,
    generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryId {
    Pit(PitId),
    Cs(CsId),
}

impl From<PitId> for EntryId {
    fn from(id: PitId) -> Self {
        EntryId::Pit(id)
    }
}

impl From<CsId> for EntryId {
    fn from(id: CsId) -> Self {
        EntryId::Cs(id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertResult {
    // Pending entry the Interest now has an in-record on
    Pit { id: PitId, is_new: bool },
    // Cached Data answers the Interest, nothing was recorded
    Cs(CsId),
    // The nonce was already seen from another face, which is a loop
    DuplicateNonce { id: PitId, face: FaceId },
}

// PIT entries a Data satisfies: at most one under its own name or a prefix of it,
//  and one under its name plus implicit digest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PitFindResult {
    entries: [Option<PitId>; 2],
    need_digest: bool,
}

impl PitFindResult {
    pub fn entries(&self) -> impl Iterator<Item = PitId> {
        self.entries.into_iter().flatten()
    }

    pub fn name_entry(&self) -> Option<PitId> {
        self.entries[0]
    }

    pub fn digest_entry(&self) -> Option<PitId> {
        self.entries[1]
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    // A PIT entry keyed on the implicit digest may exist. Compute the digest and look again.
    pub fn need_digest(&self) -> bool {
        self.need_digest
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PitCounters {
    pub n_entries: u64,
    pub n_insert: u64,
    pub n_found: u64,
    pub n_cs_match: u64,
    pub n_alloc_err: u64,
    pub n_data_hit: u64,
    pub n_data_miss: u64,
    pub n_nack_hit: u64,
    pub n_nack_miss: u64,
    pub n_expired: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CsCounters {
    pub n_entries: u64,
    pub n_hits: u64,
    pub n_misses: u64,
    pub n_evicted: u64,
}

enum Slot {
    Empty,
    Pending(PitEntry),
    Cached(CsEntry),
}

impl Slot {
    fn name(&self) -> Option<&Name<'static>> {
        match self {
            Slot::Empty => None,
            Slot::Pending(pit) => Some(pit.name()),
            Slot::Cached(cs) => Some(cs.name()),
        }
    }
}

struct PccEntry {
    hash: u64,
    generation: u32,
    // Next in the bucket chain, or in the free list once erased
    next: Option<u32>,
    slot: Slot,
}

// PIT and CS sharing one hash table keyed by the exact name.
// A name holds either pending Interests or cached Data, never both.
pub struct Pcct {
    config: PcctConfig,
    buckets: Vec<Option<u32>>,
    mask: u64,
    entries: Vec<PccEntry>,
    free: Option<u32>,
    len: usize,
    tokens: HashMap<u64, u32>,
    last_token: u64,
    // Pending digest-named entries per hash of the name without the digest
    digest_index: HashMap<u64, u32>,
    lru: LruList,
    timeouts: TimeoutQueue,
    pit_counters: PitCounters,
    cs_counters: CsCounters,
}

impl Pcct {
    pub fn new(config: PcctConfig) -> Self {
        let n_buckets = config.capacity.max(1).next_power_of_two();
        debug!(
            "PCCT created capacity={} cs_capacity={} buckets={}",
            config.capacity, config.cs_capacity, n_buckets
        );
        Self {
            buckets: vec![None; n_buckets],
            mask: n_buckets as u64 - 1,
            entries: Vec::new(),
            free: None,
            len: 0,
            tokens: HashMap::new(),
            last_token: 0,
            digest_index: HashMap::new(),
            lru: LruList::default(),
            timeouts: TimeoutQueue::default(),
            pit_counters: PitCounters::default(),
            cs_counters: CsCounters::default(),
            config,
        }
    }

    pub fn config(&self) -> &PcctConfig {
        &self.config
    }

    // Occupied slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn pit_len(&self) -> usize {
        self.len - self.lru.len()
    }

    pub fn cs_len(&self) -> usize {
        self.lru.len()
    }

    pub fn pit_counters(&self) -> PitCounters {
        self.pit_counters
    }

    pub fn cs_counters(&self) -> CsCounters {
        self.cs_counters
    }

    pub fn insert(
        &mut self,
        interest: &Interest<'_>,
        face: FaceId,
        fib_entry: Option<&Arc<FibEntry>>,
        now: Timestamp,
    ) -> Result<InsertResult> {
        let name = &interest.name;
        if let Some(id) = self.match_bare_cs(interest, now) {
            return Ok(InsertResult::Cs(id));
        }
        let hash = name.compute_hash();
        let found = self.find_slot(hash, name.value());
        if let Some(id) = found.and_then(|idx| self.match_cs(idx, interest, now)) {
            return Ok(InsertResult::Cs(id));
        }
        self.cs_counters.n_misses += 1;

        let lifetime = interest
            .interest_lifetime
            .unwrap_or(self.config.default_interest_lifetime_ms);
        let record = InRecord {
            face,
            nonce: interest.nonce,
            expiry: now.adding(lifetime),
            can_be_prefix: interest.can_be_prefix,
            must_be_fresh: interest.must_be_fresh,
            token: interest.pit_token,
        };

        if let Some(idx) = found {
            let max_in_records = self.config.max_in_records;
            let entry = &mut self.entries[idx as usize];
            if let Slot::Pending(pit) = &mut entry.slot {
                let id = PitId {
                    slot: idx,
                    generation: entry.generation,
                };
                if let Some(other) = interest.nonce.and_then(|n| pit.find_duplicate_nonce(n, face)) {
                    trace!("PIT duplicate nonce {} from {}, first seen on {}", name, face, other);
                    return Ok(InsertResult::DuplicateNonce { id, face: other });
                }

                let previous_expiry = pit.expiry();
                pit.insert_in_record(record, max_in_records);
                if let (None, Some(fib_entry)) = (pit.fib_entry(), fib_entry) {
                    pit.set_fib_entry(fib_entry);
                }
                let expiry = pit.expiry();
                trace!(
                    "PIT aggregate {} from {} in_records={}",
                    name,
                    face,
                    pit.in_records().len()
                );
                if expiry != previous_expiry {
                    self.schedule_timeout(id, expiry);
                }
                self.pit_counters.n_found += 1;
                return Ok(InsertResult::Pit { id, is_new: false });
            }

            // Cached Data too stale for this Interest gives way to a PIT entry
            trace!("CS drop stale {}", name);
            self.release(idx);
        }

        let token = self.next_token();
        let mut pit = PitEntry::new(name.clone().into_owned(), token, fib_entry);
        pit.insert_in_record(record, self.config.max_in_records);
        let expiry = pit.expiry();

        let idx = match self.allocate(hash, Slot::Pending(pit)) {
            Ok(idx) => idx,
            Err(e) => {
                self.pit_counters.n_alloc_err += 1;
                return Err(e);
            }
        };
        let generation = self.entries[idx as usize].generation;

        self.tokens.insert(token.get(), idx);
        if name.has_digest_component() {
            *self
                .digest_index
                .entry(name.compute_prefix_hash(name.len() - 1))
                .or_default() += 1;
        }
        let id = PitId {
            slot: idx,
            generation,
        };
        self.schedule_timeout(id, expiry);
        self.pit_counters.n_entries += 1;
        self.pit_counters.n_insert += 1;
        trace!("PIT insert {} from {} token={:x}", name, face, token.get());

        Ok(InsertResult::Pit { id, is_new: true })
    }

    // Cached Data that answers the Interest, without recording anything on a miss
    pub fn lookup_cs(&mut self, interest: &Interest<'_>, now: Timestamp) -> Option<CsId> {
        let found = self.match_bare_cs(interest, now).or_else(|| {
            let idx = self.find_slot(interest.name.compute_hash(), interest.name.value())?;
            self.match_cs(idx, interest, now)
        });
        if found.is_none() {
            self.cs_counters.n_misses += 1;
        }
        found
    }

    pub fn find_by_data(&mut self, data: &Data<'_>, digest: Option<&Sha256Digest>) -> PitFindResult {
        let mut result = PitFindResult::default();

        // The token identifies the entry the Data answers even when its name is longer
        if let Some(id) = data.pit_token.and_then(|t| self.find_by_token(t)) {
            if let Some(pit) = self.pit_entry(id) {
                let name = pit.name();
                if name.has_digest_component() {
                    if name.get_prefix(name.len() - 1) == data.name {
                        match digest {
                            Some(d) if Self::digest_matches(name, d) => result.entries[1] = Some(id),
                            Some(_) => {}
                            None => result.need_digest = true,
                        }
                    }
                } else if *name == data.name || (pit.can_be_prefix() && name.is_prefix_of(&data.name)) {
                    result.entries[0] = Some(id);
                }
            }
        }

        if result.entries[0].is_none() {
            result.entries[0] = self.find_pending(data.name.compute_hash(), data.name.value());
        }

        if result.entries[1].is_none()
            && !result.need_digest
            && self.digest_index.contains_key(&data.name.compute_hash())
        {
            match digest {
                Some(d) => {
                    if let Ok(full) = data.name.append_digest(&d.0) {
                        result.entries[1] = self.find_pending(full.compute_hash(), full.value());
                    }
                }
                None => result.need_digest = true,
            }
        }

        // Counted once the caller has had the chance to supply the digest
        if result.need_digest {
            trace!("PIT data {} needs digest", data.name);
        } else if !result.is_empty() {
            self.pit_counters.n_data_hit += 1;
            trace!("PIT data match {} {:?}", data.name, result);
        } else {
            self.pit_counters.n_data_miss += 1;
            trace!("PIT data miss {}", data.name);
        }
        result
    }

    // Matches a Nack to the entry whose Interest it rejects. Needs the token and the nonce
    //  of an out-record, so anything older than the last retransmission is ignored.
    pub fn find_by_nack(&mut self, nack: &Nack<'_>) -> Option<PitId> {
        let found = nack
            .pit_token()
            .zip(nack.interest.nonce)
            .and_then(|(token, nonce)| {
                let id = self.find_by_token(token)?;
                let pit = self.pit_entry(id)?;
                (*pit.name() == nack.interest.name && pit.has_out_record_nonce(nonce)).then_some(id)
            });

        match found {
            Some(_) => self.pit_counters.n_nack_hit += 1,
            None => {
                self.pit_counters.n_nack_miss += 1;
                trace!("PIT stale nack {} {}", nack.interest.name, nack.reason);
            }
        }
        found
    }

    pub fn find_by_token(&self, token: PitToken) -> Option<PitId> {
        let idx = *self.tokens.get(&token.get())?;
        Some(PitId {
            slot: idx,
            generation: self.entries[idx as usize].generation,
        })
    }

    // Satisfies the found entries and caches the Data under its name. An entry is erased
    //  once the Data has answered all of its in-records.
    // Data nobody asked for is not cached.
    pub fn insert_data(
        &mut self,
        data: &Data<'_>,
        found: &PitFindResult,
        digest: Option<&Sha256Digest>,
        now: Timestamp,
    ) -> Option<CsId> {
        let satisfied = found
            .entries()
            .filter(|id| self.satisfy(*id, &data.name))
            .count();
        if satisfied == 0 || self.config.cs_capacity == 0 {
            return None;
        }

        let hash = data.name.compute_hash();
        if let Some(idx) = self.find_slot(hash, data.name.value()) {
            let entry = &mut self.entries[idx as usize];
            let Slot::Cached(cs) = &mut entry.slot else {
                // Interests are still pending under this exact name
                return None;
            };
            *cs = CsEntry::new(data, digest, now);
            let id = CsId {
                slot: idx,
                generation: entry.generation,
            };
            self.lru.move_to_back(idx);
            trace!("CS refresh {}", data.name);
            return Some(id);
        }

        if self.lru.len() >= self.config.cs_capacity {
            self.evict_lru();
        }
        let idx = self
            .allocate(hash, Slot::Cached(CsEntry::new(data, digest, now)))
            .ok()?;
        self.lru.push_back(idx);
        self.cs_counters.n_entries += 1;
        trace!("CS insert {}", data.name);
        Some(CsId {
            slot: idx,
            generation: self.entries[idx as usize].generation,
        })
    }

    // Returns false if the handle is stale
    pub fn erase(&mut self, entry: impl Into<EntryId>) -> bool {
        let (slot, generation, pending) = match entry.into() {
            EntryId::Pit(id) => (id.slot, id.generation, true),
            EntryId::Cs(id) => (id.slot, id.generation, false),
        };
        let Some(e) = self.entries.get(slot as usize) else {
            return false;
        };
        let live = e.generation == generation
            && matches!(
                (&e.slot, pending),
                (Slot::Pending(_), true) | (Slot::Cached(_), false)
            );
        if live {
            self.release(slot);
        }
        live
    }

    // Erases every PIT entry whose expiry is not after `now`. Returns how many.
    pub fn trigger_timeout_expiry(&mut self, now: Timestamp) -> usize {
        let mut expired = 0;
        while let Some(deadline) = self.timeouts.pop_due(now) {
            let Some(entry) = self.entries.get(deadline.slot as usize) else {
                continue;
            };
            // Refreshed entries left an item at their old deadline behind
            let due = entry.generation == deadline.generation
                && matches!(&entry.slot, Slot::Pending(pit) if pit.expiry() <= now);
            if due {
                if let Some(name) = entry.slot.name() {
                    trace!("PIT expire {}", name);
                }
                self.release(deadline.slot);
                expired += 1;
            }
        }
        if expired > 0 {
            self.pit_counters.n_expired += expired as u64;
            debug!(
                "PCCT expired {} PIT entries, {} pending, {} timers",
                expired,
                self.pit_len(),
                self.timeouts.len()
            );
        }
        expired
    }

    pub fn pit_entry(&self, id: PitId) -> Option<&PitEntry> {
        match self.entries.get(id.slot as usize) {
            Some(PccEntry {
                generation,
                slot: Slot::Pending(pit),
                ..
            }) if *generation == id.generation => Some(pit),
            _ => None,
        }
    }

    pub fn pit_entry_mut(&mut self, id: PitId) -> Option<&mut PitEntry> {
        match self.entries.get_mut(id.slot as usize) {
            Some(PccEntry {
                generation,
                slot: Slot::Pending(pit),
                ..
            }) if *generation == id.generation => Some(pit),
            _ => None,
        }
    }

    pub fn cs_entry(&self, id: CsId) -> Option<&CsEntry> {
        match self.entries.get(id.slot as usize) {
            Some(PccEntry {
                generation,
                slot: Slot::Cached(cs),
                ..
            }) if *generation == id.generation => Some(cs),
            _ => None,
        }
    }

    fn satisfy(&mut self, id: PitId, data_name: &Name<'_>) -> bool {
        let Some(pit) = self.pit_entry_mut(id) else {
            return false;
        };
        let previous_expiry = pit.expiry();
        if !pit.remove_answered(data_name) {
            return self.erase(id);
        }
        let expiry = pit.expiry();
        trace!(
            "PIT {} keeps {} in_records not answered by {}",
            pit.name(),
            pit.in_records().len(),
            data_name
        );
        if expiry != previous_expiry {
            self.schedule_timeout(id, expiry);
        }
        true
    }

    fn schedule_timeout(&mut self, id: PitId, at: Timestamp) {
        self.timeouts.schedule(Deadline {
            at,
            slot: id.slot,
            generation: id.generation,
        });
        self.compact_timeouts();
    }

    // Deadlines of erased or refreshed entries are only skipped once due. Drop them early
    //  when they outnumber the pending entries, so far-off lifetimes cannot pile up.
    fn compact_timeouts(&mut self) {
        if self.timeouts.len() <= 2 * self.pit_len() + TIMER_SLACK {
            return;
        }
        let before = self.timeouts.len();
        let entries = &self.entries;
        self.timeouts.retain(|d| {
            matches!(
                entries.get(d.slot as usize),
                Some(PccEntry {
                    generation,
                    slot: Slot::Pending(pit),
                    ..
                }) if *generation == d.generation && pit.expiry() == d.at
            )
        });
        debug!(
            "PCCT dropped {} stale timers, {} left",
            before - self.timeouts.len(),
            self.timeouts.len()
        );
    }

    fn digest_matches(name: &Name<'_>, digest: &Sha256Digest) -> bool {
        name.last_component()
            .map(|c| c.bytes == &digest.0[..])
            .unwrap_or(false)
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash & self.mask) as usize
    }

    fn find_slot(&self, hash: u64, value: &[u8]) -> Option<u32> {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(idx) = cur {
            let entry = &self.entries[idx as usize];
            if entry.hash == hash && entry.slot.name().map(|n| n.value()) == Some(value) {
                return Some(idx);
            }
            cur = entry.next;
        }
        None
    }

    fn find_pending(&self, hash: u64, value: &[u8]) -> Option<PitId> {
        let idx = self.find_slot(hash, value)?;
        let entry = &self.entries[idx as usize];
        matches!(entry.slot, Slot::Pending(_)).then_some(PitId {
            slot: idx,
            generation: entry.generation,
        })
    }

    // Data is cached under its own name, so a digest-named Interest looks there
    fn match_bare_cs(&mut self, interest: &Interest<'_>, now: Timestamp) -> Option<CsId> {
        let name = &interest.name;
        if !name.has_digest_component() {
            return None;
        }
        let bare_len = name.len() - 1;
        let idx = self.find_slot(
            name.compute_prefix_hash(bare_len),
            &name.value()[..name.prefix_size(bare_len)],
        )?;
        self.match_cs(idx, interest, now)
    }

    fn match_cs(&mut self, idx: u32, interest: &Interest<'_>, now: Timestamp) -> Option<CsId> {
        let entry = &self.entries[idx as usize];
        let Slot::Cached(cs) = &entry.slot else {
            return None;
        };
        if !cs.can_satisfy(interest, now) {
            return None;
        }
        let id = CsId {
            slot: idx,
            generation: entry.generation,
        };
        self.lru.move_to_back(idx);
        self.cs_counters.n_hits += 1;
        self.pit_counters.n_cs_match += 1;
        trace!("CS hit {}", interest.name);
        Some(id)
    }

    fn next_token(&mut self) -> PitToken {
        loop {
            self.last_token = self.last_token.wrapping_add(1) & PitToken::MASK;
            if self.last_token != 0 && !self.tokens.contains_key(&self.last_token) {
                return PitToken::new(self.last_token);
            }
        }
    }

    fn evict_lru(&mut self) -> bool {
        let Some(idx) = self.lru.front() else {
            return false;
        };
        if let Some(name) = self.entries[idx as usize].slot.name() {
            trace!("CS evict {}", name);
        }
        self.release(idx);
        self.cs_counters.n_evicted += 1;
        true
    }

    fn allocate(&mut self, hash: u64, slot: Slot) -> Result<u32> {
        if self.len >= self.config.capacity && !self.evict_lru() {
            warn!("PCCT full at {} entries", self.config.capacity);
            return Err(Error::TableFull {
                capacity: self.config.capacity,
            });
        }

        let bucket = self.bucket_of(hash);
        let next = self.buckets[bucket];
        let idx = match self.free {
            Some(idx) => {
                let entry = &mut self.entries[idx as usize];
                self.free = entry.next;
                entry.hash = hash;
                entry.next = next;
                entry.slot = slot;
                idx
            }
            None => {
                let idx = self.entries.len() as u32;
                self.entries.push(PccEntry {
                    hash,
                    generation: 0,
                    next,
                    slot,
                });
                idx
            }
        };
        self.buckets[bucket] = Some(idx);
        self.len += 1;
        Ok(idx)
    }

    // Unlinks the slot, bumps its generation and drops whatever it held
    fn release(&mut self, idx: u32) {
        let bucket = self.bucket_of(self.entries[idx as usize].hash);
        let next = self.entries[idx as usize].next;
        if self.buckets[bucket] == Some(idx) {
            self.buckets[bucket] = next;
        } else {
            let mut cur = self.buckets[bucket];
            while let Some(i) = cur {
                let entry = &mut self.entries[i as usize];
                if entry.next == Some(idx) {
                    entry.next = next;
                    break;
                }
                cur = entry.next;
            }
        }

        let entry = &mut self.entries[idx as usize];
        let slot = mem::replace(&mut entry.slot, Slot::Empty);
        entry.generation = entry.generation.wrapping_add(1);
        entry.next = self.free;
        self.free = Some(idx);
        self.len -= 1;

        match slot {
            Slot::Pending(pit) => {
                self.tokens.remove(&pit.token().get());
                let name = pit.name();
                if name.has_digest_component() {
                    let bare = name.compute_prefix_hash(name.len() - 1);
                    if let Some(count) = self.digest_index.get_mut(&bare) {
                        *count -= 1;
                        if *count == 0 {
                            self.digest_index.remove(&bare);
                        }
                    }
                }
                self.pit_counters.n_entries -= 1;
                self.compact_timeouts();
            }
            Slot::Cached(_) => {
                self.lru.remove(idx);
                self.cs_counters.n_entries -= 1;
            }
            Slot::Empty => {}
        }
    }
}

impl Default for Pcct {
    fn default() -> Self {
        Self::new(PcctConfig::default())
    }
}
