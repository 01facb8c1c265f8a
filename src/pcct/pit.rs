use std::sync::{Arc, Weak};

use crate::{
    clock::Timestamp,
    fib::FibEntry,
    name::Name,
    packet::{FaceId, NackReason, PitToken},
};

// A pending copy of the Interest received from one downstream face
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InRecord {
    pub face: FaceId,
    pub nonce: Option<u32>,
    pub expiry: Timestamp,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    // Token the downstream attached, to be echoed on the reply
    pub token: Option<PitToken>,
}

// The latest copy of the Interest sent to one upstream face
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutRecord {
    pub face: FaceId,
    pub nonce: u32,
    pub last_sent: Timestamp,
    pub nack: Option<NackReason>,
}

pub struct PitEntry {
    name: Name<'static>,
    in_records: Vec<InRecord>,
    out_records: Vec<OutRecord>,
    fib_entry: Weak<FibEntry>,
    expiry: Timestamp,
    token: PitToken,
}

impl PitEntry {
    pub(super) fn new(name: Name<'static>, token: PitToken, fib_entry: Option<&Arc<FibEntry>>) -> Self {
        Self {
            name,
            in_records: Vec::new(),
            out_records: Vec::new(),
            fib_entry: fib_entry.map(Arc::downgrade).unwrap_or_default(),
            expiry: Timestamp::default(),
            token,
        }
    }

    pub fn name(&self) -> &Name<'static> {
        &self.name
    }

    // True if any aggregated Interest allowed prefix matching
    pub fn can_be_prefix(&self) -> bool {
        self.in_records.iter().any(|r| r.can_be_prefix)
    }

    pub fn token(&self) -> PitToken {
        self.token
    }

    // Latest expiry among the in-records
    pub fn expiry(&self) -> Timestamp {
        self.expiry
    }

    pub fn in_records(&self) -> &[InRecord] {
        &self.in_records
    }

    pub fn out_records(&self) -> &[OutRecord] {
        &self.out_records
    }

    // The FIB entry this was matched against, if it has not been replaced or erased since
    pub fn fib_entry(&self) -> Option<Arc<FibEntry>> {
        self.fib_entry.upgrade()
    }

    pub fn set_fib_entry(&mut self, fib_entry: &Arc<FibEntry>) {
        self.fib_entry = Arc::downgrade(fib_entry);
    }

    // In-records that have not expired yet
    pub fn downstreams(&self, now: Timestamp) -> impl Iterator<Item = &InRecord> {
        self.in_records.iter().filter(move |r| r.expiry > now)
    }

    // Whether Data with the given name answers the Interest behind the record.
    // Data longer than the entry name only answers Interests that allowed prefix matching.
    pub fn answers(&self, record: &InRecord, data_name: &Name<'_>) -> bool {
        record.can_be_prefix || self.name.has_digest_component() || self.name == *data_name
    }

    // Face of another downstream that already sent this nonce, which indicates a loop
    pub fn find_duplicate_nonce(&self, nonce: u32, face: FaceId) -> Option<FaceId> {
        self.in_records
            .iter()
            .find(|r| r.face != face && r.nonce == Some(nonce))
            .map(|r| r.face)
    }

    // Adds or refreshes the in-record of a face. When the entry already holds the maximum
    //  number of records, the one expiring first makes room.
    pub(super) fn insert_in_record(&mut self, record: InRecord, max_records: usize) {
        if let Some(existing) = self.in_records.iter_mut().find(|r| r.face == record.face) {
            *existing = record;
        } else if self.in_records.len() < max_records.max(1) {
            self.in_records.push(record);
        } else if let Some(earliest) = self.in_records.iter_mut().min_by_key(|r| r.expiry) {
            *earliest = record;
        }
        self.update_expiry();
    }

    // Drops the in-records the Data answers. Returns true if some are left waiting.
    pub(super) fn remove_answered(&mut self, data_name: &Name<'_>) -> bool {
        if self.name.has_digest_component() || self.name == *data_name {
            self.in_records.clear();
        } else {
            self.in_records.retain(|r| !r.can_be_prefix);
        }
        self.update_expiry();
        !self.in_records.is_empty()
    }

    fn update_expiry(&mut self) {
        self.expiry = self
            .in_records
            .iter()
            .map(|r| r.expiry)
            .max()
            .unwrap_or_default();
    }

    pub fn insert_out_record(&mut self, face: FaceId, nonce: u32, now: Timestamp) {
        let record = OutRecord {
            face,
            nonce,
            last_sent: now,
            nack: None,
        };
        match self.out_records.iter_mut().find(|r| r.face == face) {
            Some(existing) => *existing = record,
            None => self.out_records.push(record),
        }
    }

    pub fn has_out_record_nonce(&self, nonce: u32) -> bool {
        self.out_records.iter().any(|r| r.nonce == nonce)
    }

    // Marks the out-record of the face as nacked if the nonce matches what was sent there
    pub fn record_nack(&mut self, face: FaceId, nonce: u32, reason: NackReason) -> bool {
        match self
            .out_records
            .iter_mut()
            .find(|r| r.face == face && r.nonce == nonce)
        {
            Some(record) => {
                record.nack = Some(reason);
                true
            }
            None => false,
        }
    }

    pub fn all_out_records_nacked(&self) -> bool {
        !self.out_records.is_empty() && self.out_records.iter().all(|r| r.nack.is_some())
    }

    // Least severe reason among the nacked out-records
    pub fn least_severe_nack(&self) -> Option<NackReason> {
        self.out_records
            .iter()
            .filter_map(|r| r.nack)
            .reduce(NackReason::min)
    }
}
