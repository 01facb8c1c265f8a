use log::trace;

use crate::{
    clock::{Clock, Timestamp},
    fib::FibReader,
    hash::{Hasher, Sha256Digest},
    packet::{Data, FaceId, Interest, Nack, NackReason, PitToken},
    pcct::{CsId, InRecord, InsertResult, Pcct, PitId},
};

// Aggregated Interests are only sent upstream again after this long
const RETRANSMISSION_PERIOD_MS: u64 = 1000; // 1 sec

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwarderConfig {
    // Applied to Interests that arrive without a HopLimit
    pub default_hop_limit: Option<u8>,
    // Answer looping Interests with a Duplicate Nack instead of dropping them silently
    pub nack_loops: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            default_hop_limit: None,
            nack_loops: true,
        }
    }
}

// Where a reply goes, and the token to echo back to that face
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Downstream {
    pub face: FaceId,
    pub token: Option<PitToken>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterestAction<'a> {
    // Cached Data in wire form, to be sent back on the ingress face
    ReplyData(Vec<u8>),
    Nack(NackReason),
    Drop,
    // Send `interest` to each face, it carries the PIT token upstream replies will echo
    Forward {
        nexthops: Vec<FaceId>,
        interest: Interest<'a>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataAction {
    Reply(Vec<Downstream>),
    Drop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NackAction {
    Reply {
        reason: NackReason,
        downstreams: Vec<Downstream>,
    },
    // Other upstreams may still answer
    Wait,
    Drop,
}

// Runs each packet to completion against the tables and says what to send where.
// Sending is left to the caller.
pub struct Forwarder<C, H>
where
    C: Clock,
    H: Hasher<Digest = Sha256Digest>,
{
    fib: FibReader,
    pcct: Pcct,
    clock: C,
    hasher: H,
    config: ForwarderConfig,
    next_nonce: u32,
    events: u32,
}

impl<C, H> Forwarder<C, H>
where
    C: Clock,
    H: Hasher<Digest = Sha256Digest>,
{
    pub fn new(fib: FibReader, pcct: Pcct, clock: C, hasher: H, config: ForwarderConfig) -> Self {
        Self {
            fib,
            pcct,
            clock,
            hasher,
            config,
            next_nonce: 5318,
            events: 0,
        }
    }

    pub fn pcct(&self) -> &Pcct {
        &self.pcct
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn handle_interest<'a>(&mut self, interest: &Interest<'a>, ingress: FaceId) -> InterestAction<'a> {
        self.events = self.events.wrapping_add(1);

        // Interest must have a non-empty name
        if interest.name.is_empty() {
            return InterestAction::Drop;
        }

        // We want to drop packets if they have hop limit of 0,
        //  otherwise we want to decrement it. If the resulting
        //  hop limit is 0 we will only try to satisfy this from
        //  the content store, but not forward.
        // If no hop limit is present we always accept the interest.
        let hop_limit = match interest.hop_limit.or(self.config.default_hop_limit) {
            Some(0) => return InterestAction::Drop,
            Some(hop) => Some(hop - 1),
            None => None,
        };

        let now = self.clock.now();

        if hop_limit == Some(0) {
            return match self.pcct.lookup_cs(interest, now) {
                Some(id) => self.reply_from_cs(id),
                None => InterestAction::Drop,
            };
        }

        let fib_entry = self.fib.lookup(&interest.name);
        let (id, is_new) = match self.pcct.insert(interest, ingress, fib_entry.as_ref(), now) {
            Ok(InsertResult::Pit { id, is_new }) => (id, is_new),
            Ok(InsertResult::Cs(id)) => return self.reply_from_cs(id),
            Ok(InsertResult::DuplicateNonce { .. }) => {
                // The interest likely looped
                return if self.config.nack_loops {
                    InterestAction::Nack(NackReason::Duplicate)
                } else {
                    InterestAction::Drop
                };
            }
            // The table is full, which has been logged already
            Err(_) => return InterestAction::Drop,
        };

        // The PIT already has others applying, so we only forward if it was not too long ago
        if !is_new && !self.due_for_retransmission(id, now) {
            trace!("suppress {} from {}", interest.name, ingress);
            return InterestAction::Drop;
        }

        // The strategy we use is basically multicast to all relevant faces, nothing complex.
        // Never forward back to the same face.
        let nexthops: Vec<FaceId> = fib_entry
            .iter()
            .flat_map(|e| e.nexthops())
            .copied()
            .filter(|face| *face != ingress)
            .collect();
        if nexthops.is_empty() {
            if is_new {
                self.pcct.erase(id);
            }
            trace!("no route for {}", interest.name);
            return InterestAction::Nack(NackReason::NoRoute);
        }

        let nonce = match interest.nonce {
            Some(nonce) => nonce,
            None => self.generate_nonce(),
        };
        let Some(pit) = self.pcct.pit_entry_mut(id) else {
            return InterestAction::Drop;
        };
        for face in &nexthops {
            pit.insert_out_record(*face, nonce, now);
        }

        let mut outgoing = interest.clone();
        outgoing.nonce = Some(nonce);
        outgoing.hop_limit = hop_limit;
        outgoing.pit_token = Some(pit.token());
        trace!("forward {} from {} to {:?}", interest.name, ingress, nexthops);

        InterestAction::Forward {
            nexthops,
            interest: outgoing,
        }
    }

    pub fn handle_data(&mut self, data: &Data<'_>, ingress: FaceId) -> DataAction {
        let now = self.clock.now();

        // Hashing the whole packet is only worth it if someone asked by digest
        let mut digest = None;
        let mut found = self.pcct.find_by_data(data, None);
        if found.need_digest() {
            let computed = data.compute_digest(&mut self.hasher);
            found = self.pcct.find_by_data(data, Some(&computed));
            digest = Some(computed);
        }

        // For security we drop unsolicited data
        if found.is_empty() {
            trace!("unsolicited {} from {}", data.name, ingress);
            return DataAction::Drop;
        }

        // Every requesting face other than the one we got it from, as long as
        //  its Interest accepts this name
        let mut downstreams = Vec::new();
        for id in found.entries() {
            if let Some(pit) = self.pcct.pit_entry(id) {
                let answered = pit.downstreams(now).filter(|r| pit.answers(r, &data.name));
                collect_downstreams(answered, Some(ingress), &mut downstreams);
            }
        }

        self.pcct.insert_data(data, &found, digest.as_ref(), now);

        if downstreams.is_empty() {
            DataAction::Drop
        } else {
            DataAction::Reply(downstreams)
        }
    }

    pub fn handle_nack(&mut self, nack: &Nack<'_>, ingress: FaceId) -> NackAction {
        let now = self.clock.now();
        let (Some(id), Some(nonce)) = (self.pcct.find_by_nack(nack), nack.interest.nonce) else {
            return NackAction::Drop;
        };
        let Some(pit) = self.pcct.pit_entry_mut(id) else {
            return NackAction::Drop;
        };
        if !pit.record_nack(ingress, nonce, nack.reason) {
            return NackAction::Drop;
        }
        if !pit.all_out_records_nacked() {
            return NackAction::Wait;
        }

        let reason = pit.least_severe_nack().unwrap_or(nack.reason);
        let mut downstreams = Vec::new();
        collect_downstreams(pit.downstreams(now), None, &mut downstreams);
        self.pcct.erase(id);
        trace!("nack {} {} to {} downstreams", nack.interest.name, reason, downstreams.len());

        NackAction::Reply {
            reason,
            downstreams,
        }
    }

    // Expires pending Interests. Returns how many were dropped.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        self.pcct.trigger_timeout_expiry(now)
    }

    fn reply_from_cs(&self, id: CsId) -> InterestAction<'static> {
        match self.pcct.cs_entry(id) {
            Some(cs) => InterestAction::ReplyData(cs.wire().to_vec()),
            None => InterestAction::Drop,
        }
    }

    fn due_for_retransmission(&self, id: PitId, now: Timestamp) -> bool {
        let Some(pit) = self.pcct.pit_entry(id) else {
            return false;
        };
        match pit.out_records().iter().map(|r| r.last_sent).max() {
            Some(last_sent) => now >= last_sent.adding(RETRANSMISSION_PERIOD_MS),
            None => true,
        }
    }

    fn generate_nonce(&mut self) -> u32 {
        // djb2 hash using a function of the current table state as key
        let key = (self.pcct.len() as u32).wrapping_add(1).wrapping_mul(7) ^ self.events;
        self.next_nonce = self.next_nonce.wrapping_mul(33) ^ key;
        self.next_nonce
    }
}

fn collect_downstreams<'r>(
    records: impl Iterator<Item = &'r InRecord>,
    skip: Option<FaceId>,
    out: &mut Vec<Downstream>,
) {
    for record in records {
        if Some(record.face) == skip || out.iter().any(|d| d.face == record.face) {
            continue;
        }
        out.push(Downstream {
            face: record.face,
            token: record.token,
        });
    }
}
