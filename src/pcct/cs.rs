use crate::{
    clock::Timestamp,
    hash::Sha256Digest,
    name::Name,
    packet::{Data, Interest},
    tlv::Encode,
};

pub struct CsEntry {
    name: Name<'static>,
    wire: Box<[u8]>,
    fresh_until: Timestamp,
    // Only known once some consumer asked for it
    digest: Option<Sha256Digest>,
    arrival: Timestamp,
}

impl CsEntry {
    pub(super) fn new(data: &Data<'_>, digest: Option<&Sha256Digest>, now: Timestamp) -> Self {
        let wire: Box<[u8]> = match data.wire {
            Some(wire) => wire.into(),
            None => data.to_wire().into_boxed_slice(),
        };
        Self {
            name: data.name.clone().into_owned(),
            wire,
            fresh_until: now.adding(data.freshness_period.unwrap_or(0)),
            digest: digest.copied(),
            arrival: now,
        }
    }

    pub fn name(&self) -> &Name<'static> {
        &self.name
    }

    // The cached Data in wire form
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub fn digest(&self) -> Option<&Sha256Digest> {
        self.digest.as_ref()
    }

    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    pub fn fresh_until(&self) -> Timestamp {
        self.fresh_until
    }

    pub fn is_fresh(&self, now: Timestamp) -> bool {
        now < self.fresh_until
    }

    // Whether this Data answers the Interest at the given time.
    // An Interest carrying an implicit digest is only answered once the digest is known.
    pub fn can_satisfy(&self, interest: &Interest<'_>, now: Timestamp) -> bool {
        if interest.must_be_fresh && !self.is_fresh(now) {
            return false;
        }
        if interest.name.has_digest_component() {
            let (Some(digest), Some(component)) = (&self.digest, interest.name.last_component())
            else {
                return false;
            };
            return component.bytes == &digest.0[..]
                && interest.name.get_prefix(interest.name.len() - 1) == self.name;
        }
        interest.name == self.name
    }
}

#[derive(Clone, Copy, Default, Debug)]
struct Links {
    prev: Option<u32>,
    next: Option<u32>,
}

// Least recently used order over the cached slots. The front is evicted first.
#[derive(Default)]
pub(super) struct LruList {
    links: Vec<Links>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl LruList {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn front(&self) -> Option<u32> {
        self.head
    }

    pub fn push_back(&mut self, slot: u32) {
        let idx = slot as usize;
        if self.links.len() <= idx {
            self.links.resize(idx + 1, Links::default());
        }
        self.links[idx] = Links {
            prev: self.tail,
            next: None,
        };
        match self.tail {
            Some(tail) => self.links[tail as usize].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    // The slot must currently be in the list
    pub fn remove(&mut self, slot: u32) {
        let Links { prev, next } = self.links[slot as usize];
        match prev {
            Some(prev) => self.links[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next as usize].prev = prev,
            None => self.tail = prev,
        }
        self.links[slot as usize] = Links::default();
        self.len -= 1;
    }

    pub fn move_to_back(&mut self, slot: u32) {
        if self.tail == Some(slot) {
            return;
        }
        self.remove(slot);
        self.push_back(slot);
    }
}
