use core::fmt;

use crate::{
    error::{Error, Result},
    name::Name,
    packet::FaceId,
};

// Longest TLV-VALUE of a FIB entry name
pub const MAX_NAME_LENGTH: usize = 494;

// Most nexthops a single FIB entry may carry
pub const MAX_NEXTHOPS: usize = 8;

#[derive(Clone)]
pub struct FibEntry {
    name: Name<'static>,
    nexthops: Vec<FaceId>,
    strategy: u32,
    seq_num: u32,
}

impl FibEntry {
    // An entry for the root prefix with no nexthops
    pub fn new() -> Self {
        Self {
            name: Name::new(),
            nexthops: Vec::new(),
            strategy: 0,
            seq_num: 0,
        }
    }

    pub fn with_nexthops(name: &Name<'_>, nexthops: &[FaceId]) -> Result<Self> {
        let mut entry = Self::new();
        entry.set_name(name)?;
        entry.set_nexthops(nexthops)?;
        Ok(entry)
    }

    pub fn name(&self) -> &Name<'static> {
        &self.name
    }

    // On failure the entry is left unchanged
    pub fn set_name(&mut self, name: &Name<'_>) -> Result<()> {
        if name.size() > MAX_NAME_LENGTH {
            return Err(Error::Length {
                what: "FIB entry name",
                actual: name.size(),
                max: MAX_NAME_LENGTH,
            });
        }
        self.name = name.clone().into_owned();
        Ok(())
    }

    pub fn nexthops(&self) -> &[FaceId] {
        &self.nexthops
    }

    // Keeps the given order and drops repeated faces. On failure the entry is left unchanged.
    pub fn set_nexthops(&mut self, nexthops: &[FaceId]) -> Result<()> {
        let mut deduped: Vec<FaceId> = Vec::with_capacity(nexthops.len());
        for face in nexthops {
            if !deduped.contains(face) {
                deduped.push(*face);
            }
        }
        if deduped.len() > MAX_NEXTHOPS {
            return Err(Error::Length {
                what: "nexthop list",
                actual: deduped.len(),
                max: MAX_NEXTHOPS,
            });
        }
        self.nexthops = deduped;
        Ok(())
    }

    pub fn has_nexthop(&self, face: FaceId) -> bool {
        self.nexthops.contains(&face)
    }

    pub fn strategy(&self) -> u32 {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: u32) {
        self.strategy = strategy;
    }

    // Incremented by the table every time the entry under this name is replaced
    pub fn seq_num(&self) -> u32 {
        self.seq_num
    }

    pub(super) fn set_seq_num(&mut self, seq_num: u32) {
        self.seq_num = seq_num;
    }
}

impl Default for FibEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibEntry")
            .field("name", &self.name.to_string())
            .field("nexthops", &self.nexthops)
            .field("strategy", &self.strategy)
            .field("seq_num", &self.seq_num)
            .finish()
    }
}
