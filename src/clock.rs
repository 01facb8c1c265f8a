use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub ms_since_1970: u64,
}

impl Timestamp {
    pub const fn from_ms(ms_since_1970: u64) -> Self {
        Self { ms_since_1970 }
    }

    pub fn adding(&self, ms: u64) -> Self {
        Self {
            ms_since_1970: self.ms_since_1970.saturating_add(ms),
        }
    }

    pub fn removing(&self, ms: u64) -> Self {
        Self {
            ms_since_1970: self.ms_since_1970.saturating_sub(ms),
        }
    }

    pub fn difference(&self, other: &Self) -> Option<u64> {
        self.ms_since_1970.checked_sub(other.ms_since_1970)
    }

    pub fn min(&self, other: Self) -> Self {
        Timestamp {
            ms_since_1970: self.ms_since_1970.min(other.ms_since_1970),
        }
    }

    pub fn max(&self, other: Self) -> Self {
        Timestamp {
            ms_since_1970: self.ms_since_1970.max(other.ms_since_1970),
        }
    }
}

pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

pub struct MonotonicClock {
    reference: Instant,
    reference_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let reference_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or(u64::MAX);
        let reference = Instant::now();
        Self {
            reference,
            reference_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        let millis = u64::try_from(Instant::now().duration_since(self.reference).as_millis())
            .unwrap_or(u64::MAX);

        Timestamp {
            ms_since_1970: self.reference_ms.saturating_add(millis),
        }
    }
}

// A clock that only moves when told to. Useful for simulations and for
//  driving timeouts deterministically.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Timestamp,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: start }
    }

    pub fn advance(&mut self, ms: u64) {
        self.now = self.now.adding(ms);
    }

    pub fn set(&mut self, now: Timestamp) {
        self.now = now;
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Timestamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_ms(1000);
        assert_eq!(t.adding(500).ms_since_1970, 1500);
        assert_eq!(t.removing(2000).ms_since_1970, 0);
        assert_eq!(Timestamp::from_ms(u64::MAX).adding(1).ms_since_1970, u64::MAX);
        assert_eq!(t.adding(10).difference(&t), Some(10));
        assert_eq!(t.difference(&t.adding(10)), None);
        assert_eq!(t.min(t.adding(1)), t);
        assert_eq!(t.max(t.adding(1)), t.adding(1));
    }

    #[test]
    fn test_clocks() {
        let mut clock = ManualClock::new(Timestamp::from_ms(10));
        assert_eq!(clock.now().ms_since_1970, 10);
        clock.advance(5);
        assert_eq!(clock.now().ms_since_1970, 15);

        let mut mono = MonotonicClock::new();
        let a = mono.now();
        let b = mono.now();
        assert!(b >= a);
    }
}
