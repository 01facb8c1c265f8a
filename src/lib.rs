//#![warn(missing_docs)]

pub mod clock;

pub mod error;

pub mod hash;

pub mod tlv;

pub mod name;

pub mod packet;

pub mod fib;

pub mod pcct;

pub mod forwarder;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use fib::{Fib, FibEntry, FibReader, SharedFib};
pub use forwarder::{Forwarder, ForwarderConfig};
pub use name::{Name, NameCompare, NameComponent};
pub use packet::{Data, FaceId, Interest, Nack, NackReason, PitToken};
pub use pcct::{Pcct, PcctConfig};
