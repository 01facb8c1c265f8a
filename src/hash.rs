use core::ops::BitXor;

use crate::tlv::Write;

// Cryptographic hashing is pluggable, so that platforms can bring their own implementation.
pub trait Hasher {
    type Digest;
    fn reset(&mut self);
    fn update(&mut self, input: &[u8]);
    fn finalize_reset(&mut self) -> Self::Digest;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Digest(pub [u8; 32]);

// Lets an encoder feed its output straight into a hasher
pub(crate) struct DigestWriter<'a, H: Hasher> {
    pub hasher: &'a mut H,
}

impl<'a, H: Hasher> Write for DigestWriter<'a, H> {
    type Error = core::convert::Infallible;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.hasher.update(bytes);
        Ok(())
    }
}

#[cfg(feature = "sha2")]
pub mod sha {
    use sha2::{Digest, Sha256};

    use super::{Hasher, Sha256Digest};

    pub struct Sha256Hasher {
        inner: Sha256,
    }

    impl Sha256Hasher {
        pub fn new() -> Self {
            Self {
                inner: Sha256::new(),
            }
        }
    }

    impl Default for Sha256Hasher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Hasher for Sha256Hasher {
        type Digest = Sha256Digest;

        fn reset(&mut self) {
            Digest::reset(&mut self.inner);
        }

        fn update(&mut self, input: &[u8]) {
            Digest::update(&mut self.inner, input);
        }

        fn finalize_reset(&mut self) -> Self::Digest {
            Sha256Digest(self.inner.finalize_reset().into())
        }
    }
}

// Non-cryptographic hash over name bytes, consumed 8 bytes at a time.
// The state can be finished at any point without being consumed, which is
//  how all prefix hashes of a name are produced in a single pass.
#[derive(Copy, Clone)]
pub struct PrefixHasher {
    hash: u64,
    tail: [u8; 8],
    tail_len: usize,
    total: u64,
}

impl PrefixHasher {
    const SEED: u64 = 0x243f6a8885a308d3;

    pub fn new() -> Self {
        Self {
            hash: Self::SEED,
            tail: [0; 8],
            tail_len: 0,
            total: 0,
        }
    }

    pub fn update(&mut self, mut bytes: &[u8]) {
        self.total += bytes.len() as u64;

        if self.tail_len > 0 {
            let take = (8 - self.tail_len).min(bytes.len());
            self.tail[self.tail_len..self.tail_len + take].copy_from_slice(&bytes[..take]);
            self.tail_len += take;
            bytes = &bytes[take..];
            if self.tail_len < 8 {
                return;
            }
            Self::add_to_hash(&mut self.hash, u64::from_be_bytes(self.tail));
            self.tail_len = 0;
        }

        let mut words = bytes.chunks_exact(8);
        for word in &mut words {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(word);
            Self::add_to_hash(&mut self.hash, u64::from_be_bytes(arr));
        }
        let rest = words.remainder();
        self.tail[..rest.len()].copy_from_slice(rest);
        self.tail_len = rest.len();
    }

    pub fn finish(&self) -> u64 {
        let mut hash = self.hash;
        if self.tail_len > 0 {
            let mut arr = [0u8; 8];
            arr[..self.tail_len].copy_from_slice(&self.tail[..self.tail_len]);
            Self::add_to_hash(&mut hash, u64::from_be_bytes(arr));
        }
        Self::add_to_hash(&mut hash, self.total);
        fmix64(hash)
    }

    #[inline]
    fn add_to_hash(hash: &mut u64, i: u64) {
        *hash = hash
            .rotate_left(5)
            .bitxor(i)
            .wrapping_mul(0x517cc1b727220a95);
    }
}

impl Default for PrefixHasher {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = PrefixHasher::new();
    hasher.update(bytes);
    hasher.finish()
}

// Final avalanche so that the low bits are usable as a bucket index
#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_oneshot() {
        let bytes: Vec<u8> = (0u8..40).collect();
        for split in 0..bytes.len() {
            let mut hasher = PrefixHasher::new();
            hasher.update(&bytes[..split]);
            assert_eq!(hasher.finish(), hash_bytes(&bytes[..split]));
            hasher.update(&bytes[split..]);
            assert_eq!(hasher.finish(), hash_bytes(&bytes));
        }
    }

    #[test]
    fn test_length_is_mixed() {
        assert_ne!(hash_bytes(&[]), hash_bytes(&[0]));
        assert_ne!(hash_bytes(&[0]), hash_bytes(&[0, 0]));
        assert_ne!(hash_bytes(&[1, 2, 3]), hash_bytes(&[1, 2, 3, 0]));
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_sha256() {
        let mut hasher = sha::Sha256Hasher::new();
        hasher.update(b"abc");
        let digest = hasher.finalize_reset();
        assert_eq!(digest.0[..4], [0xba, 0x78, 0x16, 0xbf]);
        assert_eq!(digest.0[28..], [0xf2, 0x00, 0x15, 0xad]);

        let mut writer = DigestWriter {
            hasher: &mut hasher,
        };
        let _ = writer.write(b"abc");
        assert_eq!(hasher.finalize_reset(), digest);
    }
}
