use core::{cmp::Ordering, fmt, num::NonZeroU16, str::FromStr};
use std::borrow::Cow;

use crate::{
    error::{Error, Result},
    hash::PrefixHasher,
    tlv::{write_varnum, DecodeError, Encode, TlvEncode, TlvIter, Write, TLV},
};

// Longest TLV-VALUE accepted for a name
pub const MAX_NAME_LENGTH: usize = 2048;

// Component boundaries of the first few components are kept inline,
//  the rest are found by walking the TLVs.
const CACHED_COMPONENTS: usize = 17;

// A name is a sequence of TLV-encoded components. It either borrows the bytes
//  of the packet it came from or owns a copy (for entries that outlive the packet).
#[derive(Clone)]
pub struct Name<'a> {
    value: Cow<'a, [u8]>,
    component_count: usize,
    has_digest: bool,
    component_ends: [u16; CACHED_COMPONENTS],
}

#[repr(i8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NameCompare {
    // Left is smaller at some component
    Lt = -2,
    // Left is a proper prefix of right
    LPrefix = -1,
    Equal = 0,
    // Right is a proper prefix of left
    RPrefix = 1,
    Gt = 2,
}

impl NameCompare {
    pub fn reverse(self) -> Self {
        match self {
            NameCompare::Lt => NameCompare::Gt,
            NameCompare::LPrefix => NameCompare::RPrefix,
            NameCompare::Equal => NameCompare::Equal,
            NameCompare::RPrefix => NameCompare::LPrefix,
            NameCompare::Gt => NameCompare::Lt,
        }
    }

    pub fn to_ordering(self) -> Ordering {
        match self {
            NameCompare::Lt | NameCompare::LPrefix => Ordering::Less,
            NameCompare::Equal => Ordering::Equal,
            NameCompare::RPrefix | NameCompare::Gt => Ordering::Greater,
        }
    }
}

impl<'a> Name<'a> {
    pub fn new() -> Self {
        Self {
            value: Cow::Borrowed(&[]),
            component_count: 0,
            has_digest: false,
            component_ends: [0; CACHED_COMPONENTS],
        }
    }

    // Parses a complete Name TLV, including its type and length
    pub fn decode(wire: &'a [u8]) -> Result<Self> {
        let tlv = TLV::try_decode_exact(wire, Self::TLV_TYPE)?;
        Self::from_value(tlv.val)
    }

    // Parses the TLV-VALUE of a Name, i.e. the concatenated components
    pub fn from_value(value: &'a [u8]) -> Result<Self> {
        Self::from_cow(Cow::Borrowed(value))
    }

    pub fn from_vec(value: Vec<u8>) -> Result<Name<'static>> {
        Name::from_cow(Cow::Owned(value))
    }

    fn from_cow(value: Cow<'a, [u8]>) -> Result<Self> {
        if value.len() > MAX_NAME_LENGTH {
            return Err(Error::Length {
                what: "name",
                actual: value.len(),
                max: MAX_NAME_LENGTH,
            });
        }

        let mut component_count = 0;
        let mut has_digest = false;
        let mut component_ends = [0u16; CACHED_COMPONENTS];
        for item in TlvIter::new(&value) {
            let (tlv, _, end) = item?;
            let component = NameComponent::try_from(tlv)?;
            if component_count < CACHED_COMPONENTS {
                component_ends[component_count] = end as u16;
            }
            component_count += 1;
            has_digest = component.typ.get() == NameComponent::TYPE_IMPLICIT_SHA256;
        }

        Ok(Self {
            value,
            component_count,
            has_digest,
            component_ends,
        })
    }

    pub fn from_uri(uri: &str) -> Result<Name<'static>> {
        let uri = uri.strip_prefix("ndn:").unwrap_or(uri);
        let uri = uri.strip_prefix('/').unwrap_or(uri);

        let mut value = Vec::new();
        if !uri.is_empty() {
            for (i, token) in uri.split('/').enumerate() {
                let component = component_from_uri(token).map_err(|err| {
                    Error::Encoding(format!("component {} '{}': {}", i, token, err))
                })?;
                push_component(&mut value, NameComponent::TYPE_GENERIC, &component);
            }
        }
        Name::from_vec(value)
    }

    pub fn into_owned(self) -> Name<'static> {
        Name {
            value: Cow::Owned(self.value.into_owned()),
            component_count: self.component_count,
            has_digest: self.has_digest,
            component_ends: self.component_ends,
        }
    }

    // Number of components
    pub fn len(&self) -> usize {
        self.component_count
    }

    pub fn is_empty(&self) -> bool {
        self.component_count == 0
    }

    // Length of the TLV-VALUE in bytes
    pub fn size(&self) -> usize {
        self.value.len()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    // Whether the final component is an implicit SHA-256 digest
    pub fn has_digest_component(&self) -> bool {
        self.has_digest
    }

    // Byte length of the first i components. Saturates at the full size.
    pub fn prefix_size(&self, i: usize) -> usize {
        if i == 0 {
            0
        } else if i >= self.component_count {
            self.value.len()
        } else if i <= CACHED_COMPONENTS {
            self.component_ends[i - 1] as usize
        } else {
            let mut offset = self.component_ends[CACHED_COMPONENTS - 1] as usize;
            for _ in CACHED_COMPONENTS..i {
                match TLV::try_decode(&self.value[offset..]) {
                    Ok((_, len)) => offset += len,
                    Err(_) => return self.value.len(),
                }
            }
            offset
        }
    }

    pub fn get_component(&self, i: usize) -> Option<NameComponent<'_>> {
        if i >= self.component_count {
            return None;
        }
        let (tlv, _) = TLV::try_decode(&self.value[self.prefix_size(i)..]).ok()?;
        NameComponent::try_from(tlv).ok()
    }

    pub fn components(&self) -> impl Iterator<Item = NameComponent<'_>> {
        TlvIter::new(&self.value)
            .filter_map(|item| item.ok())
            .filter_map(|(tlv, _, _)| NameComponent::try_from(tlv).ok())
    }

    pub fn last_component(&self) -> Option<NameComponent<'_>> {
        self.component_count
            .checked_sub(1)
            .and_then(|i| self.get_component(i))
    }

    // Borrowed view of the first i components
    pub fn get_prefix(&self, i: usize) -> Name<'_> {
        let i = i.min(self.component_count);
        let mut component_ends = [0u16; CACHED_COMPONENTS];
        let cached = i.min(CACHED_COMPONENTS);
        component_ends[..cached].copy_from_slice(&self.component_ends[..cached]);
        let has_digest = i > 0
            && self
                .get_component(i - 1)
                .map(|c| c.typ.get() == NameComponent::TYPE_IMPLICIT_SHA256)
                .unwrap_or(false);
        Name {
            value: Cow::Borrowed(&self.value[..self.prefix_size(i)]),
            component_count: i,
            has_digest,
            component_ends,
        }
    }

    pub fn is_prefix_of(&self, other: &Name<'_>) -> bool {
        matches!(
            self.compare(other),
            NameCompare::LPrefix | NameCompare::Equal
        )
    }

    // Full name formed by appending an implicit digest component
    pub fn append_digest(&self, digest: &[u8; 32]) -> Result<Name<'static>> {
        let mut value = Vec::with_capacity(self.value.len() + 34);
        value.extend_from_slice(&self.value);
        push_component(&mut value, NameComponent::TYPE_IMPLICIT_SHA256, digest);
        Name::from_vec(value)
    }

    // Hash of the first i components. Equal prefixes hash equally regardless
    //  of what follows, which is what longest prefix match relies on.
    pub fn compute_prefix_hash(&self, i: usize) -> u64 {
        let mut hasher = PrefixHasher::new();
        hasher.update(&self.value[..self.prefix_size(i)]);
        hasher.finish()
    }

    pub fn compute_hash(&self) -> u64 {
        self.compute_prefix_hash(self.component_count)
    }

    // Byte length and hash of all prefixes, from the empty one up to the full name, in one pass
    pub fn prefix_hashes(&self) -> PrefixHashes<'_> {
        PrefixHashes {
            iter: TlvIter::new(&self.value),
            value: &self.value,
            hasher: PrefixHasher::new(),
            started: false,
        }
    }

    pub fn compare(&self, other: &Name<'_>) -> NameCompare {
        let (l, r) = (self.value(), other.value());
        let n = l.len().min(r.len());
        match l[..n].cmp(&r[..n]) {
            Ordering::Less => NameCompare::Lt,
            Ordering::Greater => NameCompare::Gt,
            Ordering::Equal => match l.len().cmp(&r.len()) {
                Ordering::Less => NameCompare::LPrefix,
                Ordering::Equal => NameCompare::Equal,
                Ordering::Greater => NameCompare::RPrefix,
            },
        }
    }
}

impl<'a> Default for Name<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TlvEncode for Name<'a> {
    const TLV_TYPE: u32 = 7;

    fn inner_length(&self) -> usize {
        self.value.len()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> core::result::Result<(), W::Error> {
        writer.write(&self.value)
    }
}

impl<'a, 'b> PartialEq<Name<'b>> for Name<'a> {
    fn eq(&self, other: &Name<'b>) -> bool {
        self.value() == other.value()
    }
}

impl<'a> Eq for Name<'a> {}

impl<'a> PartialOrd for Name<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for Name<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other).to_ordering()
    }
}

impl<'a> core::hash::Hash for Name<'a> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.value().hash(state)
    }
}

impl<'a> fmt::Display for Name<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.component_count == 0 {
            return f.write_str("/");
        }
        for component in self.components() {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl<'a> fmt::Debug for Name<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl FromStr for Name<'static> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Name::from_uri(s)
    }
}

pub struct PrefixHashes<'a> {
    iter: TlvIter<'a>,
    value: &'a [u8],
    hasher: PrefixHasher,
    started: bool,
}

impl<'a> Iterator for PrefixHashes<'a> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some((0, self.hasher.finish()));
        }
        let (_, start, end) = self.iter.next()?.ok()?;
        self.hasher.update(&self.value[start..end]);
        Some((end, self.hasher.finish()))
    }
}

fn push_component(value: &mut Vec<u8>, typ: u16, bytes: &[u8]) {
    let _ = write_varnum(typ as u64, value);
    let _ = write_varnum(bytes.len() as u64, value);
    value.extend_from_slice(bytes);
}

// Decodes one URI token into a generic component value
fn component_from_uri(token: &str) -> core::result::Result<Vec<u8>, &'static str> {
    if token.contains('=') {
        return Err("typed component is not supported");
    }

    let bytes = token.as_bytes();
    if bytes.iter().all(|b| *b == b'.') {
        if bytes.len() < 3 {
            return Err("invalid URI component of less than three periods");
        }
        return Ok(bytes[3..].to_vec());
    }

    let mut value = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch == b'%' && i + 2 < bytes.len() {
            let hi = hex_value(bytes[i + 1]).ok_or("invalid percent encoding")?;
            let lo = hex_value(bytes[i + 2]).ok_or("invalid percent encoding")?;
            value.push(hi << 4 | lo);
            i += 3;
        } else {
            value.push(ch);
            i += 1;
        }
    }
    Ok(value)
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameComponent<'a> {
    pub typ: NonZeroU16,
    pub bytes: &'a [u8],
}

impl<'a> NameComponent<'a> {
    pub const TYPE_IMPLICIT_SHA256: u16 = 1;
    pub const TYPE_PARAMETERS_SHA256: u16 = 2;
    pub const TYPE_GENERIC: u16 = 8;

    pub fn new(typ: u16, bytes: &'a [u8]) -> Option<Self> {
        let typ = NonZeroU16::new(typ)?;
        Some(Self { typ, bytes })
    }

    pub fn is_digest(&self) -> bool {
        self.typ.get() == Self::TYPE_IMPLICIT_SHA256
    }
}

impl<'a> TryFrom<TLV<'a>> for NameComponent<'a> {
    type Error = DecodeError;

    fn try_from(tlv: TLV<'a>) -> core::result::Result<Self, Self::Error> {
        let typ: NonZeroU16 = tlv
            .typ
            .try_into()
            .map_err(|_| DecodeError::InvalidType)?;
        if typ.get() == Self::TYPE_IMPLICIT_SHA256 && tlv.val.len() != 32 {
            return Err(DecodeError::InvalidValue {
                typ: Self::TYPE_IMPLICIT_SHA256 as u32,
            });
        }
        Ok(Self {
            typ,
            bytes: tlv.val,
        })
    }
}

impl<'a> From<NameComponent<'a>> for TLV<'a> {
    fn from(value: NameComponent<'a>) -> Self {
        TLV {
            typ: value.typ.into(),
            val: value.bytes,
        }
    }
}

impl<'a> Encode for NameComponent<'a> {
    fn encoded_length(&self) -> usize {
        TLV::from(*self).encoded_length()
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> core::result::Result<(), W::Error> {
        write_varnum(self.typ.get() as u64, writer)?;
        write_varnum(self.bytes.len() as u64, writer)?;
        writer.write(self.bytes)
    }
}

impl<'a> fmt::Display for NameComponent<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ.get() {
            Self::TYPE_IMPLICIT_SHA256 => {
                f.write_str("sha256digest=")?;
                for b in self.bytes {
                    write!(f, "{:02x}", b)?;
                }
                return Ok(());
            }
            Self::TYPE_GENERIC => {}
            typ => write!(f, "{}=", typ)?,
        }

        for b in self.bytes {
            if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'_' | b'-') {
                write!(f, "{}", *b as char)?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        if self.bytes.iter().all(|b| *b == b'.') {
            f.write_str("...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hex;

    fn digest_bytes() -> [u8; 32] {
        let mut digest = [0u8; 32];
        for (i, b) in digest.iter_mut().enumerate() {
            *b = i as u8 * 7;
        }
        digest
    }

    #[test]
    fn test_decode() {
        let wire = hex("0700");
        let name = Name::decode(&wire).unwrap();
        assert_eq!(name.len(), 0);
        assert_eq!(name.size(), 0);
        assert!(!name.has_digest_component());
        assert_eq!(name.to_string(), "/");

        let wire = hex("0714 080141 080142 080100 0801FF 800141 0800 08012E");
        let name = Name::decode(&wire).unwrap();
        assert_eq!(name.len(), 7);
        assert_eq!(name.size(), 20);
        assert!(!name.has_digest_component());
        assert_eq!(name.to_string(), "/A/B/%00/%FF/128=A/.../....");
        assert_eq!(name.to_wire(), wire);

        let digest = digest_bytes();
        let mut wire = hex("0722 0120");
        wire.extend_from_slice(&digest);
        let name = Name::decode(&wire).unwrap();
        assert_eq!(name.len(), 1);
        assert!(name.has_digest_component());
        let expected: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(name.to_string(), format!("/sha256digest={}", expected));
        assert_eq!(name.to_string().len(), "/sha256digest=".len() + 64);

        let mut wire = hex("0763");
        for _ in 0..32 {
            wire.extend_from_slice(&hex("080141"));
        }
        wire.extend_from_slice(&hex("080142"));
        let name = Name::decode(&wire).unwrap();
        assert_eq!(name.len(), 33);
        assert!(!name.has_digest_component());
        assert_eq!(name.to_string(), format!("{}/B", "/A".repeat(32)));
        assert_eq!(name.get_component(32).unwrap().bytes, b"B");
        assert_eq!(name.get_component(20).unwrap().bytes, b"A");
        assert_eq!(name.prefix_size(20), 60);
        assert!(name.get_component(33).is_none());

        assert!(Name::decode(&[]).is_err());
        assert!(matches!(
            Name::decode(&hex("0200")),
            Err(Error::Decode(DecodeError::UnexpectedType { .. }))
        ));
        assert!(matches!(
            Name::decode(&hex("0704 0102 DDDD")),
            Err(Error::Decode(DecodeError::InvalidValue { typ: 1 }))
        ));
        assert!(Name::decode(&hex("0703 0801")).is_err());
    }

    #[test]
    fn test_too_long() {
        let mut value = Vec::new();
        while value.len() <= MAX_NAME_LENGTH {
            value.extend_from_slice(&hex("0803414243"));
        }
        assert!(matches!(
            Name::from_value(&value),
            Err(Error::Length { what: "name", .. })
        ));
    }

    #[test]
    fn test_prefix_size() {
        let wire = hex("0709 0800 080141 08024243");
        let name = Name::decode(&wire).unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.size(), 9);
        assert_eq!(name.prefix_size(0), 0);
        assert_eq!(name.prefix_size(1), 2);
        assert_eq!(name.prefix_size(2), 5);
        assert_eq!(name.prefix_size(3), 9);
        assert_eq!(name.prefix_size(4), 9);

        let prefix = name.get_prefix(2);
        assert_eq!(prefix.len(), 2);
        assert_eq!(prefix.to_string(), "/.../A");
        assert_eq!(prefix.compare(&name), NameCompare::LPrefix);
        assert!(prefix.is_prefix_of(&name));
    }

    const NAMES: [&str; 12] = [
        "0700",
        "0702 0200",
        "0702 0800",
        "0704 0800 0800",
        "0703 080141",
        "0705 080141 0800",
        "0707 080141 0800 0800",
        "0706 080141 080141",
        "0703 080142",
        "0704 08024100",
        "0704 08024101",
        "0702 0900",
    ];

    fn decode_all() -> Vec<Vec<u8>> {
        NAMES.iter().map(|s| hex(s)).collect()
    }

    #[test]
    fn test_prefix_hash() {
        let wires = decode_all();
        let names: Vec<Name> = wires.iter().map(|w| Name::decode(w).unwrap()).collect();

        let equal_pairs = [
            (2, 1, 3, 1),
            (4, 1, 5, 1),
            (4, 1, 6, 1),
            (4, 1, 7, 1),
            (5, 1, 6, 1),
            (5, 2, 6, 2),
            (5, 1, 7, 1),
            (6, 1, 7, 1),
        ];

        for (a, name_a) in names.iter().enumerate() {
            assert_eq!(name_a.compute_hash(), name_a.compute_prefix_hash(name_a.len()));
            let all: Vec<(usize, u64)> = name_a.prefix_hashes().collect();
            assert_eq!(all.len(), name_a.len() + 1);
            for (i, (size, h)) in all.iter().enumerate() {
                assert_eq!(*size, name_a.prefix_size(i));
                assert_eq!(*h, name_a.compute_prefix_hash(i));
            }

            for (b, name_b) in names.iter().enumerate() {
                if a >= b {
                    continue;
                }
                assert_eq!(name_a.compute_prefix_hash(0), name_b.compute_prefix_hash(0));
                for i in 1..=name_a.len() {
                    for j in 1..=name_b.len() {
                        let ha = name_a.compute_prefix_hash(i);
                        let hb = name_b.compute_prefix_hash(j);
                        if equal_pairs.contains(&(a, i, b, j)) {
                            assert_eq!(ha, hb, "{},{}-{},{}", a, i, b, j);
                        } else {
                            assert_ne!(ha, hb, "{},{}-{},{}", a, i, b, j);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_compare() {
        let wires = decode_all();
        let names: Vec<Name> = wires.iter().map(|w| Name::decode(w).unwrap()).collect();

        use NameCompare::*;
        let rel_table = [
            [Equal, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix, LPrefix],
            [RPrefix, Equal, Lt, Lt, Lt, Lt, Lt, Lt, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Equal, LPrefix, Lt, Lt, Lt, Lt, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, RPrefix, Equal, Lt, Lt, Lt, Lt, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, Equal, LPrefix, LPrefix, LPrefix, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, RPrefix, Equal, LPrefix, Lt, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, RPrefix, RPrefix, Equal, Lt, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, RPrefix, Gt, Gt, Equal, Lt, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Equal, Lt, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Equal, Lt, Lt],
            [RPrefix, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Equal, Lt],
            [RPrefix, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Gt, Equal],
        ];

        for (i, row) in rel_table.iter().enumerate() {
            for (j, expected) in row.iter().enumerate() {
                assert_eq!(names[i].compare(&names[j]), *expected, "{} vs {}", i, j);
                assert_eq!(names[j].compare(&names[i]), expected.reverse());
                assert_eq!(*expected as i8, -(rel_table[j][i] as i8));
            }
        }

        let mut sorted = names.clone();
        sorted.reverse();
        sorted.sort();
        assert!(sorted.iter().zip(names.iter()).all(|(a, b)| a == b));
    }

    #[test]
    fn test_from_uri() {
        let name = Name::from_uri("/").unwrap();
        assert_eq!(name.len(), 0);
        assert_eq!(Name::from_uri("").unwrap().len(), 0);
        assert_eq!(Name::from_uri("ndn:/").unwrap().len(), 0);

        let name = Name::from_uri("ndn:/A/B/%00/%FF/.../....").unwrap();
        assert_eq!(name.value(), &hex("080141 080142 080100 0801FF 0800 08012E")[..]);
        assert_eq!(name.to_string(), "/A/B/%00/%FF/.../....");

        let name: Name = "/hello/%2Fworld%20".parse().unwrap();
        assert_eq!(name.len(), 2);
        assert_eq!(name.get_component(1).unwrap().bytes, b"/world ");
        assert_eq!(name.to_string(), "/hello/%2Fworld%20");

        // A trailing percent sign without two following characters is literal
        let name = Name::from_uri("/A%4").unwrap();
        assert_eq!(name.get_component(0).unwrap().bytes, b"A%4");

        assert!(matches!(Name::from_uri("/8=A"), Err(Error::Encoding(_))));
        assert!(matches!(Name::from_uri("/.."), Err(Error::Encoding(_))));
        assert!(matches!(Name::from_uri("/A//B"), Err(Error::Encoding(_))));
        assert!(matches!(Name::from_uri("/%GG0"), Err(Error::Encoding(_))));

        let long = format!("/{}", "A".repeat(MAX_NAME_LENGTH));
        assert!(matches!(Name::from_uri(&long), Err(Error::Length { .. })));
    }

    #[test]
    fn test_append_digest() {
        let name = Name::from_uri("/A/B").unwrap();
        let digest = digest_bytes();
        let full = name.append_digest(&digest).unwrap();
        assert_eq!(full.len(), 3);
        assert!(full.has_digest_component());
        assert!(full.last_component().unwrap().is_digest());
        assert_eq!(full.get_prefix(2), name);
        assert!(!full.get_prefix(2).has_digest_component());
        assert_eq!(name.compare(&full), NameCompare::LPrefix);
    }

    #[test]
    fn test_owned_and_borrowed_are_equal() {
        let wire = hex("0706 080141 080142");
        let borrowed = Name::decode(&wire).unwrap();
        let owned = borrowed.clone().into_owned();
        assert_eq!(borrowed, owned);
        assert_eq!(borrowed.compute_hash(), owned.compute_hash());
        assert_eq!(owned.to_string(), "/A/B");
        let components: Vec<_> = owned.components().map(|c| c.bytes.to_vec()).collect();
        assert_eq!(components, vec![b"A".to_vec(), b"B".to_vec()]);
    }
}
