use core::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("buffer too short")]
    BufferTooShort,
    #[error("non-minimal VarNumber encoding")]
    NonMinimalVarNumber,
    #[error("invalid TLV-TYPE")]
    InvalidType,
    #[error("TLV-LENGTH {len} of type {typ} overruns the buffer")]
    ValueOverrun { typ: u32, len: usize },
    #[error("expected TLV-TYPE {expected}, found {actual}")]
    UnexpectedType { expected: u32, actual: u32 },
    #[error("invalid TLV-VALUE for type {typ}")]
    InvalidValue { typ: u32 },
    #[error("unrecognized critical TLV-TYPE {typ}")]
    UnknownCritical { typ: u32 },
    #[error("TLV-TYPE {typ} out of order")]
    OutOfOrder { typ: u32 },
    #[error("missing required TLV-TYPE {typ}")]
    MissingElement { typ: u32 },
}

// The sink for encoded bytes. Vec<u8> is the usual one, but hashers also implement it
//  so that an encoding can be digested without being materialized.
pub trait Write {
    type Error;
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl Write for Vec<u8> {
    type Error = core::convert::Infallible;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

pub trait Encode {
    fn encoded_length(&self) -> usize;
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error>;

    fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_length());
        let _ = self.encode(&mut buf);
        buf
    }
}

// Elements with a fixed TLV-TYPE only need to describe their value,
//  the type and length are added here.
pub trait TlvEncode {
    const TLV_TYPE: u32;
    fn inner_length(&self) -> usize;
    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error>;
}

impl<T: TlvEncode> Encode for T {
    fn encoded_length(&self) -> usize {
        let inner = self.inner_length();
        varnum_length(T::TLV_TYPE as u64) + varnum_length(inner as u64) + inner
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        write_varnum(T::TLV_TYPE as u64, writer)?;
        write_varnum(self.inner_length() as u64, writer)?;
        self.encode_inner(writer)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TLV<'a> {
    pub typ: NonZeroU32,
    pub val: &'a [u8],
}

impl<'a> TLV<'a> {
    // This matters when the evolution of the protocol requires adding new types.
    // When an unknown type is critical we must signal error, otherwise we can ignore it.
    pub fn type_is_critical(&self) -> bool {
        let typ = self.typ.get();
        typ < 32 || typ & 1 == 1
    }

    // NonNegativeInteger is 1, 2, 4 or 8 bytes, big-endian
    pub fn val_as_u64(&self) -> Result<u64, DecodeError> {
        let invalid = DecodeError::InvalidValue {
            typ: self.typ.get(),
        };
        match self.val.len() {
            1 => Ok(self.val[0] as u64),
            2 => Ok(u16::from_be_bytes(self.val.try_into().map_err(|_| invalid)?) as u64),
            4 => Ok(u32::from_be_bytes(self.val.try_into().map_err(|_| invalid)?) as u64),
            8 => Ok(u64::from_be_bytes(self.val.try_into().map_err(|_| invalid)?)),
            _ => Err(invalid),
        }
    }

    // Returns the element and the total number of bytes it occupies
    pub fn try_decode(bytes: &'a [u8]) -> Result<(TLV<'a>, usize), DecodeError> {
        let mut cursor = 0;
        let typ: u32 = parse_varnum(bytes, &mut cursor)?
            .try_into()
            .map_err(|_| DecodeError::InvalidType)?;
        let typ = NonZeroU32::new(typ).ok_or(DecodeError::InvalidType)?;

        let len: usize = parse_varnum(bytes, &mut cursor)?
            .try_into()
            .map_err(|_| DecodeError::ValueOverrun {
                typ: typ.get(),
                len: usize::MAX,
            })?;

        if len > bytes.len() - cursor {
            return Err(DecodeError::ValueOverrun {
                typ: typ.get(),
                len,
            });
        }

        let val = &bytes[cursor..(cursor + len)];
        Ok((TLV { typ, val }, cursor + len))
    }

    // Decodes a single element of the given type that must span the whole buffer
    pub fn try_decode_exact(bytes: &'a [u8], expected: u32) -> Result<TLV<'a>, DecodeError> {
        let (tlv, len) = Self::try_decode(bytes)?;
        if tlv.typ.get() != expected {
            return Err(DecodeError::UnexpectedType {
                expected,
                actual: tlv.typ.get(),
            });
        }
        if len != bytes.len() {
            return Err(DecodeError::InvalidValue { typ: expected });
        }
        Ok(tlv)
    }
}

impl<'a> Encode for TLV<'a> {
    fn encoded_length(&self) -> usize {
        let l = self.val.len();
        varnum_length(self.typ.get() as u64) + varnum_length(l as u64) + l
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        write_varnum(self.typ.get() as u64, writer)?;
        write_varnum(self.val.len() as u64, writer)?;
        writer.write(self.val)
    }
}

// Iterates over consecutive elements until the buffer is exhausted or an error is hit.
pub struct TlvIter<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> TlvIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

impl<'a> Iterator for TlvIter<'a> {
    // Element, its start offset and its end offset within the buffer
    type Item = Result<(TLV<'a>, usize, usize), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        match TLV::try_decode(&self.bytes[self.offset..]) {
            Ok((tlv, len)) => {
                let start = self.offset;
                self.offset += len;
                Some(Ok((tlv, start, self.offset)))
            }
            Err(err) => {
                self.offset = self.bytes.len();
                Some(Err(err))
            }
        }
    }
}

pub fn parse_varnum(bytes: &[u8], cursor: &mut usize) -> Result<u64, DecodeError> {
    let first = *bytes.get(*cursor).ok_or(DecodeError::BufferTooShort)?;
    *cursor += 1;
    let width = match first {
        0..=252 => return Ok(first as u64),
        253 => 2,
        254 => 4,
        255 => 8,
    };
    let next = bytes
        .get(*cursor..(*cursor + width))
        .ok_or(DecodeError::BufferTooShort)?;
    *cursor += width;
    let (val, min) = match width {
        2 => (u16::from_be_bytes([next[0], next[1]]) as u64, 253),
        4 => (
            u32::from_be_bytes([next[0], next[1], next[2], next[3]]) as u64,
            65536,
        ),
        _ => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(next);
            (u64::from_be_bytes(arr), 4294967296)
        }
    };
    if val < min {
        return Err(DecodeError::NonMinimalVarNumber);
    }
    Ok(val)
}

pub fn write_varnum<W: Write + ?Sized>(val: u64, writer: &mut W) -> Result<(), W::Error> {
    if val <= 252 {
        writer.write(&[val as u8])
    } else if val <= 65535 {
        writer.write(&[253])?;
        writer.write(&(val as u16).to_be_bytes())
    } else if val <= 4294967295 {
        writer.write(&[254])?;
        writer.write(&(val as u32).to_be_bytes())
    } else {
        writer.write(&[255])?;
        writer.write(&val.to_be_bytes())
    }
}

// Shortest NonNegativeInteger encoding of a value
pub(crate) fn nonneg_bytes(val: u64) -> ([u8; 8], usize) {
    let bytes = val.to_be_bytes();
    let len = if val <= 0xFF {
        1
    } else if val <= 0xFFFF {
        2
    } else if val <= 0xFFFF_FFFF {
        4
    } else {
        8
    };
    (bytes, len)
}

pub fn varnum_length(val: u64) -> usize {
    if val <= 252 {
        1
    } else if val <= 65535 {
        3
    } else if val <= 4294967295 {
        5
    } else {
        9
    }
}

// Element carrying no value, e.g. CanBePrefix
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypedEmpty<const T: u32>;

impl<const T: u32> TlvEncode for TypedEmpty<T> {
    const TLV_TYPE: u32 = T;

    fn inner_length(&self) -> usize {
        0
    }

    fn encode_inner<W: Write + ?Sized>(&self, _writer: &mut W) -> Result<(), W::Error> {
        Ok(())
    }
}

// Element carrying a NonNegativeInteger in its shortest form
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypedInteger<const T: u32> {
    pub val: u64,
}

impl<const T: u32> TlvEncode for TypedInteger<T> {
    const TLV_TYPE: u32 = T;

    fn inner_length(&self) -> usize {
        nonneg_bytes(self.val).1
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        let (bytes, len) = nonneg_bytes(self.val);
        writer.write(&bytes[8 - len..])
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypedBytes<'a, const T: u32> {
    pub bytes: &'a [u8],
}

impl<'a, const T: u32> TlvEncode for TypedBytes<'a, T> {
    const TLV_TYPE: u32 = T;

    fn inner_length(&self) -> usize {
        self.bytes.len()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        writer.write(self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hex;

    #[test]
    fn test_unsigned() {
        for v in 0u64..253 {
            assert_eq!(varnum_length(v), 1);
        }
        assert_eq!(varnum_length(253), 3);
        assert_eq!(varnum_length(254), 3);
        assert_eq!(varnum_length(255), 3);
        assert_eq!(varnum_length(256), 3);
        assert_eq!(varnum_length(65535), 3);
        assert_eq!(varnum_length(65536), 5);
        assert_eq!(varnum_length(4294967295), 5);
        assert_eq!(varnum_length(4294967296), 9);
    }

    #[test]
    fn test_varnum_boundaries() {
        let cases: [(u64, &str); 7] = [
            (0, "00"),
            (252, "FC"),
            (253, "FD00FD"),
            (65535, "FDFFFF"),
            (65536, "FE00010000"),
            (4294967295, "FEFFFFFFFF"),
            (4294967296, "FF0000000100000000"),
        ];
        for (val, wire) in cases {
            let wire = hex(wire);
            let mut buf = Vec::new();
            let _ = write_varnum(val, &mut buf);
            assert_eq!(buf, wire);
            let mut cursor = 0;
            assert_eq!(parse_varnum(&wire, &mut cursor), Ok(val));
            assert_eq!(cursor, wire.len());
        }
    }

    #[test]
    fn test_varnum_errors() {
        let mut cursor = 0;
        assert_eq!(
            parse_varnum(&[], &mut cursor),
            Err(DecodeError::BufferTooShort)
        );
        cursor = 0;
        assert_eq!(
            parse_varnum(&hex("FD01"), &mut cursor),
            Err(DecodeError::BufferTooShort)
        );
        cursor = 0;
        assert_eq!(
            parse_varnum(&hex("FD00FC"), &mut cursor),
            Err(DecodeError::NonMinimalVarNumber)
        );
        cursor = 0;
        assert_eq!(
            parse_varnum(&hex("FE0000FFFF"), &mut cursor),
            Err(DecodeError::NonMinimalVarNumber)
        );
        cursor = 0;
        assert_eq!(
            parse_varnum(&hex("FF00000000FFFFFFFF"), &mut cursor),
            Err(DecodeError::NonMinimalVarNumber)
        );
    }

    #[test]
    fn test_tlv_decode() {
        let wire = hex("0803414243FF");
        let (tlv, len) = TLV::try_decode(&wire).unwrap();
        assert_eq!(tlv.typ.get(), 8);
        assert_eq!(tlv.val, b"ABC");
        assert_eq!(len, 5);

        assert_eq!(
            TLV::try_decode(&hex("0805414243")),
            Err(DecodeError::ValueOverrun { typ: 8, len: 5 })
        );
        assert_eq!(TLV::try_decode(&hex("0000")), Err(DecodeError::InvalidType));
        assert_eq!(
            TLV::try_decode_exact(&hex("0800"), 7),
            Err(DecodeError::UnexpectedType {
                expected: 7,
                actual: 8
            })
        );
    }

    #[test]
    fn test_criticality() {
        let critical = |typ: u32| {
            TLV {
                typ: NonZeroU32::new(typ).unwrap(),
                val: &[],
            }
            .type_is_critical()
        };
        assert!(critical(1));
        assert!(critical(31));
        assert!(critical(33));
        assert!(!critical(32));
        assert!(!critical(34));
    }

    #[test]
    fn test_typed_integer() {
        let lifetime = TypedInteger::<12> { val: 4000 };
        assert_eq!(lifetime.to_wire(), hex("0C020FA0"));
        let hop = TypedInteger::<34> { val: 7 };
        assert_eq!(hop.to_wire(), hex("220107"));
        let wide = TypedInteger::<25> { val: 0x1_0000_0000 };
        assert_eq!(wide.to_wire(), hex("19080000000100000000"));
        assert_eq!(TypedEmpty::<33>.to_wire(), hex("2100"));
    }

    #[test]
    fn test_iter() {
        let wire = hex("0801410800");
        let items: Vec<_> = TlvIter::new(&wire).collect();
        assert_eq!(items.len(), 2);
        let (tlv, start, end) = items[1].unwrap();
        assert_eq!((tlv.val.len(), start, end), (0, 3, 5));

        let wire = hex("08014108");
        let last = TlvIter::new(&wire).last().unwrap();
        assert!(last.is_err());
    }
}
