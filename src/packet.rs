use core::fmt;

use crate::{
    error::Result,
    hash::{DigestWriter, Hasher, Sha256Digest},
    name::Name,
    tlv::{
        DecodeError, Encode, TlvEncode, TypedBytes, TypedEmpty, TypedInteger, Write, TLV,
    },
};

// Opaque identifier of a face, used for nexthops and in-records
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face#{}", self.0)
    }
}

// Opaque token carried next to a packet by the link layer and echoed back unmodified.
// Only the lower 48 bits are significant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitToken(u64);

impl PitToken {
    pub const MASK: u64 = (1 << 48) - 1;

    pub fn new(value: u64) -> Self {
        Self(value & Self::MASK)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

pub type CanBePrefix = TypedEmpty<33>;
pub type MustBeFresh = TypedEmpty<18>;
pub type ForwardingHint<'a> = TypedBytes<'a, 30>;
pub type InterestLifetime = TypedInteger<12>;
pub type HopLimit = TypedInteger<34>;
pub type ApplicationParameters<'a> = TypedBytes<'a, 36>;

const TLV_TYPE_NONCE: u32 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Interest<'a> {
    pub name: Name<'a>,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub forwarding_hint: Option<&'a [u8]>,
    pub nonce: Option<u32>,
    pub interest_lifetime: Option<u64>,
    pub hop_limit: Option<u8>,
    pub application_parameters: Option<&'a [u8]>,

    // Link-layer metadata, not part of the encoding
    pub pit_token: Option<PitToken>,
}

impl<'a> Interest<'a> {
    pub fn new(name: Name<'a>) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            forwarding_hint: None,
            nonce: None,
            interest_lifetime: None,
            hop_limit: None,
            application_parameters: None,
            pit_token: None,
        }
    }

    // Decodes a complete Interest TLV
    pub fn decode(wire: &'a [u8]) -> Result<Self> {
        let tlv = TLV::try_decode_exact(wire, Self::TLV_TYPE)?;
        Self::try_decode(tlv.val)
    }

    pub fn try_decode(inner_bytes: &'a [u8]) -> Result<Self> {
        let mut offset = 0;

        let (name_tlv, name_len) = TLV::try_decode(inner_bytes)?;
        if name_tlv.typ.get() != Name::TLV_TYPE {
            // Name must be the first TLV
            return Err(DecodeError::UnexpectedType {
                expected: Name::TLV_TYPE,
                actual: name_tlv.typ.get(),
            }
            .into());
        }
        offset += name_len;
        let mut interest = Interest::new(Name::from_value(name_tlv.val)?);

        // The rest should typically be a few known TLVs in order,
        //  but they may contain arbitrary non-critical TLVs too, which we skip.
        let known = [
            CanBePrefix::TLV_TYPE,
            MustBeFresh::TLV_TYPE,
            ForwardingHint::TLV_TYPE,
            TLV_TYPE_NONCE,
            InterestLifetime::TLV_TYPE,
            HopLimit::TLV_TYPE,
            ApplicationParameters::TLV_TYPE,
        ];
        let mut minimum_possible_known = 0;

        while offset < inner_bytes.len() {
            let (tlv, tlv_len) = TLV::try_decode(&inner_bytes[offset..])?;
            let typ = tlv.typ.get();
            offset += tlv_len;

            if interest.application_parameters.is_some() {
                // Everything after the parameters belongs to the signature
                continue;
            }

            let idx = match known.iter().position(|x| &typ == x) {
                Some(idx) => idx,
                None if tlv.type_is_critical() => {
                    return Err(DecodeError::UnknownCritical { typ }.into())
                }
                None => continue,
            };
            if idx < minimum_possible_known {
                return Err(DecodeError::OutOfOrder { typ }.into());
            }
            minimum_possible_known = idx + 1;

            match idx {
                0 => interest.can_be_prefix = true,
                1 => interest.must_be_fresh = true,
                2 => interest.forwarding_hint = Some(tlv.val),
                3 => {
                    let nonce: [u8; 4] = tlv
                        .val
                        .try_into()
                        .map_err(|_| DecodeError::InvalidValue { typ })?;
                    interest.nonce = Some(u32::from_be_bytes(nonce));
                }
                4 => interest.interest_lifetime = Some(tlv.val_as_u64()?),
                5 => {
                    let hop: [u8; 1] = tlv
                        .val
                        .try_into()
                        .map_err(|_| DecodeError::InvalidValue { typ })?;
                    interest.hop_limit = Some(hop[0]);
                }
                _ => interest.application_parameters = Some(tlv.val),
            }
        }

        Ok(interest)
    }
}

impl<'a> TlvEncode for Interest<'a> {
    const TLV_TYPE: u32 = 5;

    fn inner_length(&self) -> usize {
        let mut len = self.name.encoded_length();
        if self.can_be_prefix {
            len += CanBePrefix {}.encoded_length();
        }
        if self.must_be_fresh {
            len += MustBeFresh {}.encoded_length();
        }
        if let Some(bytes) = self.forwarding_hint {
            len += ForwardingHint { bytes }.encoded_length();
        }
        if let Some(nonce) = self.nonce {
            len += TypedBytes::<TLV_TYPE_NONCE> {
                bytes: &nonce.to_be_bytes(),
            }
            .encoded_length();
        }
        if let Some(val) = self.interest_lifetime {
            len += InterestLifetime { val }.encoded_length();
        }
        if let Some(hop) = self.hop_limit {
            len += HopLimit { val: hop as u64 }.encoded_length();
        }
        if let Some(bytes) = self.application_parameters {
            len += ApplicationParameters { bytes }.encoded_length();
        }
        len
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> core::result::Result<(), W::Error> {
        self.name.encode(writer)?;
        if self.can_be_prefix {
            CanBePrefix {}.encode(writer)?;
        }
        if self.must_be_fresh {
            MustBeFresh {}.encode(writer)?;
        }
        if let Some(bytes) = self.forwarding_hint {
            ForwardingHint { bytes }.encode(writer)?;
        }
        if let Some(nonce) = self.nonce {
            TypedBytes::<TLV_TYPE_NONCE> {
                bytes: &nonce.to_be_bytes(),
            }
            .encode(writer)?;
        }
        if let Some(val) = self.interest_lifetime {
            InterestLifetime { val }.encode(writer)?;
        }
        if let Some(hop) = self.hop_limit {
            HopLimit { val: hop as u64 }.encode(writer)?;
        }
        if let Some(bytes) = self.application_parameters {
            ApplicationParameters { bytes }.encode(writer)?;
        }
        Ok(())
    }
}

pub type Content<'a> = TypedBytes<'a, 21>;
pub type FreshnessPeriod = TypedInteger<25>;
pub type SignatureInfo<'a> = TypedBytes<'a, 22>;
pub type SignatureValue<'a> = TypedBytes<'a, 23>;

const TLV_TYPE_META_INFO: u32 = 20;

// SignatureInfo value of a DigestSha256 signature
const DIGEST_SHA256_SIGNATURE_INFO: &[u8] = &[27, 1, 0];

#[derive(Clone, Debug)]
pub struct Data<'a> {
    pub name: Name<'a>,
    pub freshness_period: Option<u64>,
    pub meta_info: Option<&'a [u8]>,
    pub content: Option<&'a [u8]>,
    pub signature_info: &'a [u8],
    pub signature_value: &'a [u8],

    // The complete TLV this was decoded from, if any. The implicit digest covers it.
    pub wire: Option<&'a [u8]>,

    // Link-layer metadata, not part of the encoding
    pub pit_token: Option<PitToken>,
}

impl<'a> Data<'a> {
    // Data signed with a plain SHA-256 digest signature, mostly for tests and simulations
    pub fn new(name: Name<'a>, content: &'a [u8], signature_value: &'a [u8]) -> Self {
        Self {
            name,
            freshness_period: None,
            meta_info: None,
            content: Some(content),
            signature_info: DIGEST_SHA256_SIGNATURE_INFO,
            signature_value,
            wire: None,
            pit_token: None,
        }
    }

    // Decodes a complete Data TLV and keeps a reference to it for the implicit digest
    pub fn decode(wire: &'a [u8]) -> Result<Self> {
        let tlv = TLV::try_decode_exact(wire, Self::TLV_TYPE)?;
        let mut data = Self::try_decode(tlv.val)?;
        data.wire = Some(wire);
        Ok(data)
    }

    pub fn try_decode(inner_bytes: &'a [u8]) -> Result<Self> {
        let mut offset = 0;

        let (name_tlv, name_len) = TLV::try_decode(inner_bytes)?;
        if name_tlv.typ.get() != Name::TLV_TYPE {
            return Err(DecodeError::UnexpectedType {
                expected: Name::TLV_TYPE,
                actual: name_tlv.typ.get(),
            }
            .into());
        }
        offset += name_len;
        let name = Name::from_value(name_tlv.val)?;

        let mut freshness_period = None;
        let mut meta_info = None;
        let mut content = None;
        let mut signature_info = None;
        let mut signature_value = None;

        let known = [
            TLV_TYPE_META_INFO,
            Content::TLV_TYPE,
            SignatureInfo::TLV_TYPE,
            SignatureValue::TLV_TYPE,
        ];
        let mut minimum_possible_known = 0;

        while offset < inner_bytes.len() {
            let (tlv, tlv_len) = TLV::try_decode(&inner_bytes[offset..])?;
            let typ = tlv.typ.get();
            offset += tlv_len;

            let idx = match known.iter().position(|x| &typ == x) {
                Some(idx) => idx,
                None if tlv.type_is_critical() => {
                    return Err(DecodeError::UnknownCritical { typ }.into())
                }
                None => continue,
            };
            if idx < minimum_possible_known {
                return Err(DecodeError::OutOfOrder { typ }.into());
            }
            minimum_possible_known = idx + 1;

            match idx {
                0 => {
                    meta_info = Some(tlv.val);
                    freshness_period = Self::decode_freshness(tlv.val)?;
                }
                1 => content = Some(tlv.val),
                2 => signature_info = Some(tlv.val),
                _ => signature_value = Some(tlv.val),
            }
        }

        let signature_info = signature_info.ok_or(DecodeError::MissingElement {
            typ: SignatureInfo::TLV_TYPE,
        })?;
        let signature_value = signature_value.ok_or(DecodeError::MissingElement {
            typ: SignatureValue::TLV_TYPE,
        })?;

        Ok(Data {
            name,
            freshness_period,
            meta_info,
            content,
            signature_info,
            signature_value,
            wire: None,
            pit_token: None,
        })
    }

    fn decode_freshness(meta_info: &[u8]) -> core::result::Result<Option<u64>, DecodeError> {
        let mut offset = 0;
        while offset < meta_info.len() {
            let (tlv, len) = TLV::try_decode(&meta_info[offset..])?;
            if tlv.typ.get() == FreshnessPeriod::TLV_TYPE {
                return Ok(Some(tlv.val_as_u64()?));
            }
            offset += len;
        }
        Ok(None)
    }

    // SHA-256 over the whole Data TLV, which is the value of its implicit digest component
    pub fn compute_digest<H: Hasher<Digest = Sha256Digest>>(&self, hasher: &mut H) -> Sha256Digest {
        hasher.reset();
        match self.wire {
            Some(wire) => hasher.update(wire),
            None => {
                let _ = self.encode(&mut DigestWriter { hasher: &mut *hasher });
            }
        }
        hasher.finalize_reset()
    }

    // Whether this Data can answer an Interest with the given name and prefix flag.
    // A digest-terminated Interest name needs the digest of this Data to decide.
    pub fn can_satisfy(&self, interest: &Interest<'_>, digest: Option<&Sha256Digest>) -> bool {
        if interest.name.has_digest_component() {
            let bare = interest.name.get_prefix(interest.name.len() - 1);
            return bare == self.name
                && interest
                    .name
                    .last_component()
                    .zip(digest)
                    .map(|(c, d)| c.bytes == &d.0[..])
                    .unwrap_or(false);
        }
        if interest.can_be_prefix {
            interest.name.is_prefix_of(&self.name)
        } else {
            interest.name == self.name
        }
    }
}

impl<'a> TlvEncode for Data<'a> {
    const TLV_TYPE: u32 = 6;

    fn inner_length(&self) -> usize {
        let mut len = self.name.encoded_length();
        len += self.meta_info_length();
        if let Some(bytes) = self.content {
            len += Content { bytes }.encoded_length();
        }
        len += SignatureInfo {
            bytes: self.signature_info,
        }
        .encoded_length();
        len + SignatureValue {
            bytes: self.signature_value,
        }
        .encoded_length()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> core::result::Result<(), W::Error> {
        self.name.encode(writer)?;
        match (self.meta_info, self.freshness_period) {
            (Some(bytes), _) => TypedBytes::<TLV_TYPE_META_INFO> { bytes }.encode(writer)?,
            (None, Some(val)) => {
                let freshness = FreshnessPeriod { val };
                crate::tlv::write_varnum(TLV_TYPE_META_INFO as u64, writer)?;
                crate::tlv::write_varnum(freshness.encoded_length() as u64, writer)?;
                freshness.encode(writer)?;
            }
            (None, None) => {}
        }
        if let Some(bytes) = self.content {
            Content { bytes }.encode(writer)?;
        }
        SignatureInfo {
            bytes: self.signature_info,
        }
        .encode(writer)?;
        SignatureValue {
            bytes: self.signature_value,
        }
        .encode(writer)
    }
}

impl<'a> Data<'a> {
    fn meta_info_length(&self) -> usize {
        match (self.meta_info, self.freshness_period) {
            (Some(bytes), _) => TypedBytes::<TLV_TYPE_META_INFO> { bytes }.encoded_length(),
            (None, Some(val)) => {
                let inner = FreshnessPeriod { val }.encoded_length();
                crate::tlv::varnum_length(TLV_TYPE_META_INFO as u64)
                    + crate::tlv::varnum_length(inner as u64)
                    + inner
            }
            (None, None) => 0,
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NackReason {
    Congestion = 50,
    Duplicate = 100,
    NoRoute = 150,
    Unspecified = 255,
}

impl NackReason {
    // The less severe of the two reasons
    pub fn min(self, other: Self) -> Self {
        if (self as u8) <= (other as u8) {
            self
        } else {
            other
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            _ => NackReason::Unspecified,
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NackReason::Congestion => "Congestion",
            NackReason::Duplicate => "Duplicate",
            NackReason::NoRoute => "NoRoute",
            NackReason::Unspecified => "Unspecified",
        };
        f.write_str(s)
    }
}

// A Nack is the Interest it rejects plus the reason.
// The PIT token travels on the enclosed Interest.
#[derive(Clone, Debug)]
pub struct Nack<'a> {
    pub interest: Interest<'a>,
    pub reason: NackReason,
}

impl<'a> Nack<'a> {
    pub fn new(interest: Interest<'a>, reason: NackReason) -> Self {
        Self { interest, reason }
    }

    pub fn pit_token(&self) -> Option<PitToken> {
        self.interest.pit_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, testing::hex};

    #[test]
    fn test_interest() {
        let wire = hex("0519 0706 080141 080142 2100 1200 0A04A0A1A2A3 0C0207D0 220105");
        let interest = Interest::decode(&wire).unwrap();
        assert_eq!(interest.name.to_string(), "/A/B");
        assert!(interest.can_be_prefix);
        assert!(interest.must_be_fresh);
        assert_eq!(interest.nonce, Some(0xA0A1A2A3));
        assert_eq!(interest.interest_lifetime, Some(2000));
        assert_eq!(interest.hop_limit, Some(5));
        assert_eq!(interest.to_wire(), wire);

        let wire = hex("0505 0703 080141");
        let minimal = Interest::decode(&wire).unwrap();
        assert!(!minimal.can_be_prefix);
        assert_eq!(minimal.nonce, None);
        assert_eq!(minimal.to_wire(), wire);
    }

    #[test]
    fn test_interest_errors() {
        // Known elements in the wrong order
        assert!(matches!(
            Interest::decode(&hex("0509 0703 080141 1200 2100")),
            Err(Error::Decode(DecodeError::OutOfOrder { typ: 33 }))
        ));
        // Unknown critical element
        assert!(matches!(
            Interest::decode(&hex("0507 0703 080141 0100")),
            Err(Error::Decode(DecodeError::UnknownCritical { typ: 1 }))
        ));
        // Unknown non-critical element is skipped
        assert!(Interest::decode(&hex("0507 0703 080141 2000")).is_ok());
        // Nonce of the wrong size
        assert!(Interest::decode(&hex("0508 0703 080141 0A01FF")).is_err());
        // Name must come first
        assert!(Interest::decode(&hex("0504 2100 0700")).is_err());
    }

    #[test]
    fn test_data() {
        let wire = hex("0615 0703 080141 1403 190101 1502 C0C1 1603 1B0100 1500");
        // The last element above is a second Content, which is out of order
        assert!(matches!(
            Data::decode(&wire),
            Err(Error::Decode(DecodeError::OutOfOrder { typ: 21 }))
        ));

        let wire = hex("0615 0703 080141 1403 190164 1502 C0C1 1603 1B0100 1700");
        let data = Data::decode(&wire).unwrap();
        assert_eq!(data.name.to_string(), "/A");
        assert_eq!(data.freshness_period, Some(100));
        assert_eq!(data.content, Some(&[0xC0, 0xC1][..]));
        assert_eq!(data.wire, Some(&wire[..]));
        assert_eq!(data.to_wire(), wire);

        // Signature is mandatory
        assert!(matches!(
            Data::decode(&hex("0509 0703 080141 1502 C0C1")),
            Err(Error::Decode(DecodeError::UnexpectedType { .. }))
        ));
        assert!(matches!(
            Data::decode(&hex("0609 0703 080141 1502 C0C1")),
            Err(Error::Decode(DecodeError::MissingElement { typ: 22 }))
        ));
    }

    #[test]
    fn test_data_built_matches_decoded() {
        let name = Name::from_uri("/A").unwrap();
        let mut data = Data::new(name, &[0xC0, 0xC1], &[]);
        data.freshness_period = Some(100);
        let wire = data.to_wire();
        assert_eq!(
            wire,
            hex("0615 0703 080141 1403 190164 1502 C0C1 1603 1B0100 1700")
        );
        let decoded = Data::decode(&wire).unwrap();
        assert_eq!(decoded.freshness_period, Some(100));
    }

    #[cfg(feature = "sha2")]
    #[test]
    fn test_digest_and_satisfy() {
        use crate::hash::sha::Sha256Hasher;

        let name = Name::from_uri("/A/B").unwrap();
        let data = Data::new(name.clone(), b"hello", &[]);
        let wire = data.to_wire();
        let decoded = Data::decode(&wire).unwrap();

        let mut hasher = Sha256Hasher::new();
        let digest = data.compute_digest(&mut hasher);
        assert_eq!(decoded.compute_digest(&mut hasher), digest);

        let exact = Interest::new(name.clone());
        assert!(data.can_satisfy(&exact, None));

        let mut prefix = Interest::new(Name::from_uri("/A").unwrap());
        assert!(!data.can_satisfy(&prefix, None));
        prefix.can_be_prefix = true;
        assert!(data.can_satisfy(&prefix, None));

        let full = Interest::new(name.append_digest(&digest.0).unwrap());
        assert!(!data.can_satisfy(&full, None));
        assert!(data.can_satisfy(&full, Some(&digest)));
        assert!(!data.can_satisfy(&full, Some(&Sha256Digest([0; 32]))));
    }

    #[test]
    fn test_nack_reason() {
        assert_eq!(
            NackReason::Congestion.min(NackReason::NoRoute),
            NackReason::Congestion
        );
        assert_eq!(
            NackReason::Unspecified.min(NackReason::Duplicate),
            NackReason::Duplicate
        );
        assert_eq!(NackReason::from_u8(150), NackReason::NoRoute);
        assert_eq!(NackReason::from_u8(7), NackReason::Unspecified);
        assert_eq!(NackReason::NoRoute.to_string(), "NoRoute");
    }

    #[test]
    fn test_pit_token() {
        let token = PitToken::new(0xFFFF_0000_0000_0001);
        assert_eq!(token.get(), 1);
        assert_eq!(PitToken::new(u64::MAX).get(), PitToken::MASK);
    }
}
