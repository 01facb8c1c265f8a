// Helpers shared by the unit tests

use crate::{
    name::Name,
    packet::{Data, FaceId, Interest},
};

// Decodes a hex string, ignoring whitespace
pub fn hex(s: &str) -> Vec<u8> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => panic!("invalid hex digit {}", b as char),
        })
        .collect();
    assert!(digits.len() % 2 == 0, "odd number of hex digits");
    digits.chunks(2).map(|p| p[0] << 4 | p[1]).collect()
}

pub fn name(uri: &str) -> Name<'static> {
    Name::from_uri(uri).unwrap()
}

pub fn interest(uri: &str, nonce: u32) -> Interest<'static> {
    let mut interest = Interest::new(name(uri));
    interest.nonce = Some(nonce);
    interest
}

pub fn data(uri: &str, freshness_period: Option<u64>) -> Data<'static> {
    let mut data = Data::new(name(uri), b"content", &[]);
    data.freshness_period = freshness_period;
    data
}

pub const FACE_A: FaceId = FaceId(1001);
pub const FACE_B: FaceId = FaceId(1002);
pub const FACE_C: FaceId = FaceId(1003);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
