//! Payload and request-body builders shared by the API tests.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use splice_core::hash::to_hex;

/// Reproducible pseudo-random payload; equal seeds give equal bytes.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    // splitmix64
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    };
    let data: Vec<u8> = (0..len.div_ceil(8))
        .flat_map(|_| next().to_le_bytes())
        .take(len)
        .collect();
    Bytes::from(data)
}

/// Hex SHA-256 of `data`, for comparing merged artifacts with their source.
#[allow(dead_code)]
pub fn sha256_hash(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

/// A valid 32-character fingerprint built from one hex digit.
#[allow(dead_code)]
pub fn test_fingerprint(digit: char) -> String {
    digit.to_string().repeat(32)
}

/// Build a `multipart/form-data` body with one file field.
///
/// Returns the content type (including boundary) and the encoded body.
#[allow(dead_code)]
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----splice-test-boundary";
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
