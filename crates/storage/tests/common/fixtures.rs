use bytes::Bytes;
use sha2::{Digest, Sha256};
use splice_core::Fingerprint;
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

/// MD5-length fingerprint made of one repeated hex digit.
#[allow(dead_code)]
pub fn fingerprint(seed: char) -> Fingerprint {
    Fingerprint::parse(&seed.to_string().repeat(32)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_bytes_deterministic() {
        assert_eq!(seeded_bytes(42, 1001), seeded_bytes(42, 1001));
        assert_ne!(seeded_bytes(42, 1001), seeded_bytes(43, 1001));
        assert_eq!(seeded_bytes(0, 13).len(), 13);
    }
}
