//! File fingerprints computed from three sampled windows.
//!
//! A fingerprint hashes the first, middle and last `W` bytes of a file into a
//! single digest, always in that order. Large files are never read in full.
//! Files shorter than the window produce overlapping or shrunken windows; the
//! result is still a pure function of the byte content.

use crate::hash::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// A validated fingerprint: lowercase hex of an MD5 or SHA-256 digest.
///
/// The representation only ever contains `[0-9a-f]`, so it is safe to use as
/// a single path segment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse and normalize a fingerprint. Uppercase hex is accepted and lowered.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if DigestAlgorithm::from_hex_len(s.len()).is_none() {
            return Err(crate::Error::InvalidFingerprint(format!(
                "expected 32 or 64 hex chars, got {}",
                s.len()
            )));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidFingerprint(format!(
                "non-hex characters in {s:?}"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The digest algorithm implied by the fingerprint length.
    pub fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::from_hex_len(self.0.len()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.0[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A half-open byte range `[start, end)` sampled from a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleWindow {
    pub start: u64,
    pub end: u64,
}

impl SampleWindow {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compute the first, middle and last windows for a file of `size` bytes.
///
/// The middle window is centered on `size / 2`. Every window is clamped to
/// `[0, size)`, so small files yield overlapping windows.
pub fn sample_windows(size: u64, window: u64) -> [SampleWindow; 3] {
    let first = SampleWindow {
        start: 0,
        end: window.min(size),
    };
    let mid_start = (size / 2).saturating_sub(window / 2);
    let middle = SampleWindow {
        start: mid_start,
        end: mid_start.saturating_add(window).min(size),
    };
    let last = SampleWindow {
        start: size.saturating_sub(window),
        end: size,
    };
    [first, middle, last]
}

/// Computes fingerprints with a fixed window size and digest algorithm.
#[derive(Clone, Copy, Debug)]
pub struct Fingerprinter {
    window: u64,
    algorithm: DigestAlgorithm,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(crate::DEFAULT_SAMPLE_WINDOW, DigestAlgorithm::default())
    }
}

impl Fingerprinter {
    pub fn new(window: u64, algorithm: DigestAlgorithm) -> Self {
        Self { window, algorithm }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Fingerprint an in-memory buffer.
    pub fn fingerprint_bytes(&self, data: &[u8]) -> Fingerprint {
        let mut hasher = self.algorithm.hasher();
        for w in sample_windows(data.len() as u64, self.window) {
            hasher.update(&data[w.start as usize..w.end as usize]);
        }
        Fingerprint(hasher.finalize_hex())
    }

    /// Fingerprint a seekable reader holding `size` bytes.
    ///
    /// Windows are read one after another, so the digest order never depends
    /// on I/O completion order.
    pub async fn fingerprint_reader<R>(&self, reader: &mut R, size: u64) -> crate::Result<Fingerprint>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let mut hasher = self.algorithm.hasher();
        let mut buf = Vec::new();
        for w in sample_windows(size, self.window) {
            buf.resize(w.len() as usize, 0);
            reader
                .seek(std::io::SeekFrom::Start(w.start))
                .await
                .map_err(|e| read_error(w, e))?;
            reader
                .read_exact(&mut buf)
                .await
                .map_err(|e| read_error(w, e))?;
            hasher.update(&buf);
        }
        Ok(Fingerprint(hasher.finalize_hex()))
    }

    /// Fingerprint a file on disk. Returns the fingerprint and the file size.
    #[tracing::instrument(skip(self), fields(window = self.window, algorithm = %self.algorithm))]
    pub async fn fingerprint_file(&self, path: &Path) -> crate::Result<(Fingerprint, u64)> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|source| crate::Error::Read {
                what: path.display().to_string(),
                source,
            })?;
        let size = file
            .metadata()
            .await
            .map_err(|source| crate::Error::Read {
                what: path.display().to_string(),
                source,
            })?
            .len();
        let fingerprint = self.fingerprint_reader(&mut file, size).await?;
        tracing::debug!(%fingerprint, size, "fingerprint computed");
        Ok((fingerprint, size))
    }
}

fn read_error(window: SampleWindow, source: std::io::Error) -> crate::Error {
    crate::Error::Read {
        what: format!("sample window {}..{}", window.start, window.end),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MIB: u64 = 1024 * 1024;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_parse_normalizes_case() {
        let fp = Fingerprint::parse("ABCDEF0123456789ABCDEF0123456789").unwrap();
        assert_eq!(fp.as_str(), "abcdef0123456789abcdef0123456789");
        assert_eq!(fp.algorithm(), DigestAlgorithm::Md5);
    }

    #[test]
    fn test_parse_rejects_unsafe_values() {
        assert!(Fingerprint::parse("").is_err());
        assert!(Fingerprint::parse("../../../../../../../../etc/passwd").is_err());
        assert!(Fingerprint::parse("abcdef0123456789abcdef012345678g").is_err());
        assert!(Fingerprint::parse("abcdef0123456789abcdef01234567/9").is_err());
        assert!(Fingerprint::parse(&"a".repeat(40)).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let json = format!("\"{}\"", "A".repeat(64));
        let fp: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp.as_str(), "a".repeat(64));
        assert!(serde_json::from_str::<Fingerprint>("\"..\"").is_err());
    }

    #[test]
    fn test_windows_for_five_mib_file() {
        let [first, middle, last] = sample_windows(5 * MIB, 2 * MIB);
        assert_eq!((first.start, first.end), (0, 2 * MIB));
        assert_eq!((middle.start, middle.end), (3 * MIB / 2, 7 * MIB / 2));
        assert_eq!((last.start, last.end), (3 * MIB, 5 * MIB));
    }

    #[test]
    fn test_windows_clamped_for_small_files() {
        let windows = sample_windows(100, 2 * MIB);
        for w in windows {
            assert_eq!((w.start, w.end), (0, 100));
        }

        let windows = sample_windows(0, 2 * MIB);
        assert!(windows.iter().all(SampleWindow::is_empty));

        let [_, middle, _] = sample_windows(3, 2);
        assert_eq!((middle.start, middle.end), (0, 2));
    }

    #[test]
    fn test_fingerprint_stable() {
        let fp = Fingerprinter::new(16, DigestAlgorithm::Sha256);
        let data = patterned(1000);
        assert_eq!(fp.fingerprint_bytes(&data), fp.fingerprint_bytes(&data));
    }

    #[test]
    fn test_fingerprint_small_file_deterministic() {
        let fp = Fingerprinter::new(2 * MIB, DigestAlgorithm::Md5);
        let a = fp.fingerprint_bytes(b"tiny");
        let b = fp.fingerprint_bytes(b"tiny");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert_ne!(a, fp.fingerprint_bytes(b"tinY"));
    }

    #[test]
    fn test_fingerprint_sensitive_inside_windows_only() {
        let fp = Fingerprinter::new(10, DigestAlgorithm::Sha256);
        let data = patterned(1000);
        let base = fp.fingerprint_bytes(&data);

        // first [0,10), middle [495,505), last [990,1000)
        for pos in [0usize, 9, 495, 504, 990, 999] {
            let mut changed = data.clone();
            changed[pos] ^= 0xff;
            assert_ne!(fp.fingerprint_bytes(&changed), base, "byte {pos}");
        }
        for pos in [10usize, 200, 494, 505, 989] {
            let mut changed = data.clone();
            changed[pos] ^= 0xff;
            assert_eq!(fp.fingerprint_bytes(&changed), base, "byte {pos}");
        }
    }

    #[tokio::test]
    async fn test_reader_matches_bytes() {
        let fp = Fingerprinter::new(64, DigestAlgorithm::Sha256);
        let data = patterned(4096 + 17);
        let mut cursor = Cursor::new(data.clone());
        let from_reader = fp
            .fingerprint_reader(&mut cursor, data.len() as u64)
            .await
            .unwrap();
        assert_eq!(from_reader, fp.fingerprint_bytes(&data));
    }

    #[tokio::test]
    async fn test_reader_short_read_is_error() {
        let fp = Fingerprinter::new(64, DigestAlgorithm::Sha256);
        let mut cursor = Cursor::new(patterned(100));
        let err = fp.fingerprint_reader(&mut cursor, 1000).await.unwrap_err();
        assert!(matches!(err, crate::Error::Read { .. }));
    }

    #[tokio::test]
    async fn test_fingerprint_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        let data = patterned(300_000);
        std::fs::write(&path, &data).unwrap();

        let fp = Fingerprinter::new(65_536, DigestAlgorithm::Md5);
        let (fingerprint, size) = fp.fingerprint_file(&path).await.unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(fingerprint, fp.fingerprint_bytes(&data));

        let missing = fp.fingerprint_file(&dir.path().join("gone")).await;
        assert!(matches!(missing, Err(crate::Error::Read { .. })));
    }
}
