//! Key layout of chunk namespaces and merged artifacts.
//!
//! ```text
//! <root>/<fingerprint>/<fingerprint>-<index>   chunk record
//! <root>/<fingerprint>-<fileName>              merged artifact
//! ```
//!
//! Record names are parsed back into indices only here, when a namespace
//! listing is turned into a [`ChunkIndex`](crate::index::ChunkIndex).

use splice_core::{ArtifactName, Fingerprint};

/// Directory key of a fingerprint's chunk namespace.
pub fn namespace_dir(fingerprint: &Fingerprint) -> &str {
    fingerprint.as_str()
}

/// File name of a chunk record inside its namespace.
pub fn chunk_record_name(fingerprint: &Fingerprint, index: u32) -> String {
    format!("{fingerprint}-{index}")
}

/// Full key of a chunk record.
pub fn chunk_key(fingerprint: &Fingerprint, index: u32) -> String {
    format!("{fingerprint}/{}", chunk_record_name(fingerprint, index))
}

/// Key of a merged artifact.
pub fn artifact_key(name: &ArtifactName) -> &str {
    name.as_str()
}

/// Recover the index from a record name.
///
/// Only `<fingerprint>-<digits>` is recognized. Leading zeros are accepted,
/// so `abc-7` and `abc-007` both map to 7 and show up as a duplicate.
pub fn parse_chunk_record(fingerprint: &Fingerprint, name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix(fingerprint.as_str())?
        .strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
