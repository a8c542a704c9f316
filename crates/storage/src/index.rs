//! The set of chunk records present in one namespace.

use crate::layout::parse_chunk_record;
use splice_core::Fingerprint;
use std::collections::BTreeMap;

/// Authoritative view of a chunk namespace, shared by the resume query and
/// the merge engine.
///
/// Built once from a raw listing. Entries that do not parse as chunk records
/// and indices that appear under more than one record name are kept aside so
/// that the merge can refuse them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkIndex {
    records: BTreeMap<u32, String>,
    duplicates: Vec<(u32, String)>,
    unrecognized: Vec<String>,
}

impl ChunkIndex {
    /// Empty index, for a namespace that does not exist.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from the record names listed in a namespace.
    pub fn from_record_names<I>(fingerprint: &Fingerprint, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self::default();
        for name in names {
            match parse_chunk_record(fingerprint, &name) {
                Some(i) if index.records.contains_key(&i) => index.duplicates.push((i, name)),
                Some(i) => {
                    index.records.insert(i, name);
                }
                None => index.unrecognized.push(name),
            }
        }
        index
    }

    /// Distinct stored indices, ascending.
    pub fn indices(&self) -> Vec<u32> {
        self.records.keys().copied().collect()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.records.contains_key(&index)
    }

    /// Number of distinct indices.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Number of entries in the namespace, including duplicates and
    /// unrecognized ones.
    pub fn record_count(&self) -> usize {
        self.records.len() + self.duplicates.len() + self.unrecognized.len()
    }

    /// Describe why this namespace cannot be merged as-is, if it cannot.
    pub fn corruption(&self) -> Option<String> {
        if let Some((i, name)) = self.duplicates.first() {
            let first = self.records.get(i).map(String::as_str).unwrap_or("?");
            return Some(format!(
                "index {i} stored under both {first:?} and {name:?}"
            ));
        }
        self.unrecognized
            .first()
            .map(|name| format!("unrecognized record {name:?}"))
    }

    /// Indices in `0..total` that are not stored.
    pub fn missing(&self, total: u32) -> Vec<u32> {
        (0..total).filter(|i| !self.records.contains_key(i)).collect()
    }

    /// Record names in ascending index order.
    pub fn ordered_records(&self) -> impl Iterator<Item = (u32, &str)> {
        self.records.iter().map(|(i, name)| (*i, name.as_str()))
    }
}
