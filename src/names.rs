use std::collections::HashMap;

use crate::data::DataError;

/// Known GeoJSON spellings that differ from the dataset's country names.
/// Kept as data so new variants are one-line patches. The `TÃ¼rkiye` entry
/// covers a UTF-8-as-Latin-1 mis-decode seen in the wild; both it and the
/// English exonym collapse onto the dataset spelling.
const NAME_TABLE: &[(&str, &str)] = &[
    ("United States of America", "United States"),
    ("Republic of Korea", "Korea"),
    ("South Korea", "Korea"),
    ("Slovakia", "Slovak Republic"),
    ("Turkey", "Türkiye"),
    ("TÃ¼rkiye", "Türkiye"),
];

/// Maps GeoJSON country spellings onto the canonical dataset spelling.
///
/// Lookup is total: an unknown name comes back unchanged, and callers
/// degrade to a "no data" rendering rather than failing. Dataset names are
/// already canonical and must not be passed through this.
#[derive(Debug)]
pub struct NameReconciler {
    map: HashMap<&'static str, &'static str>,
}

impl NameReconciler {
    /// Build the reconciler from the built-in table.
    pub fn new() -> Result<Self, DataError> {
        Self::from_pairs(NAME_TABLE)
    }

    /// Build from an explicit table, validating that keys are unique and
    /// that any value reappearing as a key maps to itself. The second check
    /// is what makes `canonicalize` idempotent instead of a chain lookup.
    pub fn from_pairs(pairs: &[(&'static str, &'static str)]) -> Result<Self, DataError> {
        let mut map = HashMap::with_capacity(pairs.len());
        for &(raw, canonical) in pairs {
            if map.insert(raw, canonical).is_some() {
                return Err(DataError::InvalidNameTable(format!(
                    "duplicate key {raw:?}"
                )));
            }
        }
        for &(_, canonical) in pairs {
            if let Some(&next) = map.get(canonical) {
                if next != canonical {
                    return Err(DataError::InvalidNameTable(format!(
                        "{canonical:?} is both a target and a key for {next:?}"
                    )));
                }
            }
        }
        Ok(Self { map })
    }

    /// Canonical spelling for a raw GeoJSON name; the input itself if unmapped.
    pub fn canonicalize<'a>(&self, raw: &'a str) -> &'a str {
        self.map.get(raw).copied().unwrap_or(raw)
    }
}
