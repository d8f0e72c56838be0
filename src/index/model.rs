//! Serde model of the F-Droid `index-v2.json` document.
//!
//! Only the metadata fields this tool consumes are modeled; the index
//! carries far more per package, all of which is ignored during
//! deserialization.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

/// Top-level package index document.
#[derive(Debug, Default, Deserialize)]
pub struct PackageIndex {
    /// Package name → package entry.
    #[serde(default)]
    pub packages: HashMap<String, Package>,
}

/// One package entry.
#[derive(Debug, Default, Deserialize)]
pub struct Package {
    /// Package metadata block.
    #[serde(default)]
    pub metadata: PackageMetadata,
}

/// The metadata fields consumed from a package entry.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    /// Millisecond timestamp at which the package entered the index.
    #[serde(default)]
    pub added: i64,

    /// Millisecond timestamp of the package's last index update.
    #[serde(default)]
    pub last_updated: i64,

    /// Source repository URL; absent for packages without public source.
    #[serde(default)]
    pub source_code: Option<String>,
}

impl PackageIndex {
    /// Parses an index document from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying decode error when the document is not valid
    /// JSON or the modeled fields have the wrong shape.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Returns the deduplicated set of source repository URLs.
    ///
    /// This is the scheduler's worklist; iteration order is unspecified.
    #[must_use]
    pub fn source_code_worklist(&self) -> HashSet<String> {
        self.packages
            .values()
            .filter_map(|package| package.metadata.source_code.as_deref())
            .filter(|source| !source.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Returns source URLs ordered newest-first by `metadata.added`,
    /// deduplicated, keeping each URL's first (newest) occurrence.
    ///
    /// Used for the worklist listing only; submission order is unrelated.
    #[must_use]
    pub fn worklist_newest_first(&self) -> Vec<String> {
        let mut entries: Vec<(i64, &str)> = self
            .packages
            .values()
            .filter_map(|package| {
                package
                    .metadata
                    .source_code
                    .as_deref()
                    .filter(|source| !source.is_empty())
                    .map(|source| (package.metadata.added, source))
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(_, source)| seen.insert(*source))
            .map(|(_, source)| source.to_string())
            .collect()
    }
}
