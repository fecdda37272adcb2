//! Metadata collaborator seam.
//!
//! The indexes never hold pointers into metadata storage; fid is the only
//! join key, and metadata is reached through a lookup-only relation. The
//! fusion step needs exactly one piece of metadata, the source-document
//! title, so that is the whole trait surface here. Resolving fids to full
//! fragment records after retrieval is the caller's job.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::Fid;

/// Lookup-only access to source-document titles, keyed by fragment id.
pub trait TitleProvider: Send + Sync {
    /// Fetch titles for the given fids.
    ///
    /// Fids with no known title may simply be absent from the returned
    /// map.
    fn titles_for(&self, fids: &[Fid]) -> Result<HashMap<Fid, String>>;
}

/// In-memory title provider for tests and the CLI.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTitleProvider {
    titles: HashMap<Fid, String>,
}

impl InMemoryTitleProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from `(fid, title)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Fid, S)>,
        S: Into<String>,
    {
        Self {
            titles: pairs
                .into_iter()
                .map(|(fid, title)| (fid, title.into()))
                .collect(),
        }
    }

    /// Set the title for a fid.
    pub fn insert<S: Into<String>>(&mut self, fid: Fid, title: S) {
        self.titles.insert(fid, title.into());
    }
}

impl TitleProvider for InMemoryTitleProvider {
    fn titles_for(&self, fids: &[Fid]) -> Result<HashMap<Fid, String>> {
        Ok(fids
            .iter()
            .filter_map(|fid| self.titles.get(fid).map(|t| (*fid, t.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown_fids() {
        let provider = InMemoryTitleProvider::from_pairs([(1, "Routes"), (2, "Config")]);
        let titles = provider.titles_for(&[1, 2, 99]).unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[&1], "Routes");
        assert!(!titles.contains_key(&99));
    }

    #[test]
    fn test_insert() {
        let mut provider = InMemoryTitleProvider::new();
        provider.insert(7, "Storage Guide");
        let titles = provider.titles_for(&[7]).unwrap();
        assert_eq!(titles[&7], "Storage Guide");
    }
}
