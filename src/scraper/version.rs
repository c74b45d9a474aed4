//! Protocol versions of a source and the fallback state
//!
//! A source registers one parser per layout version it knows. One of them is
//! active; when it stops producing postings the source scraper walks the
//! states below to find one that works again.

use std::fmt;
use std::sync::Arc;

use crate::parsers::JobParser;

/// Where a source currently is in the version-fallback protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackState {
    /// Scraping with the active version
    #[default]
    UsingCurrent,
    /// Active version failed; testing layout fingerprints
    Detecting,
    /// Another version was promoted and is being used
    UsingFallback,
    /// No registered version produced postings
    Failed,
}

impl fmt::Display for FallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UsingCurrent => "using-current",
            Self::Detecting => "detecting",
            Self::UsingFallback => "using-fallback",
            Self::Failed => "failed",
        })
    }
}

/// Registered parser versions of one source, in registration order
pub struct VersionSet {
    versions: Vec<Arc<dyn JobParser>>,
    active: usize,
    state: FallbackState,
}

impl VersionSet {
    /// Creates the set with `active` as the starting version
    ///
    /// Returns `None` if `versions` is empty or `active` names no version.
    /// Without an explicit `active` the first version is used.
    pub fn new(versions: Vec<Arc<dyn JobParser>>, active: Option<&str>) -> Option<Self> {
        if versions.is_empty() {
            return None;
        }

        let active = match active {
            Some(id) => versions.iter().position(|v| v.version() == id)?,
            None => 0,
        };

        Some(Self {
            versions,
            active,
            state: FallbackState::UsingCurrent,
        })
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_version(&self) -> &str {
        self.versions[self.active].version()
    }

    pub fn parser(&self, index: usize) -> Option<Arc<dyn JobParser>> {
        self.versions.get(index).cloned()
    }

    pub fn active_parser(&self) -> Arc<dyn JobParser> {
        Arc::clone(&self.versions[self.active])
    }

    pub fn set_active(&mut self, index: usize) {
        if index < self.versions.len() {
            self.active = index;
        }
    }

    pub fn state(&self) -> FallbackState {
        self.state
    }

    pub fn set_state(&mut self, state: FallbackState) {
        self.state = state;
    }

    /// First version, in registration order, whose fingerprints match `html`
    pub fn detect(&self, html: &str) -> Option<usize> {
        self.versions.iter().position(|v| v.matches_layout(html))
    }

    /// Indices not yet in `tried`, in registration order
    pub fn untried(&self, tried: &[usize]) -> Vec<usize> {
        (0..self.versions.len())
            .filter(|i| !tried.contains(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{SelectorParser, SelectorTable};
    use url::Url;

    fn version(id: &str, fingerprint: &str) -> Arc<dyn JobParser> {
        let table = SelectorTable {
            fingerprints: vec![fingerprint.to_string()],
            ..SelectorTable::new(id, ".job", ".title", ".company")
        };
        Arc::new(SelectorParser::new("test", Url::parse("https://a.test").unwrap(), table).unwrap())
    }

    fn set(active: Option<&str>) -> Option<VersionSet> {
        VersionSet::new(
            vec![version("v3", "main.v3"), version("v2", "main.v2"), version("v1", "main.v1")],
            active,
        )
    }

    #[test]
    fn test_defaults_to_first_version() {
        let versions = set(None).unwrap();
        assert_eq!(versions.active_version(), "v3");
        assert_eq!(versions.state(), FallbackState::UsingCurrent);
        assert_eq!(versions.len(), 3);
    }

    #[test]
    fn test_explicit_active_version() {
        assert_eq!(set(Some("v2")).unwrap().active_version(), "v2");
        assert!(set(Some("v9")).is_none());
        assert!(VersionSet::new(Vec::new(), None).is_none());
    }

    #[test]
    fn test_detect_by_fingerprint() {
        let versions = set(None).unwrap();
        assert_eq!(versions.detect("<main class=\"v2\"></main>"), Some(1));
        assert_eq!(versions.detect("<main class=\"v7\"></main>"), None);
    }

    #[test]
    fn test_untried_keeps_registration_order() {
        let versions = set(None).unwrap();
        assert_eq!(versions.untried(&[0, 2]), vec![1]);
        assert_eq!(versions.untried(&[1]), vec![0, 2]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(FallbackState::UsingFallback.to_string(), "using-fallback");
    }
}
