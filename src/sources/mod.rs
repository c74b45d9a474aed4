//! Built-in selector tables for known job boards
//!
//! A source configured with `preset = "<name>"` and no explicit versions gets
//! the tables defined here. Versions are listed newest first; the first one is
//! the default active version and the rest are fallback candidates.

mod arbeitnow;
mod relocate;

use crate::parsers::SelectorTable;
use crate::{ConfigError, ConfigResult};

/// Defaults for one known source
#[derive(Debug, Clone)]
pub struct SourcePreset {
    pub name: &'static str,
    pub base_url: &'static str,
    /// Listing URL with a `{page}` placeholder
    pub page_url: &'static str,
    pub versions: Vec<SelectorTable>,
}

/// Names of all built-in presets
pub const PRESET_NAMES: &[&str] = &["arbeitnow", "relocate"];

/// Looks up a preset by name
///
/// # Returns
///
/// * `Ok(SourcePreset)` - The preset's URLs and selector tables
/// * `Err(ConfigError::UnknownPreset)` - No preset with that name exists
pub fn preset(name: &str) -> ConfigResult<SourcePreset> {
    match name {
        "arbeitnow" => Ok(arbeitnow::preset()),
        "relocate" => Ok(relocate::preset()),
        other => Err(ConfigError::UnknownPreset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::SelectorParser;
    use url::Url;

    #[test]
    fn test_all_presets_compile() {
        for name in PRESET_NAMES {
            let preset = preset(name).unwrap();
            let base = Url::parse(preset.base_url).unwrap();
            assert!(preset.page_url.contains("{page}"));
            assert!(preset.versions.len() >= 2);
            for table in preset.versions {
                assert!(
                    SelectorParser::new(name, base.clone(), table).is_ok(),
                    "preset {} has an invalid selector",
                    name
                );
            }
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            preset("monster"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
