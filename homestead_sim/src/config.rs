// Data-driven editor configuration.
//
// Tunable rules live in `EditorConfig`, loaded from JSON by the host at
// startup. Every field has a default, and the struct is `#[serde(default)]`,
// so a config file only needs the fields it overrides (`{}` is a valid
// config).
//
// See also: `editor.rs` which owns the config, `validate.rs` for
// `PlacementRules` (derived from `restricted_categories`), `nav.rs` for the
// door reach rule, `snapshot.rs` for the version check.

use crate::catalog::Category;
use crate::error::EditorError;
use crate::types::LocationKey;
use crate::validate::PlacementRules;
use serde::{Deserialize, Serialize};

/// All tunable editor parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Location that is active when the editor starts.
    pub start_location: LocationKey,
    /// Maximum Manhattan distance (in cells) between the interaction point
    /// and a building's door for the building to be enterable.
    pub door_reach: u32,
    /// Categories that may not be placed by direct grid placement.
    pub restricted_categories: Vec<Category>,
    /// Prefix of generated placement ids (`"{prefix}_{n}"`).
    pub placement_id_prefix: String,
    /// Version string written into layout snapshots. Loading accepts any
    /// snapshot with the same major version.
    pub snapshot_version: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            start_location: LocationKey::from("farm"),
            door_reach: 2,
            restricted_categories: vec![Category::Wallpaper, Category::Flooring],
            placement_id_prefix: "plc".to_owned(),
            snapshot_version: "1.0".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(EditorError::Config)
    }

    /// The subset of the config the validator needs.
    pub fn placement_rules(&self) -> PlacementRules {
        PlacementRules {
            restricted_categories: self.restricted_categories.clone(),
        }
    }

    /// Major component of `snapshot_version` (`"1"` for `"1.0"`).
    pub fn snapshot_major(&self) -> &str {
        major_version(&self.snapshot_version)
    }
}

/// Major component of a dotted version string.
pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.door_reach, 2);
        assert_eq!(config.start_location.as_str(), "farm");
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let config = EditorConfig::from_json(
            r#"{ "doorReach": 4, "restrictedCategories": ["wallpaper"] }"#,
        )
        .unwrap();
        assert_eq!(config.door_reach, 4);
        assert_eq!(config.restricted_categories, vec![Category::Wallpaper]);
        assert_eq!(config.placement_id_prefix, "plc");
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = EditorConfig {
            start_location: LocationKey::from("town"),
            door_reach: 1,
            restricted_categories: Vec::new(),
            placement_id_prefix: "obj".into(),
            snapshot_version: "1.3".into(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn bad_config_is_structural_error() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "doorReach": "far" }"#),
            Err(EditorError::Config(_))
        ));
    }

    #[test]
    fn major_version_parsing() {
        assert_eq!(major_version("1.0"), "1");
        assert_eq!(major_version("2"), "2");
        assert_eq!(major_version("10.4.1"), "10");
        assert_eq!(EditorConfig::default().snapshot_major(), "1");
    }
}
