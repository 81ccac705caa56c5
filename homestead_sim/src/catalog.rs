// Spatial catalog of static object definitions keyed by object key.
//
// The engine never loads asset data itself. It consumes definitions through
// two seams:
//
// - `ObjectCatalog`: a synchronous lookup the validator and mutator use for
//   footprints. `JsonCatalog` is the stock implementation, built from the
//   `objects.json` shape (`{ "<objectKey>": { ...definition } }`).
// - `DefinitionSource`: an asynchronous lookup for hosts that resolve
//   definitions over I/O. Every `ObjectCatalog` is also a `DefinitionSource`
//   (blanket impl), so synchronous hosts get it for free. A failed lookup is
//   reported as `None`, which validation turns into `UnknownObject`.
//
// Definitions are immutable once loaded. Footprints are validated at load
// time (`CatalogError::EmptyFootprint`) so the rest of the engine can assume
// `footprint_width >= 1 && footprint_height >= 1`.
//
// See also: `validate.rs` for how definitions gate placement, `nav.rs` for
// `InteriorLink` door handling, `drag.rs` / `editor.rs` for the async
// revalidation path that goes through `DefinitionSource`.

use crate::types::{GridCell, Layer, LocationKey};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Broad palette grouping of an object. Also drives the category exclusion
/// rule: some categories (wallpaper, flooring) are applied by a different
/// placement mode and may not be dropped on the grid directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Building,
    Furniture,
    Decoration,
    Path,
    Flooring,
    Wallpaper,
    Fence,
    Crafting,
    Tree,
    Crop,
    /// Any category this build does not know about.
    #[serde(other)]
    #[default]
    Other,
}

/// Link from a building object to the location template of its interior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteriorLink {
    /// Template location cloned for each placed copy of the building.
    pub template: LocationKey,
    /// Door cell as an offset from the building's anchor. Defaults to the
    /// bottom-centre cell of the footprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<GridCell>,
}

/// Static shape and rules of one placeable object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default = "one")]
    pub footprint_width: u32,
    #[serde(default = "one")]
    pub footprint_height: u32,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "yes")]
    pub placeable_indoors: bool,
    #[serde(default)]
    pub default_layer: Layer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interior: Option<InteriorLink>,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

impl ObjectDefinition {
    /// A 1×1 object of the given category on the objects layer.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            footprint_width: 1,
            footprint_height: 1,
            category,
            placeable_indoors: true,
            default_layer: Layer::OBJECTS,
            interior: None,
        }
    }

    pub fn with_footprint(mut self, width: u32, height: u32) -> Self {
        self.footprint_width = width;
        self.footprint_height = height;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.default_layer = layer;
        self
    }

    pub fn outdoor_only(mut self) -> Self {
        self.placeable_indoors = false;
        self
    }

    pub fn with_interior(mut self, template: impl Into<LocationKey>, door: Option<GridCell>) -> Self {
        self.interior = Some(InteriorLink {
            template: template.into(),
            door,
        });
        self
    }

    /// Door offset from the anchor: the declared one, or the bottom-centre
    /// footprint cell.
    pub fn door_offset(&self) -> Option<GridCell> {
        let link = self.interior.as_ref()?;
        Some(link.door.unwrap_or(GridCell::new(
            (self.footprint_width / 2) as i32,
            self.footprint_height.saturating_sub(1) as i32,
        )))
    }
}

/// Errors raised while building a catalog. These are structural: a catalog
/// that fails to load cannot be used at all.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("object `{key}` has an empty footprint ({width}x{height})")]
    EmptyFootprint { key: String, width: u32, height: u32 },
}

// ---------------------------------------------------------------------------
// Lookup seams
// ---------------------------------------------------------------------------

/// Synchronous definition lookup.
pub trait ObjectCatalog {
    fn definition(&self, object_key: &str) -> Option<&ObjectDefinition>;
}

/// Asynchronous definition lookup. Lookups that fail resolve to `None`; they
/// must never leave the caller waiting forever.
pub trait DefinitionSource: Sync {
    fn fetch_definition(
        &self,
        object_key: &str,
    ) -> impl Future<Output = Option<ObjectDefinition>> + Send;
}

/// Any synchronous catalog is also an (immediately ready) async source.
impl<C: ObjectCatalog + Sync> DefinitionSource for C {
    async fn fetch_definition(&self, object_key: &str) -> Option<ObjectDefinition> {
        self.definition(object_key).cloned()
    }
}

impl<C: ObjectCatalog + ?Sized> ObjectCatalog for &C {
    fn definition(&self, object_key: &str) -> Option<&ObjectDefinition> {
        (**self).definition(object_key)
    }
}

// ---------------------------------------------------------------------------
// JsonCatalog
// ---------------------------------------------------------------------------

/// In-memory catalog keyed by object key.
#[derive(Clone, Debug, Default)]
pub struct JsonCatalog {
    definitions: FxHashMap<String, ObjectDefinition>,
}

impl JsonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `objects.json` document: a map from object key to definition.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: FxHashMap<String, ObjectDefinition> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (key, definition) in raw {
            catalog.insert(key, definition)?;
        }
        log::debug!("catalog loaded with {} definitions", catalog.len());
        Ok(catalog)
    }

    /// Add or replace a definition. Rejects empty footprints.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        definition: ObjectDefinition,
    ) -> Result<(), CatalogError> {
        let key = key.into();
        if definition.footprint_width == 0 || definition.footprint_height == 0 {
            return Err(CatalogError::EmptyFootprint {
                key,
                width: definition.footprint_width,
                height: definition.footprint_height,
            });
        }
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Builder-style `insert` for fixtures. Panics on an empty footprint.
    pub fn with(mut self, key: impl Into<String>, definition: ObjectDefinition) -> Self {
        let key = key.into();
        assert!(
            definition.footprint_width > 0 && definition.footprint_height > 0,
            "object `{key}` must have a non-empty footprint"
        );
        self.definitions.insert(key, definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Keys of every definition in `category`, sorted. This is what the
    /// palette shows for a category tab.
    pub fn keys_in_category(&self, category: Category) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .definitions
            .iter()
            .filter(|(_, def)| def.category == category)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl ObjectCatalog for JsonCatalog {
    fn definition(&self, object_key: &str) -> Option<&ObjectDefinition> {
        self.definitions.get(object_key)
    }
}
