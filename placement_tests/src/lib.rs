// Shared fixtures for editor integration tests.
//
// Provides a small but realistic world: an `objects.json`-shaped catalog, a
// set of location templates (farm, town, a 10x10 plot, barn and coop
// interiors), an editor built over them, and `DeferredSource`, an
// asynchronous definition source whose lookups stay pending until the test
// resolves them. That last one is what lets the tests make two drag
// validations complete in the opposite order they were issued.
//
// Everything here goes through the same public API a host would use; the
// only test-specific code is the manual resolution of pending lookups.
//
// See also: `tests/editor_session.rs` for the scenarios.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use homestead_sim::catalog::{DefinitionSource, JsonCatalog, ObjectCatalog, ObjectDefinition};
use homestead_sim::config::EditorConfig;
use homestead_sim::editor::Editor;
use homestead_sim::location::LocationStore;
use homestead_sim::types::GridCell;

/// Catalog in the `objects.json` shape.
pub const OBJECTS_JSON: &str = r#"{
    "crate": {
        "name": "Wooden Crate",
        "category": "decoration"
    },
    "stone_path": {
        "name": "Stone Path",
        "category": "path",
        "defaultLayer": 2
    },
    "barn": {
        "name": "Barn",
        "footprintWidth": 7,
        "footprintHeight": 4,
        "category": "building",
        "placeableIndoors": false,
        "interior": { "template": "barn" }
    },
    "chicken_coop": {
        "name": "Chicken Coop",
        "footprintWidth": 2,
        "footprintHeight": 2,
        "category": "building",
        "placeableIndoors": false,
        "interior": { "template": "coop", "door": { "x": 0, "y": 1 } }
    },
    "workbench": {
        "name": "Workbench",
        "footprintWidth": 2,
        "footprintHeight": 1,
        "category": "crafting"
    },
    "wallpaper_floral": {
        "name": "Floral Wallpaper",
        "category": "wallpaper"
    },
    "flooring_oak": {
        "name": "Oak Flooring",
        "category": "flooring"
    }
}"#;

/// Location templates: the `data/locations/*.json` documents as one array.
pub const LOCATIONS_JSON: &str = r#"[
    {
        "locationKey": "farm",
        "name": "Standard Farm",
        "gridWidth": 40,
        "gridHeight": 30,
        "blockedAreas": [
            { "x": 0, "y": 0, "width": 40, "height": 3 },
            { "x": 30, "y": 20, "width": 5, "height": 4 }
        ],
        "directPlacements": []
    },
    {
        "locationKey": "town",
        "name": "Town Square",
        "gridWidth": 30,
        "gridHeight": 30
    },
    {
        "locationKey": "plot",
        "name": "Garden Plot",
        "gridWidth": 10,
        "gridHeight": 10
    },
    {
        "locationKey": "barn",
        "name": "Barn",
        "gridWidth": 12,
        "gridHeight": 8,
        "indoors": true,
        "directPlacements": [
            { "id": "barn_trough", "objectKey": "crate", "gridX": 1, "gridY": 1, "layer": 3 }
        ]
    },
    {
        "locationKey": "coop",
        "name": "Coop",
        "gridWidth": 6,
        "gridHeight": 4,
        "indoors": true
    }
]"#;

pub fn fixture_catalog() -> JsonCatalog {
    JsonCatalog::from_json(OBJECTS_JSON).expect("fixture catalog parses")
}

pub fn fixture_store() -> LocationStore {
    LocationStore::from_json(LOCATIONS_JSON).expect("fixture locations parse")
}

/// Editor with default config, starting on the farm.
pub fn editor() -> Editor<JsonCatalog> {
    editor_with(EditorConfig::default())
}

pub fn editor_with(config: EditorConfig) -> Editor<JsonCatalog> {
    Editor::new(config, fixture_catalog(), fixture_store())
}

pub fn cell(x: i32, y: i32) -> GridCell {
    GridCell::new(x, y)
}

/// Subscribe a counter of delivered change signals.
pub fn count_signals<C: ObjectCatalog>(editor: &mut Editor<C>) -> Arc<AtomicU64> {
    let count = Arc::new(AtomicU64::new(0));
    let sink = Arc::clone(&count);
    editor.subscribe(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    count
}

// ---------------------------------------------------------------------------
// DeferredSource
// ---------------------------------------------------------------------------

struct PendingLookup {
    object_key: String,
    reply: oneshot::Sender<Option<ObjectDefinition>>,
}

/// Asynchronous definition source whose lookups resolve only when the test
/// says so. Lookups are numbered in the order they were issued.
pub struct DeferredSource {
    catalog: JsonCatalog,
    pending: Mutex<Vec<Option<PendingLookup>>>,
}

impl DeferredSource {
    pub fn new(catalog: JsonCatalog) -> Self {
        Self {
            catalog,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn lookups(&self) -> MutexGuard<'_, Vec<Option<PendingLookup>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of lookups issued so far (resolved or not).
    pub fn issued(&self) -> usize {
        self.lookups().len()
    }

    /// Complete lookup `index` with the catalog's answer. Returns false if it
    /// was already completed or never issued.
    pub fn resolve(&self, index: usize) -> bool {
        let Some(lookup) = self.lookups().get_mut(index).and_then(Option::take) else {
            return false;
        };
        let definition = self.catalog.definition(&lookup.object_key).cloned();
        lookup.reply.send(definition).is_ok()
    }

    /// Fail lookup `index` (as a dropped connection would).
    pub fn fail(&self, index: usize) -> bool {
        self.lookups().get_mut(index).and_then(Option::take).is_some()
    }
}

impl DefinitionSource for DeferredSource {
    fn fetch_definition(&self, object_key: &str) -> impl Future<Output = Option<ObjectDefinition>> + Send {
        let (reply, answer) = oneshot::channel();
        self.lookups().push(Some(PendingLookup {
            object_key: object_key.to_owned(),
            reply,
        }));
        async move { answer.await.ok().flatten() }
    }
}
