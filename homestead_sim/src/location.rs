// Location store: per-location placements and static zone data.
//
// A `Location` is one editable grid: a farm, a town square, or the interior of
// one particular barn. It owns its `direct_placements` (the mutable part) and
// carries static data loaded with it: grid size, the indoor flag, and
// `blocked_areas` (rectangles where nothing may be built).
//
// `LocationStore` keeps two maps:
// - `templates`: the pristine locations as loaded from data. Never edited.
// - `locations`: the live, editable copies. Interior instances are created
//   here by deep-copying a template (`create_instance`), so every visited
//   building has its own independent placement list.
//
// Both maps are `BTreeMap`s so iteration (snapshot order, location lists) is
// stable across runs.
//
// Draw order and hit-testing share one rule: placements sort by layer, then
// by anchor row (`grid_y`, the y-sort), then by insertion order. The last
// placement in that order covering a cell is the one the pointer grabs.
//
// See also: `types.rs` for geometry, `validate.rs` for the placement rules,
// `placement.rs` for the mutations, `snapshot.rs` for persistence.

use crate::catalog::ObjectCatalog;
use crate::error::{EditorError, InvariantViolation};
use crate::types::{GridCell, GridRect, Layer, LocationKey, PlacementId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// One placed object. `grid_x`/`grid_y` anchor the top-left cell of the
/// footprint.
///
/// `footprint_width`/`footprint_height` are a copy of the definition taken at
/// placement time. Layouts saved by older builds omit them, in which case the
/// footprint is resolved from the catalog instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: PlacementId,
    pub object_key: String,
    pub grid_x: i32,
    pub grid_y: i32,
    pub layer: Layer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint_height: Option<u32>,
}

impl Placement {
    pub fn anchor(&self) -> GridCell {
        GridCell::new(self.grid_x, self.grid_y)
    }

    /// The cached footprint dimensions, if both were recorded.
    pub fn cached_footprint(&self) -> Option<(u32, u32)> {
        match (self.footprint_width, self.footprint_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// One editable grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_key: LocationKey,
    #[serde(default)]
    pub name: String,
    pub grid_width: u32,
    pub grid_height: u32,
    #[serde(default)]
    pub indoors: bool,
    #[serde(default)]
    pub blocked_areas: Vec<GridRect>,
    #[serde(default)]
    pub direct_placements: Vec<Placement>,
    /// Template this location was cloned from, for building interiors.
    /// `None` for template/top-level locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<LocationKey>,
}

impl Location {
    /// An empty outdoor location.
    pub fn new(key: impl Into<LocationKey>, grid_width: u32, grid_height: u32) -> Self {
        let location_key = key.into();
        Self {
            name: location_key.to_string(),
            location_key,
            grid_width,
            grid_height,
            indoors: false,
            blocked_areas: Vec::new(),
            direct_placements: Vec::new(),
            instance_of: None,
        }
    }

    pub fn indoors(mut self) -> Self {
        self.indoors = true;
        self
    }

    pub fn with_blocked_area(mut self, area: GridRect) -> Self {
        self.blocked_areas.push(area);
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.direct_placements.push(placement);
        self
    }

    pub fn is_instance(&self) -> bool {
        self.instance_of.is_some()
    }

    pub fn placement(&self, id: &PlacementId) -> Option<&Placement> {
        self.direct_placements.iter().find(|p| &p.id == id)
    }

    pub fn placement_mut(&mut self, id: &PlacementId) -> Option<&mut Placement> {
        self.direct_placements.iter_mut().find(|p| &p.id == id)
    }

    /// Footprint rectangle of `placement`: cached dimensions first, then the
    /// catalog, then 1×1 for objects the catalog no longer knows.
    pub fn footprint_of<C: ObjectCatalog + ?Sized>(&self, placement: &Placement, catalog: &C) -> GridRect {
        let (w, h) = placement
            .cached_footprint()
            .or_else(|| {
                catalog
                    .definition(&placement.object_key)
                    .map(|def| (def.footprint_width, def.footprint_height))
            })
            .unwrap_or((1, 1));
        GridRect::at(placement.anchor(), w, h)
    }

    /// Placements in draw order: by layer, then anchor row, then insertion.
    pub fn draw_order(&self) -> Vec<&Placement> {
        let mut sorted: Vec<&Placement> = self.direct_placements.iter().collect();
        // Stable sort keeps insertion order as the final tiebreak.
        sorted.sort_by_key(|p| (p.layer, p.grid_y));
        sorted
    }

    /// The topmost placement (last in draw order) whose footprint covers
    /// `cell`, on any layer.
    pub fn placement_at<C: ObjectCatalog + ?Sized>(&self, cell: GridCell, catalog: &C) -> Option<&Placement> {
        self.draw_order()
            .into_iter()
            .rev()
            .find(|p| self.footprint_of(p, catalog).contains(cell))
    }

    /// Verify the location's structural invariants. Used when rehydrating a
    /// snapshot; a live editor maintains them through validation.
    pub fn check_invariants<C: ObjectCatalog + ?Sized>(&self, catalog: &C) -> Result<(), InvariantViolation> {
        let key = &self.location_key;
        let mut seen = BTreeSet::new();
        for placement in &self.direct_placements {
            if !seen.insert(&placement.id) {
                return Err(InvariantViolation::DuplicateId {
                    location: key.clone(),
                    id: placement.id.clone(),
                });
            }
        }

        let footprints: Vec<(&Placement, GridRect)> = self
            .direct_placements
            .iter()
            .map(|p| (p, self.footprint_of(p, catalog)))
            .collect();

        for (i, (placement, rect)) in footprints.iter().enumerate() {
            if !rect.within_grid(self.grid_width, self.grid_height) {
                return Err(InvariantViolation::OutOfBounds {
                    location: key.clone(),
                    id: placement.id.clone(),
                });
            }
            if let Some(area) = self.blocked_areas.iter().find(|a| a.intersects(rect)) {
                return Err(InvariantViolation::OnBlockedArea {
                    location: key.clone(),
                    id: placement.id.clone(),
                    area: *area,
                });
            }
            if self.indoors
                && catalog
                    .definition(&placement.object_key)
                    .is_some_and(|def| !def.placeable_indoors)
            {
                return Err(InvariantViolation::OutdoorObjectIndoors {
                    location: key.clone(),
                    id: placement.id.clone(),
                });
            }
            for (other, other_rect) in &footprints[i + 1..] {
                if other.layer == placement.layer && rect.intersects(other_rect) {
                    return Err(InvariantViolation::Overlap {
                        location: key.clone(),
                        first: placement.id.clone(),
                        second: other.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Location store
// ---------------------------------------------------------------------------

/// Short description of a location for location pickers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub key: LocationKey,
    pub name: String,
    pub grid_width: u32,
    pub grid_height: u32,
    pub indoors: bool,
    pub is_instance: bool,
}

/// Templates plus the live, editable locations.
#[derive(Clone, Debug, Default)]
pub struct LocationStore {
    templates: BTreeMap<LocationKey, Location>,
    locations: BTreeMap<LocationKey, Location>,
}

impl LocationStore {
    /// Build a store whose live locations start as copies of `templates`.
    pub fn from_templates(templates: impl IntoIterator<Item = Location>) -> Self {
        let templates: BTreeMap<LocationKey, Location> = templates
            .into_iter()
            .map(|loc| (loc.location_key.clone(), loc))
            .collect();
        let locations = templates.clone();
        Self {
            templates,
            locations,
        }
    }

    /// Parse an array of location documents (the `data/locations/*.json`
    /// files concatenated into one list).
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let templates: Vec<Location> = serde_json::from_str(json).map_err(EditorError::LocationData)?;
        log::debug!("loaded {} location templates", templates.len());
        Ok(Self::from_templates(templates))
    }

    pub fn get(&self, key: &LocationKey) -> Option<&Location> {
        self.locations.get(key)
    }

    pub fn get_mut(&mut self, key: &LocationKey) -> Option<&mut Location> {
        self.locations.get_mut(key)
    }

    pub fn contains(&self, key: &LocationKey) -> bool {
        self.locations.contains_key(key)
    }

    pub fn template(&self, key: &LocationKey) -> Option<&Location> {
        self.templates.get(key)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Replace (or add) a live location.
    pub fn insert(&mut self, location: Location) {
        self.locations.insert(location.location_key.clone(), location);
    }

    /// Return the live instance `instance_key`, creating it from `template`
    /// if it does not exist yet. The new instance is a deep copy of the
    /// pristine template; nothing is shared with it or with other instances.
    /// The `bool` is true when the instance was freshly created.
    pub fn create_instance(
        &mut self,
        template: &LocationKey,
        instance_key: &LocationKey,
    ) -> Result<(&mut Location, bool), EditorError> {
        let created = !self.locations.contains_key(instance_key);
        if created {
            let base = self
                .templates
                .get(template)
                .ok_or_else(|| EditorError::UnknownTemplate(template.clone()))?;
            let mut instance = base.clone();
            instance.location_key = instance_key.clone();
            instance.instance_of = Some(template.clone());
            log::info!("creating location instance {instance_key} from {template}");
            self.locations.insert(instance_key.clone(), instance);
        }
        let location = self
            .locations
            .get_mut(instance_key)
            .ok_or_else(|| EditorError::UnknownLocation(instance_key.clone()))?;
        Ok((location, created))
    }

    /// Whether any live location already uses `id`.
    pub fn contains_placement_id(&self, id: &PlacementId) -> bool {
        self.locations
            .values()
            .any(|loc| loc.direct_placements.iter().any(|p| &p.id == id))
    }

    /// Every placement id in the live store.
    pub fn placement_ids(&self) -> impl Iterator<Item = &PlacementId> {
        self.locations
            .values()
            .flat_map(|loc| loc.direct_placements.iter().map(|p| &p.id))
    }

    /// Discard all edits and instances: live locations become copies of the
    /// templates again.
    pub fn reset(&mut self) {
        self.locations = self.templates.clone();
    }

    /// A store with the same templates and no live edits.
    pub fn pristine(&self) -> Self {
        Self {
            templates: self.templates.clone(),
            locations: self.templates.clone(),
        }
    }

    /// Summaries of every live location, in key order.
    pub fn summaries(&self) -> Vec<LocationSummary> {
        self.locations
            .values()
            .map(|loc| LocationSummary {
                key: loc.location_key.clone(),
                name: loc.name.clone(),
                grid_width: loc.grid_width,
                grid_height: loc.grid_height,
                indoors: loc.indoors,
                is_instance: loc.is_instance(),
            })
            .collect()
    }
}
