// Layout snapshot, the persisted form of the live location store.
//
// Wire shape (camelCase JSON):
//
//   { "version": "1.0",
//     "currentLocationKey": "farm",
//     "locations": [
//       { "locationKey": "farm",
//         "directPlacements": [ { "id", "objectKey", "gridX", "gridY", "layer",
//                                 "footprintWidth"?, "footprintHeight"? } ],
//         "blockedAreas"?: [ { "x", "y", "width", "height" } ],
//         "instanceOf"?: "barn",
//         "exitTarget"?: "farm" } ],
//     "navigationStack"?: [ "farm" ] }
//
// A snapshot lists every live location (templates included, edited or not)
// in key order, so capture → load → capture reproduces the same document.
// Static data that isn't in the snapshot (grid size, indoor flag, name) comes
// from the location templates.
//
// Placement ids are unique within a location. Interior instances copy their
// template's pre-placed objects, ids included, so the same id may appear in
// several instances.
//
// Loading is all-or-nothing. `rebuild` starts from a pristine copy of the
// templates, applies every location, and checks the version and every
// location's invariants; only a fully consistent result is returned. The
// editor swaps it in whole, so a bad snapshot never leaves a half-loaded
// store behind.
//
// See also: `editor.rs` (`snapshot`, `load_snapshot`, `to_json`,
// `load_json`), `error.rs` for `SnapshotError`.

use crate::catalog::ObjectCatalog;
use crate::config::major_version;
use crate::error::SnapshotError;
use crate::location::{LocationStore, Placement};
use crate::nav::NavigationState;
use crate::types::{GridRect, LocationKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    pub location_key: LocationKey,
    #[serde(default)]
    pub direct_placements: Vec<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_areas: Option<Vec<GridRect>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<LocationKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_target: Option<LocationKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub version: String,
    pub current_location_key: LocationKey,
    pub locations: Vec<LocationSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub navigation_stack: Vec<LocationKey>,
}

/// Store and navigation state rebuilt from a snapshot.
#[derive(Debug)]
pub struct RestoredLayout {
    pub store: LocationStore,
    pub navigation: NavigationState,
    pub current: LocationKey,
}

impl LayoutSnapshot {
    /// Capture every live location of `store`.
    pub fn capture(
        version: &str,
        store: &LocationStore,
        current: &LocationKey,
        navigation: &NavigationState,
    ) -> Self {
        let locations = store
            .locations()
            .map(|loc| LocationSnapshot {
                location_key: loc.location_key.clone(),
                direct_placements: loc.direct_placements.clone(),
                blocked_areas: Some(loc.blocked_areas.clone()),
                instance_of: loc.instance_of.clone(),
                exit_target: navigation.exit_target(&loc.location_key).cloned(),
            })
            .collect();
        Self {
            version: version.to_owned(),
            current_location_key: current.clone(),
            locations,
            navigation_stack: navigation.stack().to_vec(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild a store from `pristine` (a store with no live edits) plus this
    /// snapshot. `supported_major` is the major version this build reads.
    pub fn rebuild<C: ObjectCatalog + ?Sized>(
        &self,
        pristine: LocationStore,
        catalog: &C,
        supported_major: &str,
    ) -> Result<RestoredLayout, SnapshotError> {
        if major_version(&self.version) != supported_major {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version.clone(),
                supported: supported_major.to_owned(),
            });
        }

        let mut store = pristine;
        let mut navigation = NavigationState::new();
        let mut seen_locations = BTreeSet::new();

        for snap in &self.locations {
            let key = &snap.location_key;
            if !seen_locations.insert(key) {
                return Err(SnapshotError::DuplicateLocation(key.clone()));
            }

            let location = match &snap.instance_of {
                Some(template) => {
                    if store.template(template).is_none() {
                        return Err(SnapshotError::UnknownTemplate {
                            instance: key.clone(),
                            template: template.clone(),
                        });
                    }
                    store
                        .create_instance(template, key)
                        .map_err(|_| SnapshotError::UnknownLocation(key.clone()))?
                        .0
                }
                None => store
                    .get_mut(key)
                    .ok_or_else(|| SnapshotError::UnknownLocation(key.clone()))?,
            };

            location.direct_placements = snap.direct_placements.clone();
            if let Some(areas) = &snap.blocked_areas {
                location.blocked_areas = areas.clone();
            }
            location.check_invariants(catalog)?;

            if let Some(target) = &snap.exit_target {
                navigation.record_exit_target(key.clone(), target.clone());
            }
        }

        for key in self
            .navigation_stack
            .iter()
            .chain(std::iter::once(&self.current_location_key))
            .chain(navigation.exit_targets().values())
        {
            if !store.contains(key) {
                return Err(SnapshotError::UnknownLocation(key.clone()));
            }
        }
        navigation.set_stack(self.navigation_stack.iter().cloned());

        Ok(RestoredLayout {
            store,
            navigation,
            current: self.current_location_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, JsonCatalog, ObjectDefinition};
    use crate::error::InvariantViolation;
    use crate::location::Location;
    use crate::types::{Layer, PlacementId};

    fn catalog() -> JsonCatalog {
        JsonCatalog::new()
            .with("crate", ObjectDefinition::new("Crate", Category::Decoration))
            .with(
                "coop",
                ObjectDefinition::new("Coop", Category::Building).with_footprint(2, 2),
            )
    }

    fn templates() -> LocationStore {
        LocationStore::from_templates([
            Location::new("farm", 20, 20),
            Location::new("barn", 8, 6).indoors(),
        ])
    }

    fn placed(id: &str, key: &str, x: i32, y: i32) -> Placement {
        Placement {
            id: PlacementId::from(id),
            object_key: key.to_owned(),
            grid_x: x,
            grid_y: y,
            layer: Layer::OBJECTS,
            footprint_width: None,
            footprint_height: None,
        }
    }

    fn snapshot_json(body: &str) -> LayoutSnapshot {
        LayoutSnapshot::from_json(body).unwrap()
    }

    #[test]
    fn accepts_the_minimal_external_shape() {
        let snap = snapshot_json(
            r#"{
                "version": "1.0",
                "currentLocationKey": "farm",
                "locations": [{
                    "locationKey": "farm",
                    "directPlacements": [
                        { "id": "plc_1", "objectKey": "coop", "gridX": 10, "gridY": 10, "layer": 3 }
                    ]
                }]
            }"#,
        );
        let restored = snap.rebuild(templates(), &catalog(), "1").unwrap();
        let farm = restored.store.get(&LocationKey::from("farm")).unwrap();
        assert_eq!(farm.direct_placements, vec![placed("plc_1", "coop", 10, 10)]);
        assert_eq!(restored.current.as_str(), "farm");
        assert!(restored.navigation.is_top_level());
    }

    #[test]
    fn capture_then_rebuild_is_lossless() {
        let mut store = templates();
        let mut cached = placed("plc_1", "coop", 3, 3);
        cached.footprint_width = Some(2);
        cached.footprint_height = Some(2);
        store.get_mut(&LocationKey::from("farm")).unwrap().direct_placements.push(cached);
        let instance = LocationKey::from("farm::plc_1");
        store
            .create_instance(&LocationKey::from("barn"), &instance)
            .unwrap()
            .0
            .direct_placements
            .push(placed("plc_2", "crate", 1, 1));
        let mut nav = NavigationState::new();
        nav.push(LocationKey::from("farm"));
        nav.record_exit_target(instance.clone(), LocationKey::from("farm"));

        let snap = LayoutSnapshot::capture("1.0", &store, &instance, &nav);
        let json = snap.to_json().unwrap();
        let restored = LayoutSnapshot::from_json(&json)
            .unwrap()
            .rebuild(templates(), &catalog(), "1")
            .unwrap();

        let again = LayoutSnapshot::capture("1.0", &restored.store, &restored.current, &restored.navigation);
        assert_eq!(again, snap);
        assert!(json.contains("\"footprintWidth\": 2"));
        assert!(json.contains("\"instanceOf\": \"barn\""));
    }

    #[test]
    fn wrong_major_version_is_rejected() {
        let snap = snapshot_json(r#"{ "version": "2.0", "currentLocationKey": "farm", "locations": [] }"#);
        assert!(matches!(
            snap.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::UnsupportedVersion { .. })
        ));
        let minor = snapshot_json(r#"{ "version": "1.7", "currentLocationKey": "farm", "locations": [] }"#);
        assert!(minor.rebuild(templates(), &catalog(), "1").is_ok());
    }

    #[test]
    fn structural_faults_are_reported() {
        let unknown = snapshot_json(
            r#"{ "version": "1.0", "currentLocationKey": "farm",
                 "locations": [{ "locationKey": "moon", "directPlacements": [] }] }"#,
        );
        assert!(matches!(
            unknown.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::UnknownLocation(_))
        ));

        let bad_template = snapshot_json(
            r#"{ "version": "1.0", "currentLocationKey": "farm",
                 "locations": [{ "locationKey": "farm::x", "instanceOf": "castle" }] }"#,
        );
        assert!(matches!(
            bad_template.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::UnknownTemplate { .. })
        ));

        let dup_ids = snapshot_json(
            r#"{ "version": "1.0", "currentLocationKey": "farm", "locations": [
                 { "locationKey": "farm", "directPlacements": [
                     { "id": "plc_1", "objectKey": "crate", "gridX": 0, "gridY": 0, "layer": 3 },
                     { "id": "plc_1", "objectKey": "crate", "gridX": 5, "gridY": 5, "layer": 3 } ] } ] }"#,
        );
        assert!(matches!(
            dup_ids.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::Invariant(InvariantViolation::DuplicateId { .. }))
        ));

        let dup_location = snapshot_json(
            r#"{ "version": "1.0", "currentLocationKey": "farm", "locations": [
                 { "locationKey": "farm" }, { "locationKey": "farm" } ] }"#,
        );
        assert!(matches!(
            dup_location.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::DuplicateLocation(_))
        ));

        let overlapping = snapshot_json(
            r#"{ "version": "1.0", "currentLocationKey": "farm", "locations": [
                 { "locationKey": "farm", "directPlacements": [
                     { "id": "a", "objectKey": "coop", "gridX": 10, "gridY": 10, "layer": 3 },
                     { "id": "b", "objectKey": "crate", "gridX": 11, "gridY": 11, "layer": 3 } ] } ] }"#,
        );
        assert!(matches!(
            overlapping.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::Invariant(_))
        ));

        let lost = snapshot_json(r#"{ "version": "1.0", "currentLocationKey": "attic", "locations": [] }"#);
        assert!(matches!(
            lost.rebuild(templates(), &catalog(), "1"),
            Err(SnapshotError::UnknownLocation(_))
        ));

        assert!(matches!(LayoutSnapshot::from_json("{ nope"), Err(SnapshotError::Json(_))));
    }
}
