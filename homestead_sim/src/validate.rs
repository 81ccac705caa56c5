// Placement validation.
//
// Decides whether an object may occupy a footprint on a layer of a location.
// Validation is a pure read of the location and catalog; it never mutates.
//
// Checks run in a fixed order and the first failure wins, so the reported
// reason is deterministic:
//
//   1. UnknownObject:       no definition for the object key.
//   2. CategoryRestricted:  category reserved for another placement mode.
//   3. OutOfBounds:         footprint leaves [0, gridWidth) × [0, gridHeight).
//   4. BlockedTerrain:      footprint intersects a static blocked area.
//   5. Overlap:             footprint intersects another placement on the
//                           same layer (the excluded id is skipped, so a
//                           dragged placement never collides with itself).
//   6. IndoorRestricted:    outdoor-only object in an indoor location.
//
// Collision uses full rectangle intersection of both footprints. A 2×2
// building overlapping a 1×1 crate by a single cell is a collision even
// though neither anchor lies inside the other.
//
// `Rejection` is the complete reason taxonomy for user-level refusals,
// including the navigation refusals raised by `editor.rs`. Every refusal in
// the engine carries one of these; there is no reason-less `false`.
//
// See also: `placement.rs` which revalidates before every mutation,
// `editor.rs` for the drag and navigation paths that surface rejections,
// `location.rs` for footprint resolution.

use crate::catalog::{Category, ObjectCatalog, ObjectDefinition};
use crate::location::Location;
use crate::types::{GridCell, GridRect, Layer, PlacementId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a placement, move, or navigation request was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Rejection {
    /// The catalog has no definition for this object key (or the lookup failed).
    UnknownObject { object_key: String },
    /// Objects of this category cannot be placed directly on the grid.
    CategoryRestricted { category: Category },
    /// The footprint extends past the edge of the grid.
    OutOfBounds,
    /// The footprint covers a blocked area.
    BlockedTerrain { area: GridRect },
    /// The footprint overlaps another placement on the same layer.
    Overlap { with: PlacementId },
    /// The object can only be placed outdoors.
    IndoorRestricted,
    /// No location is active.
    NoCurrentLocation,
    /// Exit requested at a top-level location.
    NavigationStackEmpty,
    /// The placement id does not exist in the active location.
    UnknownPlacement { id: PlacementId },
    /// The placement is not a building with an interior.
    NotEnterable { id: PlacementId },
    /// The interaction point is too far from the building's door.
    DoorOutOfReach { distance: u32, reach: u32 },
}

impl Rejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnknownObject { .. } => "UnknownObject",
            Rejection::CategoryRestricted { .. } => "CategoryRestricted",
            Rejection::OutOfBounds => "OutOfBounds",
            Rejection::BlockedTerrain { .. } => "BlockedTerrain",
            Rejection::Overlap { .. } => "Overlap",
            Rejection::IndoorRestricted => "IndoorRestricted",
            Rejection::NoCurrentLocation => "NoCurrentLocation",
            Rejection::NavigationStackEmpty => "NavigationStackEmpty",
            Rejection::UnknownPlacement { .. } => "UnknownPlacement",
            Rejection::NotEnterable { .. } => "NotEnterable",
            Rejection::DoorOutOfReach { .. } => "DoorOutOfReach",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownObject { object_key } => write!(f, "unknown object `{object_key}`"),
            Rejection::CategoryRestricted { category } => {
                write!(f, "{category:?} objects can't be placed on the grid")
            }
            Rejection::OutOfBounds => write!(f, "outside the map"),
            Rejection::BlockedTerrain { area } => write!(f, "blocked terrain ({area})"),
            Rejection::Overlap { with } => write!(f, "overlaps {with}"),
            Rejection::IndoorRestricted => write!(f, "can only be placed outdoors"),
            Rejection::NoCurrentLocation => write!(f, "no location is open"),
            Rejection::NavigationStackEmpty => write!(f, "nowhere to exit to"),
            Rejection::UnknownPlacement { id } => write!(f, "no placement {id} here"),
            Rejection::NotEnterable { id } => write!(f, "{id} has no interior"),
            Rejection::DoorOutOfReach { distance, reach } => {
                write!(f, "door is {distance} tiles away (reach {reach})")
            }
        }
    }
}

/// Location-independent placement rules, derived from `EditorConfig`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacementRules {
    pub restricted_categories: Vec<Category>,
}

/// A candidate placement to validate.
#[derive(Clone, Copy, Debug)]
pub struct PlacementQuery<'a> {
    pub object_key: &'a str,
    pub cell: GridCell,
    pub layer: Layer,
    /// Placement to ignore for collision (the one being moved).
    pub exclude: Option<&'a PlacementId>,
}

impl<'a> PlacementQuery<'a> {
    pub fn new(object_key: &'a str, cell: GridCell, layer: Layer) -> Self {
        Self {
            object_key,
            cell,
            layer,
            exclude: None,
        }
    }

    pub fn excluding(mut self, id: &'a PlacementId) -> Self {
        self.exclude = Some(id);
        self
    }
}

/// Validate `query` against `location`, resolving the object's definition
/// from `catalog`.
pub fn validate_placement<C: ObjectCatalog + ?Sized>(
    location: &Location,
    catalog: &C,
    rules: &PlacementRules,
    query: &PlacementQuery<'_>,
) -> Result<(), Rejection> {
    let definition = catalog.definition(query.object_key);
    validate_with_definition(location, definition, catalog, rules, query)
}

/// Validate `query` with an already-resolved definition. `catalog` is still
/// needed to resolve the footprints of placements that lack cached
/// dimensions.
pub fn validate_with_definition<C: ObjectCatalog + ?Sized>(
    location: &Location,
    definition: Option<&ObjectDefinition>,
    catalog: &C,
    rules: &PlacementRules,
    query: &PlacementQuery<'_>,
) -> Result<(), Rejection> {
    // 1. Definition must exist.
    let Some(def) = definition else {
        return Err(Rejection::UnknownObject {
            object_key: query.object_key.to_owned(),
        });
    };

    // 2. Category exclusion.
    if rules.restricted_categories.contains(&def.category) {
        return Err(Rejection::CategoryRestricted {
            category: def.category,
        });
    }

    // 3. Bounds.
    let footprint = GridRect::at(query.cell, def.footprint_width, def.footprint_height);
    if !footprint.within_grid(location.grid_width, location.grid_height) {
        return Err(Rejection::OutOfBounds);
    }

    // 4. Blocked areas.
    if let Some(area) = location.blocked_areas.iter().find(|a| a.intersects(&footprint)) {
        return Err(Rejection::BlockedTerrain { area: *area });
    }

    // 5. Collision on the same layer.
    let collision = location
        .direct_placements
        .iter()
        .filter(|p| p.layer == query.layer)
        .filter(|p| query.exclude != Some(&p.id))
        .find(|p| location.footprint_of(p, catalog).intersects(&footprint));
    if let Some(other) = collision {
        return Err(Rejection::Overlap {
            with: other.id.clone(),
        });
    }

    // 6. Indoor/outdoor.
    if location.indoors && !def.placeable_indoors {
        return Err(Rejection::IndoorRestricted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JsonCatalog;
    use crate::location::Placement;

    fn catalog() -> JsonCatalog {
        JsonCatalog::new()
            .with("crate", ObjectDefinition::new("Crate", Category::Decoration))
            .with(
                "coop",
                ObjectDefinition::new("Coop", Category::Building)
                    .with_footprint(2, 2)
                    .outdoor_only(),
            )
            .with(
                "walkway",
                ObjectDefinition::new("Walkway", Category::Path).with_layer(Layer::PATHS),
            )
            .with("wallpaper_blue", ObjectDefinition::new("Blue", Category::Wallpaper))
    }

    fn rules() -> PlacementRules {
        PlacementRules {
            restricted_categories: vec![Category::Wallpaper, Category::Flooring],
        }
    }

    fn put(location: &mut Location, id: &str, key: &str, x: i32, y: i32, layer: Layer) {
        location.direct_placements.push(Placement {
            id: PlacementId::from(id),
            object_key: key.to_owned(),
            grid_x: x,
            grid_y: y,
            layer,
            footprint_width: None,
            footprint_height: None,
        });
    }

    fn check(location: &Location, key: &str, x: i32, y: i32) -> Result<(), Rejection> {
        validate_placement(
            location,
            &catalog(),
            &rules(),
            &PlacementQuery::new(key, GridCell::new(x, y), Layer::OBJECTS),
        )
    }

    #[test]
    fn unknown_object_is_rejected_first() {
        // Even out of bounds, the unknown object is what gets reported.
        let loc = Location::new("farm", 10, 10);
        assert_eq!(
            check(&loc, "unicorn", -5, -5),
            Err(Rejection::UnknownObject {
                object_key: "unicorn".into()
            })
        );
    }

    #[test]
    fn restricted_category_is_rejected_before_bounds() {
        let loc = Location::new("farm", 10, 10);
        assert_eq!(
            check(&loc, "wallpaper_blue", 50, 50),
            Err(Rejection::CategoryRestricted {
                category: Category::Wallpaper
            })
        );
    }

    #[test]
    fn bounds_on_a_ten_by_ten_grid() {
        let loc = Location::new("farm", 10, 10);
        assert_eq!(check(&loc, "crate", 9, 9), Ok(()));
        assert_eq!(check(&loc, "crate", 10, 9), Err(Rejection::OutOfBounds));
        assert_eq!(check(&loc, "crate", 9, 10), Err(Rejection::OutOfBounds));
        assert_eq!(check(&loc, "crate", -1, 0), Err(Rejection::OutOfBounds));
        // A 2x2 anchored on the last column spills over.
        assert_eq!(check(&loc, "coop", 9, 0), Err(Rejection::OutOfBounds));
        assert_eq!(check(&loc, "coop", 8, 8), Ok(()));
    }

    #[test]
    fn blocked_area_rejects_any_intersection() {
        let area = GridRect::new(4, 4, 2, 2);
        let loc = Location::new("farm", 10, 10).with_blocked_area(area);
        assert_eq!(check(&loc, "coop", 3, 3), Err(Rejection::BlockedTerrain { area }));
        assert_eq!(check(&loc, "crate", 5, 5), Err(Rejection::BlockedTerrain { area }));
        assert_eq!(check(&loc, "coop", 2, 2), Ok(()));
        assert_eq!(check(&loc, "crate", 6, 4), Ok(()));
    }

    #[test]
    fn footprint_collision_uses_full_rectangles() {
        let mut loc = Location::new("farm", 40, 40);
        put(&mut loc, "coop1", "coop", 10, 10, Layer::OBJECTS);

        assert_eq!(
            check(&loc, "crate", 11, 11),
            Err(Rejection::Overlap {
                with: PlacementId::from("coop1")
            })
        );
        assert_eq!(check(&loc, "crate", 12, 10), Ok(()));

        // A new 2x2 whose anchor lies outside the existing one still collides.
        assert_eq!(
            check(&loc, "coop", 9, 9),
            Err(Rejection::Overlap {
                with: PlacementId::from("coop1")
            })
        );
    }

    #[test]
    fn different_layers_do_not_collide() {
        let mut loc = Location::new("farm", 10, 10);
        put(&mut loc, "w", "walkway", 3, 3, Layer::PATHS);
        assert_eq!(check(&loc, "crate", 3, 3), Ok(()));
        let on_paths = validate_placement(
            &loc,
            &catalog(),
            &rules(),
            &PlacementQuery::new("walkway", GridCell::new(3, 3), Layer::PATHS),
        );
        assert_eq!(
            on_paths,
            Err(Rejection::Overlap {
                with: PlacementId::from("w")
            })
        );
    }

    #[test]
    fn excluded_placement_does_not_collide_with_itself() {
        let mut loc = Location::new("farm", 20, 20);
        put(&mut loc, "coop1", "coop", 5, 5, Layer::OBJECTS);
        let id = PlacementId::from("coop1");

        // Shift by one cell: overlaps its own old footprint only.
        let query = PlacementQuery::new("coop", GridCell::new(6, 5), Layer::OBJECTS).excluding(&id);
        assert_eq!(validate_placement(&loc, &catalog(), &rules(), &query), Ok(()));

        let query = PlacementQuery::new("coop", GridCell::new(6, 5), Layer::OBJECTS);
        assert!(validate_placement(&loc, &catalog(), &rules(), &query).is_err());
    }

    #[test]
    fn indoor_rule_is_checked_last() {
        let mut loc = Location::new("barn", 10, 10).indoors();
        assert_eq!(check(&loc, "coop", 0, 0), Err(Rejection::IndoorRestricted));
        assert_eq!(check(&loc, "crate", 0, 0), Ok(()));

        // An overlap at the same spot wins over the indoor rule.
        put(&mut loc, "c", "crate", 0, 0, Layer::OBJECTS);
        assert!(matches!(check(&loc, "coop", 0, 0), Err(Rejection::Overlap { .. })));
    }

    #[test]
    fn cached_footprint_is_used_for_existing_placements() {
        let mut loc = Location::new("farm", 20, 20);
        put(&mut loc, "wide", "crate", 0, 0, Layer::OBJECTS);
        // Recorded as 3x1 at placement time even though the catalog now says 1x1.
        loc.direct_placements[0].footprint_width = Some(3);
        loc.direct_placements[0].footprint_height = Some(1);
        assert!(matches!(check(&loc, "crate", 2, 0), Err(Rejection::Overlap { .. })));
        assert_eq!(check(&loc, "crate", 3, 0), Ok(()));
    }

    #[test]
    fn supplied_definition_bypasses_catalog_lookup() {
        let loc = Location::new("farm", 10, 10);
        let remote = ObjectDefinition::new("Remote bench", Category::Furniture).with_footprint(3, 1);
        let query = PlacementQuery::new("remote_bench", GridCell::new(8, 0), Layer::OBJECTS);
        assert_eq!(
            validate_with_definition(&loc, Some(&remote), &catalog(), &rules(), &query),
            Err(Rejection::OutOfBounds)
        );
        assert!(matches!(
            validate_with_definition(&loc, None, &catalog(), &rules(), &query),
            Err(Rejection::UnknownObject { .. })
        ));
    }

    #[test]
    fn every_rejection_has_code_and_message() {
        let all = [
            Rejection::UnknownObject { object_key: "x".into() },
            Rejection::CategoryRestricted { category: Category::Flooring },
            Rejection::OutOfBounds,
            Rejection::BlockedTerrain { area: GridRect::new(0, 0, 1, 1) },
            Rejection::Overlap { with: PlacementId::from("p") },
            Rejection::IndoorRestricted,
            Rejection::NoCurrentLocation,
            Rejection::NavigationStackEmpty,
            Rejection::UnknownPlacement { id: PlacementId::from("p") },
            Rejection::NotEnterable { id: PlacementId::from("p") },
            Rejection::DoorOutOfReach { distance: 5, reach: 2 },
        ];
        for rejection in &all {
            assert!(!rejection.code().is_empty());
            assert!(!rejection.to_string().is_empty());
        }
        let json = serde_json::to_string(&Rejection::OutOfBounds).unwrap();
        assert_eq!(json, r#"{"reason":"outOfBounds"}"#);
    }
}
