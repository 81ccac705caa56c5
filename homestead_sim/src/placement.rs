// Placement mutator: add, move, and remove placements in one location.
//
// Every mutation validates against the location's current state before
// writing, whatever the caller checked earlier. Validation and the write
// happen under the same `&mut Location` borrow, so no other reader can observe
// the list between the check and the update, and a refused mutation leaves
// the location untouched.
//
// Successful mutations record an `EditorEvent` on the `ChangeFeed`; the
// caller decides when to flush the coalesced change signal.
//
// See also: `validate.rs` for the rules, `editor.rs` for the drag and
// navigation wiring that calls into here.

use crate::catalog::ObjectCatalog;
use crate::event::{ChangeFeed, EditorEventKind};
use crate::location::{Location, Placement};
use crate::types::{GridCell, PlacementId, PlacementIdGenerator};
use crate::validate::{PlacementQuery, PlacementRules, Rejection, validate_placement};

/// Validate and append a new placement. The new placement gets a fresh id
/// and a cached copy of the definition's footprint.
pub fn place<C: ObjectCatalog + ?Sized>(
    location: &mut Location,
    catalog: &C,
    rules: &PlacementRules,
    ids: &mut PlacementIdGenerator,
    query: PlacementQuery<'_>,
    feed: &mut ChangeFeed,
) -> Result<Placement, Rejection> {
    let query = PlacementQuery { exclude: None, ..query };
    validate_placement(location, catalog, rules, &query)?;
    let def = catalog
        .definition(query.object_key)
        .ok_or_else(|| Rejection::UnknownObject {
            object_key: query.object_key.to_owned(),
        })?;

    let id = ids.next_id(|candidate| location.placement(candidate).is_some());
    let placement = Placement {
        id,
        object_key: query.object_key.to_owned(),
        grid_x: query.cell.x,
        grid_y: query.cell.y,
        layer: query.layer,
        footprint_width: Some(def.footprint_width),
        footprint_height: Some(def.footprint_height),
    };
    log::debug!(
        "placed {} as {} at {} in {}",
        placement.object_key,
        placement.id,
        query.cell,
        location.location_key
    );
    location.direct_placements.push(placement.clone());
    feed.record(EditorEventKind::PlacementAdded {
        location: location.location_key.clone(),
        id: placement.id.clone(),
        object_key: placement.object_key.clone(),
        at: query.cell,
    });
    Ok(placement)
}

/// Move an existing placement so its anchor lands on `to`. The destination is
/// validated against every other placement (the moved one is excluded).
/// Returns the previous anchor. Moving onto the current anchor succeeds
/// without recording anything.
pub fn move_placement<C: ObjectCatalog + ?Sized>(
    location: &mut Location,
    catalog: &C,
    rules: &PlacementRules,
    id: &PlacementId,
    to: GridCell,
    feed: &mut ChangeFeed,
) -> Result<GridCell, Rejection> {
    let placement = location
        .placement(id)
        .ok_or_else(|| Rejection::UnknownPlacement { id: id.clone() })?;
    let from = placement.anchor();
    if from == to {
        return Ok(from);
    }

    let query = PlacementQuery::new(&placement.object_key, to, placement.layer).excluding(id);
    validate_placement(location, catalog, rules, &query)?;

    let key = location.location_key.clone();
    if let Some(placement) = location.placement_mut(id) {
        placement.grid_x = to.x;
        placement.grid_y = to.y;
    }
    log::debug!("moved {id} from {from} to {to} in {key}");
    feed.record(EditorEventKind::PlacementMoved {
        location: key,
        id: id.clone(),
        from,
        to,
    });
    Ok(from)
}

/// Remove a placement by id. Returns false when there was nothing to remove.
pub fn remove(location: &mut Location, id: &PlacementId, feed: &mut ChangeFeed) -> bool {
    let Some(index) = location.direct_placements.iter().position(|p| &p.id == id) else {
        return false;
    };
    location.direct_placements.remove(index);
    log::debug!("removed {id} from {}", location.location_key);
    feed.record(EditorEventKind::PlacementRemoved {
        location: location.location_key.clone(),
        id: id.clone(),
    });
    true
}

/// Eraser: remove the topmost placement covering `cell`, if any.
pub fn remove_at<C: ObjectCatalog + ?Sized>(
    location: &mut Location,
    catalog: &C,
    cell: GridCell,
    feed: &mut ChangeFeed,
) -> Option<Placement> {
    let id = location.placement_at(cell, catalog)?.id.clone();
    let removed = location.placement(&id).cloned();
    if remove(location, &id, feed) { removed } else { None }
}
