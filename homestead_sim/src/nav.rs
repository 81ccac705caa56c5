// Location navigation: the return stack and building-door rules.
//
// The active location changes three ways:
// - entering a building (or any location) pushes the current key onto the
//   return stack;
// - exiting pops it;
// - travelling (the location picker) is a top-level switch that clears the
//   stack.
//
// Interior instances are keyed deterministically from the parent location and
// the building's placement id (`instance_key`), so re-entering the same door
// from the same parent resumes the same interior, while any other placement
// of the same building type gets its own.
//
// Exiting returns to the popped key. `exit_targets` records, for each
// interior instance, the location it was first entered from; exit only falls
// back to it when the popped location no longer exists.
//
// See also: `editor.rs` for `enter`/`enter_building`/`exit`/`travel_to`,
// `location.rs` for `LocationStore::create_instance`.

use crate::catalog::ObjectDefinition;
use crate::location::Placement;
use crate::types::{GridCell, LocationKey, PlacementId};
use crate::validate::Rejection;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Separator between parent key and placement id in instance keys.
pub const INSTANCE_SEPARATOR: &str = "::";

/// Key of the interior instance behind `placement_id` in `parent`.
pub fn instance_key(parent: &LocationKey, placement_id: &PlacementId) -> LocationKey {
    LocationKey(format!("{parent}{INSTANCE_SEPARATOR}{placement_id}"))
}

/// Placement ids embedded in an instance key, outermost first. Empty for
/// template keys.
pub fn instance_placement_ids(key: &LocationKey) -> impl Iterator<Item = PlacementId> + '_ {
    key.as_str().split(INSTANCE_SEPARATOR).skip(1).map(PlacementId::from)
}

/// Absolute door cell of a building placement, if the object has an
/// interior.
pub fn door_cell(placement: &Placement, definition: &ObjectDefinition) -> Option<GridCell> {
    let offset = definition.door_offset()?;
    Some(placement.anchor().offset(offset.x, offset.y))
}

/// Check the door proximity rule. Returns the door cell when `interaction`
/// is within `reach` (Manhattan) of it.
pub fn door_in_reach(
    placement: &Placement,
    definition: &ObjectDefinition,
    interaction: GridCell,
    reach: u32,
) -> Result<GridCell, Rejection> {
    let door = door_cell(placement, definition).ok_or_else(|| Rejection::NotEnterable {
        id: placement.id.clone(),
    })?;
    let distance = door.manhattan_distance(interaction);
    if distance > reach {
        return Err(Rejection::DoorOutOfReach { distance, reach });
    }
    Ok(door)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    stack: SmallVec<[LocationKey; 4]>,
    exit_targets: BTreeMap<LocationKey, LocationKey>,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: LocationKey) {
        self.stack.push(key);
    }

    pub fn pop(&mut self) -> Option<LocationKey> {
        self.stack.pop()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_top_level(&self) -> bool {
        self.stack.is_empty()
    }

    /// Return stack, outermost first.
    pub fn stack(&self) -> &[LocationKey] {
        &self.stack
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Replace the stack wholesale (used when rehydrating a layout).
    pub fn set_stack(&mut self, keys: impl IntoIterator<Item = LocationKey>) {
        self.stack = keys.into_iter().collect();
    }

    /// Record where `instance` returns to. Only the first recording sticks.
    pub fn record_exit_target(&mut self, instance: LocationKey, parent: LocationKey) {
        self.exit_targets.entry(instance).or_insert(parent);
    }

    pub fn exit_target(&self, instance: &LocationKey) -> Option<&LocationKey> {
        self.exit_targets.get(instance)
    }

    pub fn exit_targets(&self) -> &BTreeMap<LocationKey, LocationKey> {
        &self.exit_targets
    }

    /// Forget everything (new layout).
    pub fn reset(&mut self) {
        self.stack.clear();
        self.exit_targets.clear();
    }
}
