// Serializable editor actions.
//
// `EditorAction` mirrors the editor's public operations as data, so a host
// can queue input (from a UI thread, a script, or a replay file) and feed it
// to `Editor::apply` one action at a time. Applying an action is exactly
// equivalent to calling the corresponding method; `ActionOutcome` carries the
// method's result.
//
// Drag moves applied through here validate synchronously against the
// editor's own catalog (`pointer_move_validated`). Hosts that resolve
// definitions asynchronously call `pointer_move` / `complete_validation`
// directly instead.
//
// Only structural faults (unknown locations, missing templates) come back as
// `Err`; refusals are `ActionOutcome` values.
//
// See also: `editor.rs` for the operations themselves.

use crate::catalog::ObjectCatalog;
use crate::editor::{DropOutcome, Editor, NavOutcome, PointerDownOutcome, Selection};
use crate::error::EditorError;
use crate::location::Placement;
use crate::types::{GridCell, Layer, LocationKey, PlacementId};
use crate::validate::Rejection;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorAction {
    Select {
        object_key: String,
        #[serde(default)]
        layer: Option<Layer>,
    },
    Deselect,
    Place {
        object_key: String,
        cell: GridCell,
        layer: Layer,
    },
    Move {
        id: PlacementId,
        to: GridCell,
    },
    Remove {
        id: PlacementId,
    },
    RemoveAt {
        cell: GridCell,
    },
    PointerDown {
        cell: GridCell,
    },
    PointerMove {
        cell: GridCell,
    },
    PointerUp {
        cell: GridCell,
    },
    CancelDrag,
    Enter {
        location: LocationKey,
    },
    EnterBuilding {
        id: PlacementId,
        interaction: GridCell,
    },
    Exit,
    TravelTo {
        location: LocationKey,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Selected(Selection),
    Deselected(Option<Selection>),
    Placed(Placement),
    Moved { from: GridCell },
    Removed(bool),
    Erased(Option<Placement>),
    PointerDown(PointerDownOutcome),
    /// Validity of the new drag candidate; `None` when no drag is active.
    PointerMoved(Option<Result<(), Rejection>>),
    Dropped(DropOutcome),
    DragCancelled(Option<PlacementId>),
    Navigated(NavOutcome),
    Travelled,
    Rejected(Rejection),
}

impl<C: ObjectCatalog> Editor<C> {
    pub fn apply(&mut self, action: EditorAction) -> Result<ActionOutcome, EditorError> {
        let outcome = match action {
            EditorAction::Select { object_key, layer } => match self.select(&object_key, layer) {
                Ok(selection) => ActionOutcome::Selected(selection),
                Err(reason) => ActionOutcome::Rejected(reason),
            },
            EditorAction::Deselect => ActionOutcome::Deselected(self.deselect()),
            EditorAction::Place {
                object_key,
                cell,
                layer,
            } => match self.place(&object_key, cell, layer) {
                Ok(placement) => ActionOutcome::Placed(placement),
                Err(reason) => ActionOutcome::Rejected(reason),
            },
            EditorAction::Move { id, to } => match self.move_placement(&id, to) {
                Ok(from) => ActionOutcome::Moved { from },
                Err(reason) => ActionOutcome::Rejected(reason),
            },
            EditorAction::Remove { id } => ActionOutcome::Removed(self.remove(&id)),
            EditorAction::RemoveAt { cell } => ActionOutcome::Erased(self.remove_at(cell)),
            EditorAction::PointerDown { cell } => ActionOutcome::PointerDown(self.pointer_down(cell)),
            EditorAction::PointerMove { cell } => ActionOutcome::PointerMoved(self.pointer_move_validated(cell)),
            EditorAction::PointerUp { cell } => ActionOutcome::Dropped(self.pointer_up(cell)),
            EditorAction::CancelDrag => ActionOutcome::DragCancelled(self.cancel_drag()),
            EditorAction::Enter { location } => ActionOutcome::Navigated(self.enter(&location)?),
            EditorAction::EnterBuilding { id, interaction } => {
                ActionOutcome::Navigated(self.enter_building(&id, interaction)?)
            }
            EditorAction::Exit => ActionOutcome::Navigated(self.exit()),
            EditorAction::TravelTo { location } => {
                self.travel_to(&location)?;
                ActionOutcome::Travelled
            }
        };
        Ok(outcome)
    }
}
