// Drag state machine for picking up, move, validate, drop.
//
// States: `Idle` or `Dragging(DragSession)`. At most one session exists.
//
// A session remembers where the placement started (`original`, for
// snap-back), where the pointer grabbed it (`grab_offset`, so the object does
// not jump to align its corner with the cursor), and the current `candidate`
// anchor. Moving the pointer only updates the candidate; the stored placement
// is never touched until the drop commits.
//
// Revalidation during a drag may complete asynchronously and out of order.
// Each candidate update issues a `ValidationRequest` carrying a
// `ValidationTicket` of (session serial, generation). `apply_validation`
// accepts a result only if its ticket matches the live session and the latest
// generation issued for it; anything older is dropped. Session serials are
// never reused, so a late result from a previous drag can't land on a new
// one even if the generation numbers happen to coincide.
//
// This file is pure state; `editor.rs` wires it to pointer input, the
// validator, and the mutator.

use crate::location::Placement;
use crate::types::{GridCell, Layer, LocationKey, PlacementId};
use crate::validate::Rejection;
use serde::{Deserialize, Serialize};

/// Identifies one revalidation request within one drag session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationTicket {
    pub session: u64,
    pub generation: u64,
}

/// Everything needed to validate a drag candidate away from the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub ticket: ValidationTicket,
    pub location: LocationKey,
    pub placement_id: PlacementId,
    pub object_key: String,
    pub candidate: GridCell,
    pub layer: Layer,
}

/// An in-progress pick-up-move-drop cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSession {
    pub serial: u64,
    pub location: LocationKey,
    pub placement_id: PlacementId,
    pub object_key: String,
    pub layer: Layer,
    /// Anchor before the drag began.
    pub original: GridCell,
    /// Anchor the placement would have if dropped now.
    pub candidate: GridCell,
    /// Pointer cell minus anchor at pick-up.
    pub grab_offset: GridCell,
    /// Validity of the most recently applied validation.
    pub last_validity: bool,
    pub last_rejection: Option<Rejection>,
    pub latest_generation: u64,
    /// Generation of the result currently reflected in `last_validity`.
    /// Zero means the pick-up position, which is valid by construction.
    pub applied_generation: u64,
}

impl DragSession {
    /// Anchor for a pointer at `pointer`, keeping the pick-up offset.
    pub fn anchor_for(&self, pointer: GridCell) -> GridCell {
        pointer.offset(-self.grab_offset.x, -self.grab_offset.y)
    }

    pub fn ticket(&self) -> ValidationTicket {
        ValidationTicket {
            session: self.serial,
            generation: self.latest_generation,
        }
    }

    /// A request for the current candidate under the current generation.
    pub fn request(&self) -> ValidationRequest {
        ValidationRequest {
            ticket: self.ticket(),
            location: self.location.clone(),
            placement_id: self.placement_id.clone(),
            object_key: self.object_key.clone(),
            candidate: self.candidate,
            layer: self.layer,
        }
    }

    pub fn has_moved(&self) -> bool {
        self.candidate != self.original
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragController {
    state: DragState,
    next_serial: u64,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Pick up `placement` with the pointer at `pointer`. Any session already
    /// in progress is displaced and returned so the caller can report it as
    /// cancelled.
    pub fn begin(&mut self, location: LocationKey, placement: &Placement, pointer: GridCell) -> Option<DragSession> {
        self.next_serial += 1;
        let anchor = placement.anchor();
        let session = DragSession {
            serial: self.next_serial,
            location,
            placement_id: placement.id.clone(),
            object_key: placement.object_key.clone(),
            layer: placement.layer,
            original: anchor,
            candidate: anchor,
            grab_offset: GridCell::new(pointer.x - anchor.x, pointer.y - anchor.y),
            last_validity: true,
            last_rejection: None,
            latest_generation: 0,
            applied_generation: 0,
        };
        match std::mem::replace(&mut self.state, DragState::Dragging(session)) {
            DragState::Dragging(stale) => Some(stale),
            DragState::Idle => None,
        }
    }

    /// Recompute the candidate from a new pointer cell. Returns the request
    /// to validate it, or `None` when idle. Every call issues a fresh
    /// generation, even if the candidate did not change.
    pub fn update_candidate(&mut self, pointer: GridCell) -> Option<ValidationRequest> {
        let DragState::Dragging(session) = &mut self.state else {
            return None;
        };
        session.candidate = session.anchor_for(pointer);
        session.latest_generation += 1;
        Some(session.request())
    }

    /// Apply a validation result. Returns false (and changes nothing) when
    /// the ticket is stale: another session, or superseded by a later
    /// request.
    pub fn apply_validation(&mut self, ticket: ValidationTicket, result: Result<(), Rejection>) -> bool {
        let DragState::Dragging(session) = &mut self.state else {
            log::debug!("dropping validation {ticket:?}: no drag in progress");
            return false;
        };
        if ticket.session != session.serial || ticket.generation != session.latest_generation {
            log::debug!(
                "dropping stale validation {ticket:?} (latest is {:?})",
                session.ticket()
            );
            return false;
        }
        session.last_validity = result.is_ok();
        session.last_rejection = result.err();
        session.applied_generation = ticket.generation;
        true
    }

    /// End the session for a drop. The caller commits or snaps back.
    pub fn finish(&mut self) -> Option<DragSession> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    /// Abandon the session; the placement keeps its original position.
    pub fn cancel(&mut self) -> Option<DragSession> {
        let session = self.finish()?;
        log::debug!("drag of {} cancelled", session.placement_id);
        Some(session)
    }
}
