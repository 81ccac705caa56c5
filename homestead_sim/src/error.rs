// Structural errors.
//
// The engine separates two kinds of failure:
//
// - Rejections (`validate::Rejection`): "you can't put that there". These are
//   normal outcomes of user input, returned as values and never as errors.
// - Structural faults (this file): the engine's own data is unusable; a
//   location key that names nothing, a template that does not exist, a
//   corrupted or incompatible layout snapshot. These abort the operation and
//   leave the editor unchanged.
//
// See also: `validate.rs` for `Rejection`, `snapshot.rs` for where most
// `SnapshotError`s originate, `location.rs` for `check_invariants`.

use crate::types::{GridRect, LocationKey, PlacementId};
use thiserror::Error;

/// A broken location invariant found while checking loaded data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("placement id {id} appears twice in {location}")]
    DuplicateId { location: LocationKey, id: PlacementId },
    #[error("placement {id} lies outside the grid of {location}")]
    OutOfBounds { location: LocationKey, id: PlacementId },
    #[error("placement {id} in {location} covers blocked area {area}")]
    OnBlockedArea {
        location: LocationKey,
        id: PlacementId,
        area: GridRect,
    },
    #[error("placements {first} and {second} overlap in {location}")]
    Overlap {
        location: LocationKey,
        first: PlacementId,
        second: PlacementId,
    },
    #[error("outdoor-only placement {id} found in indoor location {location}")]
    OutdoorObjectIndoors { location: LocationKey, id: PlacementId },
}

/// Failure to rehydrate a layout snapshot. The editor keeps its previous
/// state whenever one of these is returned.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed layout snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported layout version {found} (this build reads {supported}.x)")]
    UnsupportedVersion { found: String, supported: String },
    #[error("layout refers to unknown location {0}")]
    UnknownLocation(LocationKey),
    #[error("layout instance {instance} refers to unknown template {template}")]
    UnknownTemplate {
        instance: LocationKey,
        template: LocationKey,
    },
    #[error("layout lists location {0} more than once")]
    DuplicateLocation(LocationKey),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Structural faults raised by editor operations.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("unknown location {0}")]
    UnknownLocation(LocationKey),
    #[error("no location is active")]
    NoActiveLocation,
    #[error("unknown location template {0}")]
    UnknownTemplate(LocationKey),
    #[error("malformed location data: {0}")]
    LocationData(serde_json::Error),
    #[error("malformed editor config: {0}")]
    Config(serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
