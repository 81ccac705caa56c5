// homestead_sim: grid placement engine for the homestead layout editor.
//
// This crate holds everything the editor knows about *where things may
// legally exist* and how that changes as the user places, drags, and deletes
// objects: the location store, the placement validator and mutator, the drag
// and navigation state machines, change notification, and the persisted
// layout format. It has no rendering, asset, or UI dependencies; the host
// converts pointer pixels to grid cells and redraws when told something
// changed.
//
// Module overview:
// - `types.rs`:     GridCell, GridRect, Layer, PlacementId, LocationKey, id generator.
// - `catalog.rs`:   ObjectDefinition, the ObjectCatalog / DefinitionSource seams, JsonCatalog.
// - `location.rs`:  Placement, Location, LocationStore (templates + live instances).
// - `validate.rs`:  Placement rules and the Rejection reason taxonomy.
// - `placement.rs`: Validated place / move / remove.
// - `event.rs`:     Narrative EditorEvents + the coalesced ChangeFeed.
// - `drag.rs`:      Drag state machine with generation-tokened revalidation.
// - `nav.rs`:       Return stack, exit targets, door proximity, instance keys.
// - `snapshot.rs`:  LayoutSnapshot, the save/load wire shape.
// - `config.rs`:    EditorConfig, data-driven tunables.
// - `editor.rs`:    Editor, the owned session context tying it all together.
// - `command.rs`:   EditorAction, serializable actions dispatched by `Editor::apply`.
// - `error.rs`:     Structural error types.
//
// Two kinds of failure never mix: user-level refusals are `Rejection` values,
// structural faults are `EditorError`s. Ordered collections are `BTreeMap`s
// so snapshots and location lists come out in a stable order.

pub mod catalog;
pub mod command;
pub mod config;
pub mod drag;
pub mod editor;
pub mod error;
pub mod event;
pub mod location;
pub mod nav;
pub mod placement;
pub mod snapshot;
pub mod types;
pub mod validate;
