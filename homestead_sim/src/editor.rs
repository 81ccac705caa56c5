// The editor: the owned application context for one editing session.
//
// `Editor` ties the pieces together: the catalog, the live location store,
// the active location, the navigation stack, the drag controller, the pending
// palette selection, the placement id generator, and the change feed. The
// host owns one `Editor` and drives it with grid-coordinate input; nothing is
// global.
//
// Every public operation that can change what a renderer shows ends by
// flushing the change feed, so subscribers get at most one signal per
// operation. `batch` defers the flush to the end of a closure so a group of
// operations produces a single signal.
//
// Pointer input:
// - pointer-down first cancels any drag still in progress (a stuck session
//   from an interrupted event sequence). Then, with a palette selection
//   pending, it places the selected object; placement intent wins over
//   picking up whatever is under the cursor. Without a selection it picks up
//   the topmost placement whose footprint covers the cell.
// - pointer-move updates the drag candidate and returns a validation request.
//   `pointer_move_validated` resolves it synchronously; hosts with an
//   asynchronous definition source use `resolve_validation` +
//   `complete_validation`, and only the latest request's result sticks.
// - pointer-up validates the final candidate and either commits the move or
//   snaps back.
//
// Navigation: `enter` / `enter_instance` / `enter_building` push the current
// location, `exit` pops, `travel_to` is a top-level switch. Any switch
// cancels an active drag.
//
// A user-level refusal comes back as a `Rejection` (or an outcome enum that
// carries one). `EditorError` is reserved for structural faults: unknown
// location keys, missing templates, bad snapshots.
//
// See also: `placement.rs` for mutations, `drag.rs` for the drag state,
// `nav.rs` for navigation rules, `snapshot.rs` for persistence, `command.rs`
// for the serializable action interface.

use crate::catalog::{DefinitionSource, ObjectCatalog, ObjectDefinition};
use crate::config::EditorConfig;
use crate::drag::{DragController, DragSession, ValidationRequest};
use crate::error::EditorError;
use crate::event::{ChangeFeed, ChangeSignal, EditorEvent, EditorEventKind, SubscriptionId};
use crate::location::{Location, LocationStore, LocationSummary, Placement};
use crate::nav::{self, NavigationState};
use crate::placement;
use crate::snapshot::LayoutSnapshot;
use crate::types::{GridCell, Layer, LocationKey, PlacementId, PlacementIdGenerator};
use crate::validate::{
    PlacementQuery, PlacementRules, Rejection, validate_placement, validate_with_definition,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// The palette item chosen for placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub object_key: String,
    pub layer: Layer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerDownOutcome {
    Placed(Placement),
    /// A selection was pending but the object can't go there.
    Rejected(Rejection),
    DragStarted { id: PlacementId, grab_offset: GridCell },
    /// Nothing selected and nothing under the pointer.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropOutcome {
    /// The placement now sits at `to` (possibly where it started).
    Committed {
        id: PlacementId,
        from: GridCell,
        to: GridCell,
    },
    /// The drop target was invalid; the placement stayed at `at`.
    SnappedBack {
        id: PlacementId,
        at: GridCell,
        reason: Rejection,
    },
    NoDrag,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavOutcome {
    Entered { location: LocationKey, created: bool },
    Exited { location: LocationKey },
    Refused(Rejection),
}

/// A drag validation request together with the definition the host resolved
/// for it (`None` if the lookup failed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedValidation {
    pub request: ValidationRequest,
    pub definition: Option<ObjectDefinition>,
}

/// Resolve the definition a drag validation needs through `source`. Lookup
/// failures resolve to `None`, which validates as `UnknownObject`.
pub async fn resolve_validation<S: DefinitionSource>(source: &S, request: ValidationRequest) -> ResolvedValidation {
    let definition = source.fetch_definition(&request.object_key).await;
    ResolvedValidation { request, definition }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Editor<C: ObjectCatalog> {
    config: EditorConfig,
    rules: PlacementRules,
    catalog: C,
    store: LocationStore,
    current: Option<LocationKey>,
    navigation: NavigationState,
    drag: DragController,
    selection: Option<Selection>,
    ids: PlacementIdGenerator,
    feed: ChangeFeed,
    batch_depth: u32,
}

impl<C: ObjectCatalog> Editor<C> {
    /// Build an editor over `store`. The configured start location becomes
    /// active; if the store doesn't have it, the editor starts with no active
    /// location until `travel_to` picks one.
    pub fn new(config: EditorConfig, catalog: C, store: LocationStore) -> Self {
        let current = if store.contains(&config.start_location) {
            Some(config.start_location.clone())
        } else {
            log::warn!(
                "start location {} not found; no location is active",
                config.start_location
            );
            None
        };
        let mut editor = Self {
            rules: config.placement_rules(),
            ids: PlacementIdGenerator::new(&config.placement_id_prefix),
            config,
            catalog,
            store,
            current,
            navigation: NavigationState::new(),
            drag: DragController::new(),
            selection: None,
            feed: ChangeFeed::new(),
            batch_depth: 0,
        };
        editor.reseed_ids();
        editor
    }

    // -- Accessors ----------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn current_key(&self) -> Option<&LocationKey> {
        self.current.as_ref()
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.store.get(self.current.as_ref()?)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The drag in progress, for rendering the ghost at its candidate.
    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.session()
    }

    /// Summaries of every live location (the location picker list).
    pub fn available_locations(&self) -> Vec<LocationSummary> {
        self.store.summaries()
    }

    // -- Change notification ------------------------------------------------

    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeSignal) + Send + 'static) -> SubscriptionId {
        self.feed.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.feed.unsubscribe(id)
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.feed.drain_events()
    }

    /// Number of change signals delivered so far.
    pub fn revision(&self) -> u64 {
        self.feed.revision()
    }

    /// Run `f` with change signals held back; at most one signal is delivered
    /// when the outermost batch ends.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        self.finish_op();
        result
    }

    fn finish_op(&mut self) {
        if self.batch_depth == 0 {
            self.feed.flush();
        }
    }

    // -- Selection ----------------------------------------------------------

    /// Choose a palette object for placement. `layer` defaults to the
    /// object's default layer.
    pub fn select(&mut self, object_key: &str, layer: Option<Layer>) -> Result<Selection, Rejection> {
        let def = self
            .catalog
            .definition(object_key)
            .ok_or_else(|| Rejection::UnknownObject {
                object_key: object_key.to_owned(),
            })?;
        let selection = Selection {
            object_key: object_key.to_owned(),
            layer: layer.unwrap_or(def.default_layer),
        };
        self.selection = Some(selection.clone());
        Ok(selection)
    }

    /// Clear the pending selection. Idempotent; an active drag is unaffected.
    pub fn deselect(&mut self) -> Option<Selection> {
        self.selection.take()
    }

    // -- Placement ----------------------------------------------------------

    /// Check whether `object_key` could be placed at `cell` in the active
    /// location, without changing anything.
    pub fn validate(&self, object_key: &str, cell: GridCell, layer: Layer) -> Result<(), Rejection> {
        let location = self.current_location().ok_or(Rejection::NoCurrentLocation)?;
        validate_placement(
            location,
            &self.catalog,
            &self.rules,
            &PlacementQuery::new(object_key, cell, layer),
        )
    }

    pub fn place(&mut self, object_key: &str, cell: GridCell, layer: Layer) -> Result<Placement, Rejection> {
        let result = self.place_inner(object_key, cell, layer);
        self.finish_op();
        result
    }

    fn place_inner(&mut self, object_key: &str, cell: GridCell, layer: Layer) -> Result<Placement, Rejection> {
        let location = self
            .current
            .as_ref()
            .and_then(|key| self.store.get_mut(key))
            .ok_or(Rejection::NoCurrentLocation)?;
        placement::place(
            location,
            &self.catalog,
            &self.rules,
            &mut self.ids,
            PlacementQuery::new(object_key, cell, layer),
            &mut self.feed,
        )
    }

    /// Move a placement directly (no drag). Returns the previous anchor.
    pub fn move_placement(&mut self, id: &PlacementId, to: GridCell) -> Result<GridCell, Rejection> {
        let result = self.move_inner(id, to);
        self.finish_op();
        result
    }

    fn move_inner(&mut self, id: &PlacementId, to: GridCell) -> Result<GridCell, Rejection> {
        let location = self
            .current
            .as_ref()
            .and_then(|key| self.store.get_mut(key))
            .ok_or(Rejection::NoCurrentLocation)?;
        placement::move_placement(location, &self.catalog, &self.rules, id, to, &mut self.feed)
    }

    /// Remove a placement from the active location. Returns false when there
    /// was nothing to remove. Removing the placement being dragged cancels
    /// the drag.
    pub fn remove(&mut self, id: &PlacementId) -> bool {
        if self.drag.session().is_some_and(|s| &s.placement_id == id) {
            self.cancel_drag_inner();
        }
        let removed = match self.current.as_ref().and_then(|key| self.store.get_mut(key)) {
            Some(location) => placement::remove(location, id, &mut self.feed),
            None => false,
        };
        self.finish_op();
        removed
    }

    /// Eraser tool: remove the topmost placement covering `cell`.
    pub fn remove_at(&mut self, cell: GridCell) -> Option<Placement> {
        let removed = self
            .current
            .as_ref()
            .and_then(|key| self.store.get_mut(key))
            .and_then(|location| placement::remove_at(location, &self.catalog, cell, &mut self.feed));
        if let Some(erased) = &removed
            && self.drag.session().is_some_and(|s| s.placement_id == erased.id)
        {
            self.cancel_drag_inner();
        }
        self.finish_op();
        removed
    }

    // -- Pointer / drag -----------------------------------------------------

    pub fn pointer_down(&mut self, cell: GridCell) -> PointerDownOutcome {
        let outcome = self.pointer_down_inner(cell);
        self.finish_op();
        outcome
    }

    fn pointer_down_inner(&mut self, cell: GridCell) -> PointerDownOutcome {
        if let Some(stale) = self.cancel_drag_inner() {
            log::warn!("pointer down during drag of {stale}; previous drag cancelled");
        }

        if let Some(selection) = self.selection.clone() {
            return match self.place_inner(&selection.object_key, cell, selection.layer) {
                Ok(placement) => PointerDownOutcome::Placed(placement),
                Err(reason) => {
                    log::debug!("can't place {} at {cell}: {reason}", selection.object_key);
                    PointerDownOutcome::Rejected(reason)
                }
            };
        }

        let Some(key) = self.current.clone() else {
            return PointerDownOutcome::Ignored;
        };
        let Some(target) = self
            .store
            .get(&key)
            .and_then(|location| location.placement_at(cell, &self.catalog))
        else {
            return PointerDownOutcome::Ignored;
        };
        let id = target.id.clone();
        let from = target.anchor();
        self.drag.begin(key, target, cell);
        log::debug!("drag of {id} started at {from}");
        self.feed.record(EditorEventKind::DragStarted { id: id.clone(), from });
        PointerDownOutcome::DragStarted {
            id,
            grab_offset: GridCell::new(cell.x - from.x, cell.y - from.y),
        }
    }

    /// Move the drag candidate under the pointer. Returns the validation
    /// request for the new candidate, or `None` when no drag is active.
    pub fn pointer_move(&mut self, cell: GridCell) -> Option<ValidationRequest> {
        self.drag.update_candidate(cell)
    }

    /// `pointer_move` plus immediate validation against the editor's own
    /// catalog.
    pub fn pointer_move_validated(&mut self, cell: GridCell) -> Option<Result<(), Rejection>> {
        let request = self.drag.update_candidate(cell)?;
        let definition = self.catalog.definition(&request.object_key);
        let result = self.validate_request(&request, definition);
        self.drag.apply_validation(request.ticket, result.clone());
        Some(result)
    }

    /// Apply an asynchronously resolved drag validation. Validity is computed
    /// against the current state of the location; the result only sticks if
    /// the request is still the latest of the live drag. Returns whether it
    /// was applied.
    pub fn complete_validation(&mut self, resolved: ResolvedValidation) -> bool {
        let result = self.validate_request(&resolved.request, resolved.definition.as_ref());
        self.drag.apply_validation(resolved.request.ticket, result)
    }

    fn validate_request(
        &self,
        request: &ValidationRequest,
        definition: Option<&ObjectDefinition>,
    ) -> Result<(), Rejection> {
        let location = self
            .store
            .get(&request.location)
            .ok_or(Rejection::NoCurrentLocation)?;
        let query = PlacementQuery::new(&request.object_key, request.candidate, request.layer)
            .excluding(&request.placement_id);
        validate_with_definition(location, definition, &self.catalog, &self.rules, &query)
    }

    /// Drop the dragged placement with the pointer at `cell`.
    pub fn pointer_up(&mut self, cell: GridCell) -> DropOutcome {
        let outcome = self.pointer_up_inner(cell);
        self.finish_op();
        outcome
    }

    fn pointer_up_inner(&mut self, cell: GridCell) -> DropOutcome {
        if self.drag.update_candidate(cell).is_none() {
            return DropOutcome::NoDrag;
        }
        let Some(session) = self.drag.finish() else {
            return DropOutcome::NoDrag;
        };
        let id = session.placement_id;
        let to = session.candidate;

        let result = match self.store.get_mut(&session.location) {
            Some(location) => {
                placement::move_placement(location, &self.catalog, &self.rules, &id, to, &mut self.feed)
            }
            None => Err(Rejection::NoCurrentLocation),
        };
        match result {
            Ok(from) => {
                if from == to {
                    // Dropped where it started: nothing moved, still redraw.
                    self.feed.touch();
                }
                DropOutcome::Committed { id, from, to }
            }
            Err(reason) => {
                log::info!("drop of {id} at {to} refused ({reason}); snapping back");
                self.feed.record(EditorEventKind::DragSnappedBack {
                    id: id.clone(),
                    at: session.original,
                });
                DropOutcome::SnappedBack {
                    id,
                    at: session.original,
                    reason,
                }
            }
        }
    }

    /// Abandon the drag in progress. Returns the id of the placement that
    /// was being dragged.
    pub fn cancel_drag(&mut self) -> Option<PlacementId> {
        let cancelled = self.cancel_drag_inner();
        self.finish_op();
        cancelled
    }

    fn cancel_drag_inner(&mut self) -> Option<PlacementId> {
        let session = self.drag.cancel()?;
        self.feed.record(EditorEventKind::DragCancelled {
            id: session.placement_id.clone(),
        });
        Some(session.placement_id)
    }

    // -- Navigation ---------------------------------------------------------

    /// Enter an existing location, pushing the current one onto the return
    /// stack.
    pub fn enter(&mut self, target: &LocationKey) -> Result<NavOutcome, EditorError> {
        if !self.store.contains(target) {
            log::error!("can't enter unknown location {target}");
            return Err(EditorError::UnknownLocation(target.clone()));
        }
        self.push_and_switch(target.clone());
        self.finish_op();
        Ok(NavOutcome::Entered {
            location: target.clone(),
            created: false,
        })
    }

    /// Enter the interior instance `instance`, creating it from `template` on
    /// first visit. A freshly created instance remembers the current location
    /// as its exit target.
    pub fn enter_instance(
        &mut self,
        template: &LocationKey,
        instance: &LocationKey,
    ) -> Result<NavOutcome, EditorError> {
        let result = self.enter_instance_inner(template, instance);
        self.finish_op();
        result
    }

    fn enter_instance_inner(
        &mut self,
        template: &LocationKey,
        instance: &LocationKey,
    ) -> Result<NavOutcome, EditorError> {
        let (_, created) = self.store.create_instance(template, instance).inspect_err(|err| {
            log::error!("can't enter {instance}: {err}");
        })?;
        if created {
            self.feed.record(EditorEventKind::InstanceCreated {
                instance: instance.clone(),
                template: template.clone(),
            });
            if let Some(parent) = &self.current {
                self.navigation.record_exit_target(instance.clone(), parent.clone());
            }
        }
        self.push_and_switch(instance.clone());
        Ok(NavOutcome::Entered {
            location: instance.clone(),
            created,
        })
    }

    /// Enter the building `id` in the active location, interacting from
    /// `interaction`. The interaction point must be within the configured
    /// reach of the building's door.
    pub fn enter_building(&mut self, id: &PlacementId, interaction: GridCell) -> Result<NavOutcome, EditorError> {
        let result = self.enter_building_inner(id, interaction);
        self.finish_op();
        result
    }

    fn enter_building_inner(&mut self, id: &PlacementId, interaction: GridCell) -> Result<NavOutcome, EditorError> {
        let Some(parent) = self.current.clone() else {
            return Ok(NavOutcome::Refused(Rejection::NoCurrentLocation));
        };
        let Some(building) = self.store.get(&parent).and_then(|loc| loc.placement(id)) else {
            return Ok(NavOutcome::Refused(Rejection::UnknownPlacement { id: id.clone() }));
        };
        let Some(def) = self.catalog.definition(&building.object_key) else {
            return Ok(NavOutcome::Refused(Rejection::UnknownObject {
                object_key: building.object_key.clone(),
            }));
        };
        if let Err(reason) = nav::door_in_reach(building, def, interaction, self.config.door_reach) {
            log::warn!("can't enter {id} from {interaction}: {reason}");
            return Ok(NavOutcome::Refused(reason));
        }
        let Some(interior) = &def.interior else {
            return Ok(NavOutcome::Refused(Rejection::NotEnterable { id: id.clone() }));
        };
        let template = interior.template.clone();
        let instance = nav::instance_key(&parent, id);
        self.enter_instance_inner(&template, &instance)
    }

    /// Return to the previous location. At a top-level location this is a
    /// logged no-op.
    pub fn exit(&mut self) -> NavOutcome {
        let outcome = self.exit_inner();
        self.finish_op();
        outcome
    }

    fn exit_inner(&mut self) -> NavOutcome {
        let Some(popped) = self.navigation.pop() else {
            log::warn!("exit requested at top level; staying put");
            return NavOutcome::Refused(Rejection::NavigationStackEmpty);
        };
        let destination = if self.store.contains(&popped) {
            popped
        } else {
            // The popped location is gone; fall back to where this instance
            // was first entered from.
            self.current
                .as_ref()
                .and_then(|key| self.navigation.exit_target(key))
                .filter(|key| self.store.contains(key))
                .cloned()
                .unwrap_or(popped)
        };

        self.cancel_drag_inner();
        let from = self.current.replace(destination.clone());
        if let Some(from) = from {
            log::info!("exited {from} to {destination}");
            self.feed.record(EditorEventKind::LocationExited {
                from,
                to: destination.clone(),
            });
        } else {
            self.feed.touch();
        }
        NavOutcome::Exited { location: destination }
    }

    /// Top-level switch (location picker). Clears the return stack.
    pub fn travel_to(&mut self, target: &LocationKey) -> Result<(), EditorError> {
        if !self.store.contains(target) {
            log::error!("can't travel to unknown location {target}");
            return Err(EditorError::UnknownLocation(target.clone()));
        }
        self.cancel_drag_inner();
        self.navigation.clear_stack();
        self.current = Some(target.clone());
        log::info!("travelled to {target}");
        self.feed.record(EditorEventKind::Travelled { to: target.clone() });
        self.finish_op();
        Ok(())
    }

    fn push_and_switch(&mut self, target: LocationKey) {
        self.cancel_drag_inner();
        match self.current.replace(target.clone()) {
            Some(previous) => {
                self.navigation.push(previous.clone());
                log::info!("entered {target} from {previous}");
                self.feed.record(EditorEventKind::LocationEntered {
                    from: previous,
                    to: target,
                });
            }
            None => {
                log::info!("entered {target}");
                self.feed.record(EditorEventKind::Travelled { to: target });
            }
        }
    }

    // -- Layout persistence -------------------------------------------------

    /// Capture the live store as a layout snapshot.
    pub fn snapshot(&self) -> Result<LayoutSnapshot, Rejection> {
        let current = self.current.as_ref().ok_or(Rejection::NoCurrentLocation)?;
        Ok(LayoutSnapshot::capture(
            &self.config.snapshot_version,
            &self.store,
            current,
            &self.navigation,
        ))
    }

    /// Replace the live store with `snapshot`. On any error the editor is
    /// left exactly as it was.
    pub fn load_snapshot(&mut self, snapshot: &LayoutSnapshot) -> Result<(), EditorError> {
        let restored = snapshot
            .rebuild(self.store.pristine(), &self.catalog, self.config.snapshot_major())
            .inspect_err(|err| log::error!("layout load failed: {err}"))?;

        self.cancel_drag_inner();
        let locations = restored.store.locations().count();
        self.store = restored.store;
        self.navigation = restored.navigation;
        self.current = Some(restored.current);
        self.reseed_ids();
        log::info!("layout loaded ({locations} locations)");
        self.feed.record(EditorEventKind::LayoutLoaded { locations });
        self.finish_op();
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        let snapshot = self.snapshot().map_err(|_| EditorError::NoActiveLocation)?;
        Ok(snapshot.to_json()?)
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), EditorError> {
        let snapshot = LayoutSnapshot::from_json(json).inspect_err(|err| log::error!("layout load failed: {err}"))?;
        self.load_snapshot(&snapshot)
    }

    /// Discard every edit and interior instance and return to the start
    /// location.
    pub fn new_layout(&mut self) {
        self.cancel_drag_inner();
        self.store.reset();
        self.navigation.reset();
        if self.store.contains(&self.config.start_location) {
            self.current = Some(self.config.start_location.clone());
        } else if self.current.as_ref().is_some_and(|key| !self.store.contains(key)) {
            self.current = None;
        }
        self.reseed_ids();
        log::info!("new layout");
        self.feed.record(EditorEventKind::LayoutReset);
        self.finish_op();
    }

    /// Restart the id generator past every id in the live store, including
    /// the ids embedded in instance keys. An interior outlives its building,
    /// so a removed building's id must never be handed out again.
    fn reseed_ids(&mut self) {
        let mut ids = PlacementIdGenerator::new(&self.config.placement_id_prefix);
        for id in self.store.placement_ids() {
            ids.observe(id);
        }
        let instance_keys = self
            .store
            .locations()
            .map(|loc| &loc.location_key)
            .chain(self.navigation.exit_targets().keys());
        for key in instance_keys {
            for id in nav::instance_placement_ids(key) {
                ids.observe(&id);
            }
        }
        self.ids = ids;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, JsonCatalog};
    use crate::types::GridRect;

    fn catalog() -> JsonCatalog {
        JsonCatalog::new()
            .with("crate", ObjectDefinition::new("Crate", Category::Decoration))
            .with(
                "coop",
                ObjectDefinition::new("Coop", Category::Building)
                    .with_footprint(2, 2)
                    .outdoor_only()
                    .with_interior("coop_interior", None),
            )
            .with("wallpaper_blue", ObjectDefinition::new("Blue", Category::Wallpaper))
    }

    fn editor() -> Editor<JsonCatalog> {
        let store = LocationStore::from_templates([
            Location::new("farm", 20, 20).with_blocked_area(GridRect::new(0, 0, 20, 1)),
            Location::new("coop_interior", 6, 4).indoors(),
            Location::new("town", 30, 30),
        ]);
        Editor::new(EditorConfig::default(), catalog(), store)
    }

    fn cell(x: i32, y: i32) -> GridCell {
        GridCell::new(x, y)
    }

    #[test]
    fn starts_at_configured_location() {
        let ed = editor();
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("farm"));
        assert!(ed.navigation().is_top_level());
    }

    #[test]
    fn missing_start_location_means_no_current_location() {
        let config = EditorConfig {
            start_location: LocationKey::from("nowhere"),
            ..EditorConfig::default()
        };
        let mut ed = Editor::new(config, catalog(), LocationStore::from_templates([Location::new("farm", 5, 5)]));
        assert!(ed.current_key().is_none());
        assert_eq!(ed.place("crate", cell(1, 1), Layer::OBJECTS), Err(Rejection::NoCurrentLocation));
        assert_eq!(ed.validate("crate", cell(1, 1), Layer::OBJECTS), Err(Rejection::NoCurrentLocation));
        assert_eq!(ed.snapshot().unwrap_err(), Rejection::NoCurrentLocation);
        assert!(!ed.remove(&PlacementId::from("plc_1")));

        ed.travel_to(&LocationKey::from("farm")).unwrap();
        assert!(ed.place("crate", cell(1, 1), Layer::OBJECTS).is_ok());
    }

    #[test]
    fn select_uses_default_layer_and_deselect_is_idempotent() {
        let mut ed = editor();
        let sel = ed.select("crate", None).unwrap();
        assert_eq!(sel.layer, Layer::OBJECTS);
        assert!(matches!(ed.select("ghost", None), Err(Rejection::UnknownObject { .. })));
        // Failed select keeps the previous selection.
        assert_eq!(ed.selection(), Some(&sel));
        assert_eq!(ed.deselect(), Some(sel));
        assert_eq!(ed.deselect(), None);
    }

    #[test]
    fn restricted_category_cannot_be_placed() {
        let mut ed = editor();
        assert_eq!(
            ed.place("wallpaper_blue", cell(5, 5), Layer::OBJECTS),
            Err(Rejection::CategoryRestricted {
                category: Category::Wallpaper
            })
        );
    }

    #[test]
    fn pointer_down_with_selection_places_instead_of_dragging() {
        let mut ed = editor();
        let existing = ed.place("crate", cell(5, 5), Layer::OBJECTS).unwrap();

        // A path-layer selection over the crate: placement intent wins.
        ed.select("crate", Some(Layer::PATHS)).unwrap();
        match ed.pointer_down(cell(5, 5)) {
            PointerDownOutcome::Placed(p) => assert_eq!(p.layer, Layer::PATHS),
            other => panic!("expected placement, got {other:?}"),
        }
        assert!(ed.drag_session().is_none());

        // Same layer: rejected, still no drag.
        ed.select("crate", None).unwrap();
        assert!(matches!(
            ed.pointer_down(cell(5, 5)),
            PointerDownOutcome::Rejected(Rejection::Overlap { .. })
        ));
        assert!(ed.drag_session().is_none());

        ed.deselect();
        assert_eq!(
            ed.pointer_down(cell(5, 5)),
            PointerDownOutcome::DragStarted {
                id: existing.id,
                grab_offset: cell(0, 0)
            }
        );
    }

    #[test]
    fn drag_commit_and_snap_back() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        ed.place("crate", cell(10, 5), Layer::OBJECTS).unwrap();

        // Grab by the lower-right cell and drop two cells right.
        ed.pointer_down(cell(6, 6));
        assert_eq!(ed.pointer_move_validated(cell(8, 6)), Some(Ok(())));
        let location = ed.current_location().unwrap();
        assert_eq!(location.placement(&coop.id).unwrap().anchor(), cell(5, 5));
        assert_eq!(
            ed.pointer_up(cell(8, 6)),
            DropOutcome::Committed {
                id: coop.id.clone(),
                from: cell(5, 5),
                to: cell(7, 5)
            }
        );

        // Drag onto the crate and release: snap back.
        ed.pointer_down(cell(7, 5));
        assert!(matches!(ed.pointer_move_validated(cell(9, 5)), Some(Err(Rejection::Overlap { .. }))));
        assert!(matches!(ed.pointer_up(cell(9, 5)), DropOutcome::SnappedBack { .. }));
        assert_eq!(
            ed.current_location().unwrap().placement(&coop.id).unwrap().anchor(),
            cell(7, 5)
        );
        assert_eq!(ed.pointer_up(cell(9, 5)), DropOutcome::NoDrag);
    }

    #[test]
    fn each_drop_delivers_exactly_one_signal() {
        let mut ed = editor();
        let a = ed.place("crate", cell(5, 5), Layer::OBJECTS).unwrap();
        ed.place("crate", cell(8, 8), Layer::OBJECTS).unwrap();

        // Committed, snapped back, and dropped in place.
        for target in [cell(6, 6), cell(8, 8), cell(5, 5)] {
            ed.move_placement(&a.id, cell(5, 5)).unwrap();
            ed.pointer_down(cell(5, 5));
            let before = ed.revision();
            ed.pointer_move_validated(target);
            ed.pointer_up(target);
            assert_eq!(ed.revision(), before + 1, "drop at {target}");
        }
    }

    #[test]
    fn second_pointer_down_cancels_stale_drag() {
        let mut ed = editor();
        let a = ed.place("crate", cell(2, 2), Layer::OBJECTS).unwrap();
        let b = ed.place("crate", cell(4, 4), Layer::OBJECTS).unwrap();
        ed.pointer_down(cell(2, 2));
        ed.pointer_move(cell(3, 3));
        ed.drain_events();

        ed.pointer_down(cell(4, 4));
        let session = ed.drag_session().unwrap();
        assert_eq!(session.placement_id, b.id);
        let events = ed.drain_events();
        assert!(events
            .iter()
            .any(|e| e.kind == EditorEventKind::DragCancelled { id: a.id.clone() }));
        assert_eq!(ed.current_location().unwrap().placement(&a.id).unwrap().anchor(), cell(2, 2));
    }

    #[test]
    fn deselect_does_not_touch_drag() {
        let mut ed = editor();
        ed.place("crate", cell(2, 2), Layer::OBJECTS).unwrap();
        ed.pointer_down(cell(2, 2));
        ed.deselect();
        assert!(ed.drag_session().is_some());
    }

    #[test]
    fn removing_dragged_placement_cancels_drag() {
        let mut ed = editor();
        let a = ed.place("crate", cell(2, 2), Layer::OBJECTS).unwrap();
        ed.pointer_down(cell(2, 2));
        assert!(ed.remove(&a.id));
        assert!(ed.drag_session().is_none());
        assert!(!ed.remove(&a.id));
    }

    #[test]
    fn remove_at_erases_topmost() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(3, 3), Layer::OBJECTS).unwrap();
        let erased = ed.remove_at(cell(4, 4)).unwrap();
        assert_eq!(erased.id, coop.id);
        assert!(ed.remove_at(cell(4, 4)).is_none());
    }

    #[test]
    fn erasing_dragged_placement_cancels_drag() {
        let mut ed = editor();
        ed.place("crate", cell(2, 2), Layer::OBJECTS).unwrap();
        let other = ed.place("crate", cell(6, 6), Layer::OBJECTS).unwrap();

        // Erasing something else leaves the drag alone.
        ed.pointer_down(cell(2, 2));
        assert_eq!(ed.remove_at(cell(6, 6)).map(|p| p.id), Some(other.id));
        assert!(ed.drag_session().is_some());

        assert!(ed.remove_at(cell(2, 2)).is_some());
        assert!(ed.drag_session().is_none());
    }

    #[test]
    fn drag_far_off_the_grid_is_out_of_bounds() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(10, 10), Layer::OBJECTS).unwrap();
        ed.pointer_down(cell(11, 11));
        assert_eq!(
            ed.pointer_move_validated(cell(i32::MIN, 11)),
            Some(Err(Rejection::OutOfBounds))
        );
        assert_eq!(
            ed.pointer_move_validated(cell(i32::MAX, i32::MAX)),
            Some(Err(Rejection::OutOfBounds))
        );
        assert!(matches!(
            ed.pointer_up(cell(i32::MIN, i32::MIN)),
            DropOutcome::SnappedBack {
                reason: Rejection::OutOfBounds,
                ..
            }
        ));
        assert_eq!(
            ed.current_location().unwrap().placement(&coop.id).unwrap().anchor(),
            cell(10, 10)
        );
    }

    #[test]
    fn enter_building_checks_door_reach() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        // Door at bottom centre: (6, 6).
        assert!(matches!(
            ed.enter_building(&coop.id, cell(12, 12)).unwrap(),
            NavOutcome::Refused(Rejection::DoorOutOfReach { .. })
        ));
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("farm"));

        let outcome = ed.enter_building(&coop.id, cell(6, 8)).unwrap();
        let instance = nav::instance_key(&LocationKey::from("farm"), &coop.id);
        assert_eq!(
            outcome,
            NavOutcome::Entered {
                location: instance.clone(),
                created: true
            }
        );
        assert_eq!(ed.current_key(), Some(&instance));
        assert_eq!(ed.navigation().exit_target(&instance).map(LocationKey::as_str), Some("farm"));
    }

    #[test]
    fn exit_returns_to_the_location_it_was_entered_from() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        let instance = nav::instance_key(&LocationKey::from("farm"), &coop.id);
        ed.enter_building(&coop.id, cell(6, 6)).unwrap();
        ed.exit();

        // Re-enter the same interior from somewhere else.
        ed.travel_to(&LocationKey::from("town")).unwrap();
        ed.enter(&instance).unwrap();
        assert_eq!(ed.navigation().stack(), [LocationKey::from("town")]);

        assert_eq!(
            ed.exit(),
            NavOutcome::Exited {
                location: LocationKey::from("town")
            }
        );
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("town"));
        assert!(ed.navigation().is_top_level());
        // The first-entry record is untouched.
        assert_eq!(ed.navigation().exit_target(&instance).map(LocationKey::as_str), Some("farm"));
    }

    #[test]
    fn reload_never_reuses_a_removed_buildings_id() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        assert_eq!(coop.id.as_str(), "plc_1");
        // The interior stays empty, so only its key remembers plc_1.
        ed.enter_building(&coop.id, cell(6, 6)).unwrap();
        ed.exit();
        ed.remove(&coop.id);
        let json = ed.to_json().unwrap();

        let mut reloaded = editor();
        reloaded.load_json(&json).unwrap();
        let fresh = reloaded.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        assert_eq!(fresh.id.as_str(), "plc_2");
        assert!(matches!(
            reloaded.enter_building(&fresh.id, cell(6, 6)).unwrap(),
            NavOutcome::Entered { created: true, .. }
        ));
    }

    #[test]
    fn exit_at_top_level_is_a_no_op() {
        let mut ed = editor();
        assert_eq!(ed.exit(), NavOutcome::Refused(Rejection::NavigationStackEmpty));
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("farm"));
    }

    #[test]
    fn unknown_locations_are_structural_errors() {
        let mut ed = editor();
        assert!(matches!(
            ed.enter(&LocationKey::from("moon")),
            Err(EditorError::UnknownLocation(_))
        ));
        assert!(matches!(
            ed.enter_instance(&LocationKey::from("castle"), &LocationKey::from("farm::x")),
            Err(EditorError::UnknownTemplate(_))
        ));
        assert!(ed.travel_to(&LocationKey::from("moon")).is_err());
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("farm"));
        assert!(ed.navigation().is_top_level());
    }

    #[test]
    fn travel_clears_stack_and_cancels_drag() {
        let mut ed = editor();
        ed.enter(&LocationKey::from("town")).unwrap();
        ed.place("crate", cell(1, 1), Layer::OBJECTS).unwrap();
        ed.pointer_down(cell(1, 1));
        ed.travel_to(&LocationKey::from("farm")).unwrap();
        assert!(ed.navigation().is_top_level());
        assert!(ed.drag_session().is_none());
    }

    #[test]
    fn batch_coalesces_signals() {
        let mut ed = editor();
        let before = ed.revision();
        ed.batch(|ed| {
            ed.place("crate", cell(1, 1), Layer::OBJECTS).unwrap();
            ed.place("crate", cell(2, 2), Layer::OBJECTS).unwrap();
            ed.place("crate", cell(3, 3), Layer::OBJECTS).unwrap();
        });
        assert_eq!(ed.revision(), before + 1);
    }

    #[test]
    fn failed_load_leaves_editor_unchanged() {
        let mut ed = editor();
        ed.place("crate", cell(3, 3), Layer::OBJECTS).unwrap();
        let before = ed.snapshot().unwrap();
        let bad = r#"{ "version": "1.0", "currentLocationKey": "farm", "locations": [
            { "locationKey": "farm", "directPlacements": [
                { "id": "x", "objectKey": "crate", "gridX": 0, "gridY": 0, "layer": 3 } ] } ] }"#;
        // (0, 0) is inside the blocked top row.
        assert!(matches!(ed.load_json(bad), Err(EditorError::Snapshot(_))));
        assert_eq!(ed.snapshot().unwrap(), before);
    }

    #[test]
    fn new_layout_resets_everything() {
        let mut ed = editor();
        let coop = ed.place("coop", cell(5, 5), Layer::OBJECTS).unwrap();
        ed.enter_building(&coop.id, cell(6, 6)).unwrap();
        ed.new_layout();
        assert_eq!(ed.current_key().map(LocationKey::as_str), Some("farm"));
        assert!(ed.navigation().is_top_level());
        assert!(ed.current_location().unwrap().direct_placements.is_empty());
        assert_eq!(ed.available_locations().len(), 3);
        let next = ed.place("crate", cell(1, 1), Layer::OBJECTS).unwrap();
        assert_eq!(next.id.as_str(), "plc_1");
    }
}
