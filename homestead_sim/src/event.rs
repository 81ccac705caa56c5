// Change notification: narrative events and the coalesced change signal.
//
// Two related but distinct outputs:
// - `EditorEvent`: a narrative record of what happened ("placement added",
//   "drag snapped back", "entered barn"). Events accumulate until the host
//   drains them; they are for logs and status lines.
// - `ChangeSignal`: the "placements changed" notification delivered to
//   subscribers. Signals carry no delta. Any number of mutations between two
//   flushes collapse into one signal, and subscribers re-read the editor state
//   they care about.
//
// `ChangeFeed::record` marks the feed dirty; `flush` delivers one signal per
// subscriber if (and only if) something was recorded since the last flush.
// The editor flushes at the end of every public operation, or once at the end
// of `Editor::batch`.
//
// See also: `editor.rs` for where flushes happen, `placement.rs` and `drag.rs`
// for the events recorded.

use crate::types::{GridCell, LocationKey, PlacementId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Narrative events
// ---------------------------------------------------------------------------

/// A narrative event, numbered in recording order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorEvent {
    pub sequence: u64,
    pub kind: EditorEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorEventKind {
    PlacementAdded {
        location: LocationKey,
        id: PlacementId,
        object_key: String,
        at: GridCell,
    },
    PlacementMoved {
        location: LocationKey,
        id: PlacementId,
        from: GridCell,
        to: GridCell,
    },
    PlacementRemoved {
        location: LocationKey,
        id: PlacementId,
    },
    DragStarted {
        id: PlacementId,
        from: GridCell,
    },
    /// Drop target was invalid; the placement stayed at `at`.
    DragSnappedBack {
        id: PlacementId,
        at: GridCell,
    },
    /// Drag ended without a drop (explicit cancel, superseded, or location
    /// switch).
    DragCancelled {
        id: PlacementId,
    },
    InstanceCreated {
        instance: LocationKey,
        template: LocationKey,
    },
    LocationEntered {
        from: LocationKey,
        to: LocationKey,
    },
    LocationExited {
        from: LocationKey,
        to: LocationKey,
    },
    /// Top-level switch via the location picker.
    Travelled {
        to: LocationKey,
    },
    LayoutLoaded {
        locations: usize,
    },
    LayoutReset,
}

// ---------------------------------------------------------------------------
// Change signal and subscriptions
// ---------------------------------------------------------------------------

/// "State changed, re-read it." `revision` increases by one per delivered
/// signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSignal {
    pub revision: u64,
}

/// Handle returned by `ChangeFeed::subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type ChangeCallback = Box<dyn FnMut(&ChangeSignal) + Send>;

#[derive(Default)]
pub struct ChangeFeed {
    events: Vec<EditorEvent>,
    next_sequence: u64,
    pending: bool,
    revision: u64,
    subscribers: Vec<(SubscriptionId, ChangeCallback)>,
    next_subscription: u64,
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("events", &self.events.len())
            .field("pending", &self.pending)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and mark the feed dirty.
    pub fn record(&mut self, kind: EditorEventKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EditorEvent { sequence, kind });
        self.pending = true;
    }

    /// Mark the feed dirty without a narrative event.
    pub fn touch(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Number of signals delivered so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeSignal) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Deliver one signal to every subscriber if anything changed since the
    /// last flush. Returns the delivered signal.
    pub fn flush(&mut self) -> Option<ChangeSignal> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.revision += 1;
        let signal = ChangeSignal {
            revision: self.revision,
        };
        for (_, callback) in &mut self.subscribers {
            callback(&signal);
        }
        Some(signal)
    }

    /// Take every narrative event recorded so far.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }
}
