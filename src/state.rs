//! Shared view state and its change notifications

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::models::Vessel;

/// Operation currently in flight, or the outcome of local validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyStatus {
    #[default]
    Idle,
    Creating,
    Searching,
    Loading,
    Updating,
    Deleting,
    InvalidInput,
}

impl BusyStatus {
    /// Whether a request is outstanding
    pub fn in_flight(&self) -> bool {
        !matches!(self, BusyStatus::Idle | BusyStatus::InvalidInput)
    }
}

/// State observed by every display surface
///
/// `selected` and `listing` are alternative presentations: a single search
/// hit is shown as the selection, several hits as the listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub listing: Vec<Vessel>,
    pub selected: Option<Vessel>,
    pub busy: BusyStatus,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub editing: bool,
}

/// Which part of the view state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    ListingChanged,
    SelectionChanged,
    BusyChanged,
    MessageChanged,
    EditingChanged,
}

impl ViewEvent {
    fn between(before: &ViewState, after: &ViewState) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        if before.listing != after.listing {
            events.push(ViewEvent::ListingChanged);
        }
        if before.selected != after.selected {
            events.push(ViewEvent::SelectionChanged);
        }
        if before.busy != after.busy {
            events.push(ViewEvent::BusyChanged);
        }
        if before.success_message != after.success_message
            || before.error_message != after.error_message
        {
            events.push(ViewEvent::MessageChanged);
        }
        if before.editing != after.editing {
            events.push(ViewEvent::EditingChanged);
        }
        events
    }
}

/// Session-wide store for [`ViewState`]
///
/// Cloning yields another handle to the same state. Every mutation goes
/// through [`ViewStore::update`], which notifies observers before returning.
#[derive(Clone)]
pub struct ViewStore {
    state: Arc<watch::Sender<ViewState>>,
    events: broadcast::Sender<ViewEvent>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose event channel keeps `capacity` undelivered events
    pub fn with_capacity(capacity: usize) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        let (events, _) = broadcast::channel(capacity);
        Self {
            state: Arc::new(state),
            events,
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Apply `f` and publish one event per changed part
    pub fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut next = self.snapshot();
        let result = f(&mut next);

        let mut events = Vec::new();
        self.state.send_if_modified(|state| {
            events = ViewEvent::between(state, &next);
            if events.is_empty() {
                return false;
            }
            *state = next;
            true
        });

        for event in events {
            if self.events.send(event).is_err() {
                trace!("No subscribers for view event {:?}", event);
            }
        }
        result
    }

    /// Receive the whole state whenever it changes
    pub fn watch(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Receive one event per changed part of the state
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// User pressed somewhere in the console: messages are dismissed
    pub fn interact(&self) {
        self.update(|state| {
            state.success_message = None;
            state.error_message = None;
        });
    }

    /// Show a listing entry in detail without contacting the backend
    pub fn show(&self, vessel: Vessel) {
        self.update(|state| state.selected = Some(vessel));
    }

    pub fn cancel_edit(&self) {
        self.update(|state| state.editing = false);
    }
}
