//! Console controller
//!
//! Drives the vessel operations: validates input, marks the store busy,
//! dispatches the request and hands the outcome to the reconciler.
//! Only one request may be outstanding at a time; a second operation
//! started while the store is busy is refused without contacting the
//! backend.

use tracing::{info, warn};

use crate::{
    client::{HttpVesselsService, VesselsService},
    config::AppConfig,
    criteria::{SearchRequest, SearchStrategy},
    errors::ConsoleError,
    models::{LastSeenPosition, Vessel, VesselForm},
    reconciler::{self, Reconciled},
    state::{BusyStatus, ViewState, ViewStore},
};

/// Deletion waiting for the user's answer
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion {
    vessel: Vessel,
}

impl PendingDeletion {
    pub fn vessel(&self) -> &Vessel {
        &self.vessel
    }

    /// Question to put to the user
    pub fn prompt(&self) -> &'static str {
        "Are you sure?"
    }
}

/// User's answer to a [`PendingDeletion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
}

/// Claim on the store's busy status for one outstanding request
///
/// Settling hands the outcome to the reconciler. Dropping an unsettled claim,
/// e.g. when the operation future is cancelled, puts the store back to idle.
#[must_use]
struct BusyClaim {
    store: ViewStore,
    busy: BusyStatus,
    settled: bool,
}

impl BusyClaim {
    fn settle<R>(mut self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        self.settled = true;
        self.store.update(f)
    }
}

impl Drop for BusyClaim {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let busy = self.busy;
        self.store.update(|state| {
            if state.busy == busy {
                warn!("{:?} abandoned before completion", busy);
                state.busy = BusyStatus::Idle;
            }
        });
    }
}

pub struct Console<S> {
    service: S,
    store: ViewStore,
    strategy: SearchStrategy,
}

impl Console<HttpVesselsService> {
    /// Console talking HTTP to the configured backend
    pub fn from_config(config: &AppConfig, store: ViewStore) -> Result<Self, ConsoleError> {
        config.validate()?;
        let service = HttpVesselsService::new(&config.backend)?;
        Ok(Self::new(service, store, config.search.strategy()))
    }
}

impl<S: VesselsService> Console<S> {
    pub fn new(service: S, store: ViewStore, strategy: SearchStrategy) -> Self {
        Self {
            service,
            store,
            strategy,
        }
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Claim the store for `busy`, running `prepare` on the state if granted
    fn start<R>(
        &self,
        busy: BusyStatus,
        prepare: impl FnOnce(&mut ViewState) -> Result<R, ConsoleError>,
    ) -> Result<(R, BusyClaim), ConsoleError> {
        let prepared = self.store.update(|state| {
            if state.busy.in_flight() {
                info!("Refusing {:?} while {:?}", busy, state.busy);
                return Err(ConsoleError::Busy(state.busy));
            }
            let prepared = prepare(state)?;
            reconciler::begin(state, busy);
            Ok(prepared)
        })?;
        let claim = BusyClaim {
            store: self.store.clone(),
            busy,
            settled: false,
        };
        Ok((prepared, claim))
    }

    /// Register the vessel described by the form
    pub async fn create(&self, form: &mut VesselForm) -> Result<Reconciled, ConsoleError> {
        let (draft, claim) = self.start(BusyStatus::Creating, |state| {
            form.validate().map_err(|reason| {
                reconciler::reject_input(state, &reason);
                ConsoleError::InvalidInput(reason)
            })?;
            Ok(form.to_vessel())
        })?;

        info!("Creating vessel {}", draft.name);
        let outcome = self.service.create(&draft).await;
        form.set_pristine();
        Ok(claim.settle(|state| reconciler::apply_create(state, draft, outcome)))
    }

    /// Search with the configured strategy
    pub async fn search(&self, form: &mut VesselForm) -> Result<Reconciled, ConsoleError> {
        let (request, claim) = self.start(BusyStatus::Searching, |state| {
            let request = self.strategy.build(form).inspect_err(|err| {
                reconciler::reject_input(state, &err.to_string());
            })?;
            state.selected = None;
            state.listing.clear();
            Ok(request)
        })?;

        match &request {
            SearchRequest::Predicate(_) => info!("Searching vessels by predicate"),
            SearchRequest::Flat(query) => info!("Searching vessels named {}", query.name),
        }
        let outcome = self.service.search(&request).await;
        form.set_pristine();
        Ok(claim.settle(|state| reconciler::apply_search(state, outcome)))
    }

    /// Show a listed vessel in detail
    pub fn show(&self, vessel: Vessel) {
        self.store.show(vessel);
    }

    /// Load the current version of `vessel` and enter edit mode
    pub async fn edit(&self, vessel: &Vessel) -> Result<Reconciled, ConsoleError> {
        let uuid = vessel.uuid.as_deref().ok_or(ConsoleError::MissingIdentity)?;
        let ((), claim) = self.start(BusyStatus::Loading, |_| Ok(()))?;

        info!("Loading vessel {}", uuid);
        let outcome = self.service.load(uuid).await;
        Ok(claim.settle(|state| reconciler::apply_load(state, outcome)))
    }

    pub fn cancel_edit(&self) {
        self.store.cancel_edit();
    }

    /// Attach a fresh last-seen position to the vessel being edited
    pub fn add_last_seen_position(&self) {
        self.store.update(|state| {
            if let Some(vessel) = state.selected.as_mut() {
                vessel.last_seen_position = Some(LastSeenPosition::now());
            }
        });
    }

    /// Save an edited vessel
    pub async fn update(&self, mut vessel: Vessel) -> Result<Reconciled, ConsoleError> {
        if vessel.uuid.is_none() {
            return Err(ConsoleError::MissingIdentity);
        }
        let ((), claim) = self.start(BusyStatus::Updating, |_| Ok(()))?;

        vessel.commit_dates();
        info!("Updating vessel {}", vessel.name);
        let outcome = self.service.update(&vessel).await;
        Ok(claim.settle(|state| reconciler::apply_update(state, vessel, outcome)))
    }

    /// First step of a deletion, nothing is sent until it is confirmed
    pub fn request_delete(&self, vessel: Vessel) -> PendingDeletion {
        PendingDeletion { vessel }
    }

    /// Second step of a deletion, `None` when the user declined
    pub async fn delete(
        &self,
        pending: PendingDeletion,
        confirmation: Confirmation,
    ) -> Result<Option<Reconciled>, ConsoleError> {
        if confirmation == Confirmation::Declined {
            info!("Deletion of {} declined", pending.vessel.name);
            return Ok(None);
        }
        if pending.vessel.uuid.is_none() {
            return Err(ConsoleError::MissingIdentity);
        }
        let ((), claim) = self.start(BusyStatus::Deleting, |_| Ok(()))?;

        let vessel = pending.vessel;
        info!("Deleting vessel {}", vessel.name);
        let outcome = self.service.delete(&vessel).await;
        Ok(Some(claim.settle(|state| {
            reconciler::apply_delete(state, &vessel, outcome)
        })))
    }

    /// User pressed inside the console
    pub fn interact(&self) {
        self.store.interact();
    }
}
