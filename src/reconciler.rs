//! Application of completed operations to the view state
//!
//! Every function here takes the outcome of one request and settles it into
//! [`ViewState`]. All of them clear the busy status. Rejections (unexpected
//! HTTP status) leave the rest of the state as it was, transport failures
//! additionally set a generic error message.

use reqwest::StatusCode;
use tracing::{error, info, warn};

use crate::{
    client::{identity_from_location, Reply},
    errors::ConsoleError,
    models::Vessel,
    state::{BusyStatus, ViewState},
};

/// Result of a dispatched request, as handed to the reconciler
pub type Outcome<T> = Result<Reply<T>, ConsoleError>;

pub const GENERIC_ERROR_MESSAGE: &str = "The request could not be completed, please try again.";

/// What the reconciler did with an outcome
#[must_use]
#[derive(Debug)]
pub enum Reconciled {
    Applied,
    /// The backend answered with a status other than the expected one
    Rejected { status: StatusCode },
    /// The request never produced a usable answer
    Failed(ConsoleError),
}

impl Reconciled {
    pub fn is_applied(&self) -> bool {
        matches!(self, Reconciled::Applied)
    }
}

/// Reset the transient parts of the state when an operation starts
pub fn begin(state: &mut ViewState, busy: BusyStatus) {
    state.busy = busy;
    state.success_message = None;
    state.error_message = None;
}

/// Mark a request as refused locally, before anything was sent
pub fn reject_input(state: &mut ViewState, reason: &str) {
    info!("Input rejected: {}", reason);
    state.busy = BusyStatus::InvalidInput;
    state.success_message = None;
}

fn fail(state: &mut ViewState, err: ConsoleError) -> Reconciled {
    error!("Request failed: {}", err);
    state.busy = BusyStatus::Idle;
    state.error_message = Some(GENERIC_ERROR_MESSAGE.to_string());
    Reconciled::Failed(err)
}

/// Split an outcome into the expected reply or a settled failure
fn settle<T>(
    state: &mut ViewState,
    outcome: Outcome<T>,
    success: StatusCode,
) -> Result<Reply<T>, Reconciled> {
    let reply = outcome.map_err(|e| fail(state, e))?;
    state.busy = BusyStatus::Idle;
    if reply.status != success {
        warn!("Unexpected status {} (expected {})", reply.status, success);
        return Err(Reconciled::Rejected {
            status: reply.status,
        });
    }
    Ok(reply)
}

pub fn apply_create(state: &mut ViewState, mut draft: Vessel, outcome: Outcome<()>) -> Reconciled {
    let reply = match settle(state, outcome, StatusCode::CREATED) {
        Ok(reply) => reply,
        Err(reconciled) => return reconciled,
    };
    let Some(uuid) = reply.location.as_deref().and_then(identity_from_location) else {
        return fail(state, ConsoleError::MissingLocation);
    };

    info!("Vessel {} registered as {}", draft.name, uuid);
    draft.uuid = Some(uuid.to_string());
    state.success_message = Some(format!(
        "Congratulations! Vessel {} has been registered.",
        draft.name
    ));
    state.selected = Some(draft.clone());
    state.listing.push(draft);
    Reconciled::Applied
}

pub fn apply_search(state: &mut ViewState, outcome: Outcome<Vec<Vessel>>) -> Reconciled {
    let reply = match settle(state, outcome, StatusCode::OK) {
        Ok(reply) => reply,
        Err(reconciled) => return reconciled,
    };
    let mut found = reply.body.unwrap_or_default();

    info!("Search returned {} vessel(s)", found.len());
    if found.len() == 1 {
        state.selected = found.pop();
        state.listing.clear();
    } else {
        state.selected = None;
        state.listing = found;
    }
    Reconciled::Applied
}

/// Loaded record enters edit mode with its display dates derived
pub fn apply_load(state: &mut ViewState, outcome: Outcome<Vessel>) -> Reconciled {
    let reply = match settle(state, outcome, StatusCode::OK) {
        Ok(reply) => reply,
        Err(reconciled) => return reconciled,
    };
    let Some(mut vessel) = reply.body else {
        return Reconciled::Applied;
    };

    vessel.derive_dates();
    state.selected = Some(vessel);
    state.editing = true;
    Reconciled::Applied
}

/// `updated` must already have its dates committed
pub fn apply_update(state: &mut ViewState, updated: Vessel, outcome: Outcome<()>) -> Reconciled {
    if let Err(reconciled) = settle(state, outcome, StatusCode::OK) {
        return reconciled;
    }

    info!("Vessel {} updated", updated.name);
    state.success_message = Some(format!(
        "Congratulations! Vessel {} has been updated.",
        updated.name
    ));
    for item in state.listing.iter_mut() {
        if item.same_identity(&updated) {
            *item = updated.clone();
        }
    }
    state.selected = Some(updated);
    state.editing = false;
    Reconciled::Applied
}

pub fn apply_delete(state: &mut ViewState, deleted: &Vessel, outcome: Outcome<()>) -> Reconciled {
    if let Err(reconciled) = settle(state, outcome, StatusCode::OK) {
        return reconciled;
    }

    info!("Vessel {} removed", deleted.name);
    state.selected = None;
    state.success_message = Some(format!(
        "Congratulations! Vessel {} has been removed.",
        deleted.name
    ));
    state.listing.retain(|item| !item.same_identity(deleted));
    Reconciled::Applied
}
