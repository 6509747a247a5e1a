//! Vessel registry console
//!
//! Builds search criteria from a partially filled vessel form, talks to the
//! `/vessels` REST backend and reconciles every response into a shared,
//! observable view state.

pub mod client;
pub mod config;
pub mod console;
pub mod criteria;
pub mod errors;
pub mod models;
pub mod reconciler;
pub mod state;

pub use client::{HttpVesselsService, Reply, VesselsService};
pub use config::AppConfig;
pub use console::{Confirmation, Console, PendingDeletion};
pub use criteria::{SearchRequest, SearchStrategy};
pub use errors::ConsoleError;
pub use models::{LastSeenPosition, Vessel, VesselForm};
pub use reconciler::Reconciled;
pub use state::{BusyStatus, ViewEvent, ViewState, ViewStore};

/// Install the `tracing` subscriber, filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
