//! Update-check, fetch-or-fallback, launch and supervise.
//!
//! This crate holds everything the launcher decides on its own:
//! - Local and remote version records ([`version_store`]).
//! - Reachability probing and artifact downloads.
//! - Payload sniffing before a download is trusted.
//! - Bundled fallback extraction.
//! - Child process launch and output draining.
//! - The [`UpdateOrchestrator`] state machine tying it all together.

pub mod bundle;
pub mod commands;
mod download;
mod fs_util;
mod orchestrator;
mod probe;
pub mod supervisor;
mod validate;
pub mod version_store;

/// Extension trait that hides the console window of spawned commands on
/// Windows.
pub use commands::HideWindow;
/// HTTP fetches with timeouts and status validation.
pub use download::{BROWSER_USER_AGENT, Downloader, FetchError, FetchResult};
/// Flow state machine, its configuration, and terminal outcomes.
pub use orchestrator::{
    DEFAULT_APP_ID, FlowConfig, FlowError, FlowFailure, FlowOutcome, FlowReport, FlowState,
    UpdateOrchestrator,
};
/// Bounded-timeout reachability check.
pub use probe::{ConnectivityProbe, DEFAULT_CONNECTIVITY_URL};
/// Launcher seam and the real process supervisor.
pub use supervisor::{LaunchError, LaunchReport, Launcher, ProcessSupervisor, Settled};
/// Downloaded payload sniffing.
pub use validate::{MIN_ARTIFACT_BYTES, Rejection, is_usable_artifact, validate};
/// Persisted version marker.
pub use version_store::VersionRecord;
