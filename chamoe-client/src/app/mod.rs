//! View-state controllers.
//!
//! Each controller owns the collections one screen renders and applies user
//! actions to them before the backend has answered. Controllers share nothing
//! but the injected [`SessionContext`](crate::session::SessionContext) and
//! gateways.

mod feed;
mod profile;
mod state;
mod thread;

pub use feed::FeedStateController;
pub use profile::ProfileStateController;
pub use state::{FeedView, LoadFailure, Phase, ProfileView, ThreadView, ToggleOutcome};
pub use thread::ThreadStateController;
