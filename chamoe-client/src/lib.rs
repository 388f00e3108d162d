// Library interface for the chamoe client core
pub mod app;
pub mod config;
pub mod error;
pub mod formatting;
pub mod gateway;
pub mod logging;
pub mod optimistic;
pub mod pagination;
pub mod session;
pub mod storage;

pub use app::{
    FeedStateController, FeedView, LoadFailure, Phase, ProfileStateController, ProfileView,
    ThreadStateController, ThreadView, ToggleOutcome,
};
pub use config::{ClientConfig, ControllerOptions};
pub use error::{ClientError, ClientResult};
pub use pagination::{LoadMore, PageLoad, ScrollMetrics, ScrollWatcher};
pub use session::SessionContext;
