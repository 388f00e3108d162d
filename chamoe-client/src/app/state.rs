use chamoe_types::{Comment, Post, Profile, ProfileTab, ToggleCounts};

use crate::error::{ClientError, ClientResult};
use crate::gateway::GatewayResult;
use crate::optimistic::{Settlement, Ticket, ToggleKey, ToggleLedger};

/// Why a view's initial load failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    NotFound,
    Fetch,
}

/// Lifecycle of a controller's primary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    Ready,
    Failed(LoadFailure),
}

impl Phase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Phase::Ready)
    }

    pub(crate) fn failed_with(err: &ClientError) -> Self {
        match err {
            ClientError::NotFound(_) => Phase::Failed(LoadFailure::NotFound),
            _ => Phase::Failed(LoadFailure::Fetch),
        }
    }

    /// Mutations are refused outside `Ready`
    pub(crate) fn ensure_ready(&self) -> ClientResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ClientError::NotReady)
        }
    }

    /// A load may only start from a fresh `Loading` phase
    pub(crate) fn ensure_loadable(&self, loading: bool) -> ClientResult<()> {
        match self {
            Phase::Ready => Err(ClientError::InvalidOperation(
                "already loaded".to_string(),
            )),
            Phase::Failed(_) => Err(ClientError::InvalidOperation(
                "load failed, use retry".to_string(),
            )),
            Phase::Loading if loading => Err(ClientError::InvalidOperation(
                "load already in progress".to_string(),
            )),
            Phase::Loading => Ok(()),
        }
    }
}

/// What a toggle left on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The change stands; these are the counts now displayed
    Applied(ToggleCounts),
    /// No such item in this view
    Missing,
    /// The backend refused and the previous counts were restored
    RolledBack(ToggleCounts),
}

/// How a finished toggle request settles the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Confirmed(ToggleCounts),
    RolledBack(ToggleCounts),
    Unchanged,
}

pub(crate) fn resolve_toggle(
    ledger: &mut ToggleLedger,
    key: &ToggleKey,
    ticket: Ticket,
    result: GatewayResult<ToggleCounts>,
    rollback: bool,
) -> Resolution {
    match result {
        Ok(confirmed) => match ledger.confirm(key, ticket, confirmed) {
            Settlement::Apply(counts) => Resolution::Confirmed(counts),
            Settlement::Keep => {
                log::debug!(
                    target: "optimistic",
                    "Ignoring superseded {} confirmation for {}",
                    key.kind.as_str(),
                    key.target
                );
                Resolution::Unchanged
            }
        },
        Err(e) => {
            log::warn!(
                target: "optimistic",
                "{} on {} failed: {}",
                key.kind.as_str(),
                key.target,
                e
            );
            match ledger.fail(key, ticket, rollback) {
                Settlement::Apply(previous) => {
                    log::info!(
                        target: "optimistic",
                        "Rolled back {} on {} to {:?}",
                        key.kind.as_str(),
                        key.target,
                        previous
                    );
                    Resolution::RolledBack(previous)
                }
                Settlement::Keep => Resolution::Unchanged,
            }
        }
    }
}

/// Append `incoming` to `items`, skipping ids already present. Returns how many were added.
pub(crate) fn append_unique<T>(items: &mut Vec<T>, incoming: Vec<T>, id: impl Fn(&T) -> &str) -> usize {
    let before = items.len();
    for item in incoming {
        if items.iter().any(|existing| id(existing) == id(&item)) {
            log::debug!(target: "pagination", "Skipping duplicate item {}", id(&item));
            continue;
        }
        items.push(item);
    }
    items.len() - before
}

/// Owned copy of the feed for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    pub phase: Phase,
    pub posts: Vec<Post>,
    pub error: Option<String>,
    pub loading_more: bool,
    pub has_more: bool,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadView {
    pub phase: Phase,
    pub post: Option<Post>,
    pub comments: Vec<Comment>,
    pub error: Option<String>,
    pub loading_comments: bool,
    pub has_more_comments: bool,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub phase: Phase,
    pub profile: Option<Profile>,
    pub active_tab: ProfileTab,
    /// Posts of the active tab
    pub posts: Vec<Post>,
    pub error: Option<String>,
    pub loading_more: bool,
    pub has_more: bool,
}
