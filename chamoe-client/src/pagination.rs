//! Incremental loading with a single in-flight request.
//!
//! [`Paginator`] owns the guard flag and the set of consumed cursors. Deciding
//! *when* to load is left to the UI through the [`LoadMore`] port;
//! [`ScrollWatcher`] is the stock policy that fires when the viewport reaches
//! the end of the rendered content.

use async_trait::async_trait;
use chamoe_types::PageToken;
use std::collections::HashSet;

use crate::error::ClientResult;

/// Result of a pagination trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// A page was fetched and appended
    Loaded { added: usize, has_more: bool },
    /// Another page request is still unresolved; nothing was sent
    InFlight,
    /// This cursor was already fetched successfully; nothing was sent
    AlreadyConsumed,
    /// The last page has been loaded
    Exhausted,
    /// The controller was disposed while the request was outstanding
    Discarded,
}

#[derive(Debug, Default)]
pub struct Paginator {
    in_flight: bool,
    next: Option<PageToken>,
    started: bool,
    exhausted: bool,
    consumed: HashSet<Option<PageToken>>,
}

impl Paginator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard for an explicit cursor (`None` is the first page).
    pub fn begin(&mut self, token: Option<PageToken>) -> Result<Option<PageToken>, PageLoad> {
        if self.in_flight {
            return Err(PageLoad::InFlight);
        }
        if self.consumed.contains(&token) {
            return Err(PageLoad::AlreadyConsumed);
        }
        self.in_flight = true;
        Ok(token)
    }

    /// Claim the guard for whatever page comes next.
    pub fn begin_next(&mut self) -> Result<Option<PageToken>, PageLoad> {
        if self.in_flight {
            return Err(PageLoad::InFlight);
        }
        if self.exhausted {
            return Err(PageLoad::Exhausted);
        }
        let token = if self.started { self.next.clone() } else { None };
        self.begin(token)
    }

    pub fn finish_success(&mut self, token: Option<PageToken>, next: Option<PageToken>) {
        self.in_flight = false;
        self.started = true;
        self.consumed.insert(token);
        self.exhausted = next.is_none();
        self.next = next;
    }

    /// Release the guard without consuming the cursor, so it can be retried.
    pub fn finish_failure(&mut self) {
        self.in_flight = false;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn next_token(&self) -> Option<&PageToken> {
        self.next.as_ref()
    }
}

/// The single port a pagination trigger calls into
#[async_trait]
pub trait LoadMore: Send + Sync {
    async fn load_more(&self) -> ClientResult<PageLoad>;
}

/// Scroll position reported by the rendering surface, in pixels or rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub viewport_height: u32,
    pub content_height: u32,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> u32 {
        self.content_height
            .saturating_sub(self.scroll_top.saturating_add(self.viewport_height))
    }
}

/// Fires `load_more` when the viewport is within `threshold` of the content end
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollWatcher {
    threshold: u32,
}

impl ScrollWatcher {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn should_load(&self, metrics: &ScrollMetrics) -> bool {
        metrics.distance_to_bottom() <= self.threshold
    }

    /// Returns `None` when the position did not warrant a load.
    pub async fn on_scroll(
        &self,
        metrics: ScrollMetrics,
        target: &dyn LoadMore,
    ) -> Option<ClientResult<PageLoad>> {
        if !self.should_load(&metrics) {
            return None;
        }
        log::debug!(
            target: "pagination",
            "Scroll reached end of content (distance {}), requesting next page",
            metrics.distance_to_bottom()
        );
        Some(target.load_more().await)
    }
}
