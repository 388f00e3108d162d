use async_trait::async_trait;
use chamoe_types::{validate_post_content, Post, ToggleCounts, ToggleKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::state::{append_unique, resolve_toggle, FeedView, Phase, Resolution, ToggleOutcome};
use crate::config::ControllerOptions;
use crate::error::{ClientError, ClientResult};
use crate::gateway::ContentGateway;
use crate::optimistic::{ToggleKey, ToggleLedger};
use crate::pagination::{LoadMore, PageLoad, Paginator};
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct FeedState {
    phase: Phase,
    posts: Vec<Post>,
    error: Option<String>,
    loading: bool,
    submitting: bool,
    pages: Paginator,
    ledger: ToggleLedger,
}

/// The home feed: newest posts first, composed posts prepended.
pub struct FeedStateController {
    content: Arc<dyn ContentGateway>,
    session: Arc<SessionContext>,
    options: ControllerOptions,
    state: Mutex<FeedState>,
    disposed: AtomicBool,
}

#[derive(Clone, Copy)]
enum PostToggle {
    Like,
    Share,
}

impl PostToggle {
    fn kind(self) -> ToggleKind {
        match self {
            PostToggle::Like => ToggleKind::PostLike,
            PostToggle::Share => ToggleKind::PostShare,
        }
    }

    fn flip(self, post: &mut Post) -> (ToggleCounts, ToggleCounts) {
        match self {
            PostToggle::Like => {
                let previous = post.like_counts();
                post.toggle_like();
                (previous, post.like_counts())
            }
            PostToggle::Share => {
                let previous = post.share_counts();
                post.toggle_share();
                (previous, post.share_counts())
            }
        }
    }

    fn counts(self, post: &Post) -> ToggleCounts {
        match self {
            PostToggle::Like => post.like_counts(),
            PostToggle::Share => post.share_counts(),
        }
    }

    fn apply(self, post: &mut Post, counts: ToggleCounts) {
        match self {
            PostToggle::Like => post.apply_like_counts(counts),
            PostToggle::Share => post.apply_share_counts(counts),
        }
    }
}

impl FeedStateController {
    pub fn new(
        content: Arc<dyn ContentGateway>,
        session: Arc<SessionContext>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            content,
            session,
            options,
            state: Mutex::new(FeedState::default()),
            disposed: AtomicBool::new(false),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> ClientResult<()> {
        if self.is_disposed() {
            Err(ClientError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Fetch the first page of the feed.
    pub async fn load_initial(&self) -> ClientResult<Vec<Post>> {
        self.ensure_live()?;
        {
            let state = self.state.lock().await;
            state.phase.ensure_loadable(state.loading)?;
        }
        self.fetch_first_page().await
    }

    /// Re-issue the initial load after it failed.
    pub async fn retry(&self) -> ClientResult<Vec<Post>> {
        self.ensure_live()?;
        {
            let mut state = self.state.lock().await;
            if !matches!(state.phase, Phase::Failed(_)) {
                return Err(ClientError::InvalidOperation(
                    "nothing to retry".to_string(),
                ));
            }
            state.phase = Phase::Loading;
        }
        self.fetch_first_page().await
    }

    async fn fetch_first_page(&self) -> ClientResult<Vec<Post>> {
        let token = {
            let mut state = self.state.lock().await;
            if state.loading {
                return Err(ClientError::InvalidOperation(
                    "load already in progress".to_string(),
                ));
            }
            let token = match state.pages.begin(None) {
                Ok(token) => token,
                Err(_) => {
                    return Err(ClientError::InvalidOperation(
                        "a page request is already in flight".to_string(),
                    ))
                }
            };
            state.loading = true;
            state.error = None;
            token
        };

        log::debug!(target: "gateway_calls", "list_feed(first page)");
        let result = self.content.list_feed(token.as_ref()).await;

        let mut state = self.state.lock().await;
        state.loading = false;
        if self.is_disposed() {
            state.pages.finish_failure();
            return Err(ClientError::Disposed);
        }

        match result {
            Ok(page) => {
                state.pages.finish_success(token, page.next.clone());
                state.posts = page.items;
                state.phase = Phase::Ready;
                log::info!(
                    target: "pagination",
                    "Feed loaded with {} posts (more: {})",
                    state.posts.len(),
                    state.pages.has_more()
                );
                Ok(state.posts.clone())
            }
            Err(e) => {
                state.pages.finish_failure();
                let err = ClientError::from_fetch(e);
                log::warn!(target: "gateway_calls", "Feed load failed: {}", err);
                state.posts.clear();
                state.phase = Phase::failed_with(&err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Publish a new post and put it at the top of the feed.
    ///
    /// Nothing is inserted until the backend has accepted the post.
    pub async fn compose(&self, content: &str) -> ClientResult<Post> {
        self.ensure_live()?;
        let authenticated = self.session.is_authenticated().await;
        {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            if let Err(e) = validate_post_content(content) {
                let err = ClientError::from(e);
                state.error = Some(err.user_message());
                return Err(err);
            }
            if state.submitting {
                return Err(ClientError::SubmissionInFlight);
            }
            if !authenticated {
                let err = ClientError::Permission("sign in to post".to_string());
                state.error = Some(err.user_message());
                return Err(err);
            }
            state.submitting = true;
            state.error = None;
        }

        log::debug!(target: "gateway_calls", "create_post({} chars)", content.chars().count());
        let result = self.content.create_post(content).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        match result {
            Ok(post) => {
                log::info!(target: "general", "Post {} created", post.id);
                state.posts.insert(0, post.clone());
                Ok(post)
            }
            Err(e) => {
                let err = ClientError::from_submission(e);
                log::warn!(target: "gateway_calls", "Post creation failed: {}", err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn toggle_like(&self, post_id: &str) -> ClientResult<ToggleOutcome> {
        self.toggle(post_id, PostToggle::Like).await
    }

    pub async fn toggle_share(&self, post_id: &str) -> ClientResult<ToggleOutcome> {
        self.toggle(post_id, PostToggle::Share).await
    }

    async fn toggle(&self, post_id: &str, toggle: PostToggle) -> ClientResult<ToggleOutcome> {
        self.ensure_live()?;
        let key = ToggleKey::new(toggle.kind(), post_id);
        let ticket = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) else {
                log::debug!(target: "optimistic", "Toggle on unknown post {} ignored", post_id);
                return Ok(ToggleOutcome::Missing);
            };
            let (previous, optimistic) = toggle.flip(post);
            log::debug!(
                target: "optimistic",
                "{} on {}: {:?} -> {:?}",
                key.kind.as_str(),
                post_id,
                previous,
                optimistic
            );
            state.ledger.begin(key.clone(), previous, optimistic)
        };

        let result = match toggle {
            PostToggle::Like => self.content.toggle_like(post_id).await,
            PostToggle::Share => self.content.toggle_share(post_id).await,
        };

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        let resolution = resolve_toggle(
            &mut state.ledger,
            &key,
            ticket,
            result,
            self.options.rollback_failed_toggles,
        );
        let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(ToggleOutcome::Missing);
        };
        let outcome = match resolution {
            Resolution::Confirmed(counts) => {
                toggle.apply(post, counts);
                ToggleOutcome::Applied(counts)
            }
            Resolution::RolledBack(counts) => {
                toggle.apply(post, counts);
                ToggleOutcome::RolledBack(counts)
            }
            Resolution::Unchanged => ToggleOutcome::Applied(toggle.counts(post)),
        };
        if let ToggleOutcome::RolledBack(_) = outcome {
            state.error = Some(
                ClientError::Submission(format!("{} was not saved", key.kind.as_str()))
                    .user_message(),
            );
        }
        Ok(outcome)
    }

    /// Append the next feed page.
    pub async fn load_more(&self) -> ClientResult<PageLoad> {
        self.ensure_live()?;
        let token = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            match state.pages.begin_next() {
                Ok(token) => token,
                Err(skipped) => {
                    log::debug!(target: "pagination", "Feed load_more skipped: {:?}", skipped);
                    return Ok(skipped);
                }
            }
        };

        log::debug!(target: "gateway_calls", "list_feed({:?})", token);
        let result = self.content.list_feed(token.as_ref()).await;

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            state.pages.finish_failure();
            return Ok(PageLoad::Discarded);
        }
        match result {
            Ok(page) => {
                let has_more = page.next.is_some();
                state.pages.finish_success(token, page.next);
                let added = append_unique(&mut state.posts, page.items, |p| p.id.as_str());
                log::debug!(target: "pagination", "Feed appended {} posts (more: {})", added, has_more);
                Ok(PageLoad::Loaded { added, has_more })
            }
            Err(e) => {
                state.pages.finish_failure();
                let err = ClientError::from_fetch(e);
                log::warn!(target: "pagination", "Feed page failed: {}", err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Tear the view down. Requests still in flight are discarded when they resolve.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            log::debug!(target: "general", "Feed controller disposed");
        }
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    pub async fn snapshot(&self) -> FeedView {
        let state = self.state.lock().await;
        FeedView {
            phase: state.phase,
            posts: state.posts.clone(),
            error: state.error.clone(),
            loading_more: state.pages.is_loading() && state.phase.is_ready(),
            has_more: state.pages.has_more(),
            submitting: state.submitting,
        }
    }
}

#[async_trait]
impl LoadMore for FeedStateController {
    async fn load_more(&self) -> ClientResult<PageLoad> {
        FeedStateController::load_more(self).await
    }
}
