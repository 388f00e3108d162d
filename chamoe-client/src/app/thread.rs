use async_trait::async_trait;
use chamoe_types::{validate_comment_content, Comment, PageToken, Post, ToggleCounts, ToggleKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::state::{append_unique, resolve_toggle, Phase, Resolution, ThreadView, ToggleOutcome};
use crate::config::ControllerOptions;
use crate::error::{ClientError, ClientResult};
use crate::gateway::ContentGateway;
use crate::optimistic::{ToggleKey, ToggleLedger};
use crate::pagination::{LoadMore, PageLoad, Paginator};
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct ThreadState {
    phase: Phase,
    post_id: Option<String>,
    post: Option<Post>,
    comments: Vec<Comment>,
    /// Bumped on every change to `comments`
    revision: u64,
    error: Option<String>,
    loading: bool,
    submitting: bool,
    pages: Paginator,
    ledger: ToggleLedger,
}

impl ThreadState {
    fn post_id(&self) -> ClientResult<String> {
        self.post_id
            .clone()
            .ok_or_else(|| ClientError::InvalidOperation("no post loaded".to_string()))
    }
}

/// One post with its comment thread.
///
/// The post is loaded by [`load`](Self::load); comments arrive page by page
/// through [`load_comments_page`](Self::load_comments_page) or
/// [`load_more`](Self::load_more), with at most one page request in flight.
pub struct ThreadStateController {
    content: Arc<dyn ContentGateway>,
    session: Arc<SessionContext>,
    options: ControllerOptions,
    state: Mutex<ThreadState>,
    disposed: AtomicBool,
}

enum Target {
    PostLike,
    PostShare,
    CommentLike(String),
}

impl Target {
    fn key(&self, post_id: &str) -> ToggleKey {
        match self {
            Target::PostLike => ToggleKey::new(ToggleKind::PostLike, post_id),
            Target::PostShare => ToggleKey::new(ToggleKind::PostShare, post_id),
            Target::CommentLike(id) => ToggleKey::new(ToggleKind::CommentLike, id.as_str()),
        }
    }

    /// Flip the target in place, returning (previous, optimistic) counts
    fn flip(&self, state: &mut ThreadState) -> Option<(ToggleCounts, ToggleCounts)> {
        match self {
            Target::PostLike => state.post.as_mut().map(|post| {
                let previous = post.like_counts();
                post.toggle_like();
                (previous, post.like_counts())
            }),
            Target::PostShare => state.post.as_mut().map(|post| {
                let previous = post.share_counts();
                post.toggle_share();
                (previous, post.share_counts())
            }),
            Target::CommentLike(id) => {
                let flipped = state.comments.iter_mut().find(|c| &c.id == id).map(|c| {
                    let previous = c.like_counts();
                    c.toggle_like();
                    (previous, c.like_counts())
                });
                if flipped.is_some() {
                    state.revision += 1;
                }
                flipped
            }
        }
    }

    fn counts(&self, state: &ThreadState) -> Option<ToggleCounts> {
        match self {
            Target::PostLike => state.post.as_ref().map(|p| p.like_counts()),
            Target::PostShare => state.post.as_ref().map(|p| p.share_counts()),
            Target::CommentLike(id) => state
                .comments
                .iter()
                .find(|c| &c.id == id)
                .map(|c| c.like_counts()),
        }
    }

    fn apply(&self, state: &mut ThreadState, counts: ToggleCounts) -> bool {
        match self {
            Target::PostLike => state.post.as_mut().map(|p| p.apply_like_counts(counts)).is_some(),
            Target::PostShare => state.post.as_mut().map(|p| p.apply_share_counts(counts)).is_some(),
            Target::CommentLike(id) => {
                let applied = state
                    .comments
                    .iter_mut()
                    .find(|c| &c.id == id)
                    .map(|c| c.apply_like_counts(counts))
                    .is_some();
                if applied {
                    state.revision += 1;
                }
                applied
            }
        }
    }
}

/// Ids around a removed comment, used to put it back in place
struct Neighbours {
    before: Option<String>,
    after: Option<String>,
}

impl Neighbours {
    /// Right after the former predecessor, else right before the former
    /// successor, else the old index clamped to the list
    fn restore_index(&self, comments: &[Comment], index: usize) -> usize {
        let position = |id: &String| comments.iter().position(|c| &c.id == id);
        self.before
            .as_ref()
            .and_then(position)
            .map(|i| i + 1)
            .or_else(|| self.after.as_ref().and_then(position))
            .unwrap_or_else(|| index.min(comments.len()))
    }
}

impl ThreadStateController {
    pub fn new(
        content: Arc<dyn ContentGateway>,
        session: Arc<SessionContext>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            content,
            session,
            options,
            state: Mutex::new(ThreadState::default()),
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

    /// Fetch the post this thread belongs to.
    pub async fn load(&self, post_id: &str) -> ClientResult<Post> {
        self.ensure_live()?;
        {
            let mut state = self.state.lock().await;
            state.phase.ensure_loadable(state.loading)?;
            state.post_id = Some(post_id.to_string());
        }
        self.fetch_post().await
    }

    pub async fn retry(&self) -> ClientResult<Post> {
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
        self.fetch_post().await
    }

    async fn fetch_post(&self) -> ClientResult<Post> {
        let post_id = {
            let mut state = self.state.lock().await;
            if state.loading {
                return Err(ClientError::InvalidOperation(
                    "load already in progress".to_string(),
                ));
            }
            let post_id = state.post_id()?;
            state.loading = true;
            state.error = None;
            post_id
        };

        log::debug!(target: "gateway_calls", "get_post({})", post_id);
        let result = self.content.get_post(&post_id).await;

        let mut state = self.state.lock().await;
        state.loading = false;
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        match result {
            Ok(post) => {
                log::info!(target: "general", "Thread {} loaded", post.id);
                state.post = Some(post.clone());
                state.phase = Phase::Ready;
                Ok(post)
            }
            Err(e) => {
                let err = ClientError::from_fetch(e);
                log::warn!(target: "gateway_calls", "Loading post {} failed: {}", post_id, err);
                state.phase = Phase::failed_with(&err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Fetch the comment page at `token` (`None` is the first page) and append it.
    pub async fn load_comments_page(&self, token: Option<PageToken>) -> ClientResult<PageLoad> {
        self.ensure_live()?;
        let (post_id, token) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let post_id = state.post_id()?;
            match state.pages.begin(token) {
                Ok(token) => (post_id, token),
                Err(skipped) => {
                    log::debug!(target: "pagination", "Comment page skipped: {:?}", skipped);
                    return Ok(skipped);
                }
            }
        };
        self.fetch_comments(post_id, token).await
    }

    /// Fetch whatever comment page comes next.
    pub async fn load_more(&self) -> ClientResult<PageLoad> {
        self.ensure_live()?;
        let (post_id, token) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let post_id = state.post_id()?;
            match state.pages.begin_next() {
                Ok(token) => (post_id, token),
                Err(skipped) => {
                    log::debug!(target: "pagination", "Comment load_more skipped: {:?}", skipped);
                    return Ok(skipped);
                }
            }
        };
        self.fetch_comments(post_id, token).await
    }

    /// Runs with the page guard already claimed
    async fn fetch_comments(&self, post_id: String, token: Option<PageToken>) -> ClientResult<PageLoad> {
        log::debug!(target: "gateway_calls", "list_comments({}, {:?})", post_id, token);
        let result = self.content.list_comments(&post_id, token.as_ref()).await;

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            state.pages.finish_failure();
            return Ok(PageLoad::Discarded);
        }
        match result {
            Ok(page) => {
                let has_more = page.next.is_some();
                state.pages.finish_success(token, page.next);
                let added = append_unique(&mut state.comments, page.items, |c| c.id.as_str());
                if added > 0 {
                    state.revision += 1;
                }
                log::debug!(
                    target: "pagination",
                    "Thread {} appended {} comments (more: {})",
                    post_id,
                    added,
                    has_more
                );
                Ok(PageLoad::Loaded { added, has_more })
            }
            Err(e) => {
                state.pages.finish_failure();
                let err = ClientError::from_fetch(e);
                log::warn!(target: "pagination", "Comment page for {} failed: {}", post_id, err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn toggle_like(&self) -> ClientResult<ToggleOutcome> {
        self.toggle(Target::PostLike).await
    }

    pub async fn toggle_share(&self) -> ClientResult<ToggleOutcome> {
        self.toggle(Target::PostShare).await
    }

    pub async fn toggle_comment_like(&self, comment_id: &str) -> ClientResult<ToggleOutcome> {
        self.toggle(Target::CommentLike(comment_id.to_string())).await
    }

    async fn toggle(&self, target: Target) -> ClientResult<ToggleOutcome> {
        self.ensure_live()?;
        let (key, ticket) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let post_id = state.post_id()?;
            let key = target.key(&post_id);
            let Some((previous, optimistic)) = target.flip(&mut state) else {
                log::debug!(target: "optimistic", "Toggle on unknown {} ignored", key.target);
                return Ok(ToggleOutcome::Missing);
            };
            log::debug!(
                target: "optimistic",
                "{} on {}: {:?} -> {:?}",
                key.kind.as_str(),
                key.target,
                previous,
                optimistic
            );
            let ticket = state.ledger.begin(key.clone(), previous, optimistic);
            (key, ticket)
        };

        let result = match &target {
            Target::PostLike => self.content.toggle_like(&key.target).await,
            Target::PostShare => self.content.toggle_share(&key.target).await,
            Target::CommentLike(id) => self.content.toggle_comment_like(id).await,
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
        let outcome = match resolution {
            Resolution::Confirmed(counts) => {
                if !target.apply(&mut state, counts) {
                    return Ok(ToggleOutcome::Missing);
                }
                ToggleOutcome::Applied(counts)
            }
            Resolution::RolledBack(counts) => {
                if !target.apply(&mut state, counts) {
                    return Ok(ToggleOutcome::Missing);
                }
                state.error = Some(
                    ClientError::Submission(format!("{} was not saved", key.kind.as_str()))
                        .user_message(),
                );
                ToggleOutcome::RolledBack(counts)
            }
            Resolution::Unchanged => match target.counts(&state) {
                Some(counts) => ToggleOutcome::Applied(counts),
                None => ToggleOutcome::Missing,
            },
        };
        Ok(outcome)
    }

    /// Post a comment and put it at the head of the thread.
    ///
    /// The post's `comments` counter is left to the backend.
    pub async fn submit_comment(&self, content: &str) -> ClientResult<Comment> {
        self.ensure_live()?;
        let authenticated = self.session.is_authenticated().await;
        let post_id = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            if let Err(e) = validate_comment_content(content) {
                let err = ClientError::from(e);
                state.error = Some(err.user_message());
                return Err(err);
            }
            if state.submitting {
                return Err(ClientError::SubmissionInFlight);
            }
            if !authenticated {
                let err = ClientError::Permission("sign in to comment".to_string());
                state.error = Some(err.user_message());
                return Err(err);
            }
            let post_id = state.post_id()?;
            state.submitting = true;
            state.error = None;
            post_id
        };

        log::debug!(target: "gateway_calls", "create_comment({})", post_id);
        let result = self.content.create_comment(&post_id, content).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        match result {
            Ok(comment) => {
                log::info!(target: "general", "Comment {} added to {}", comment.id, post_id);
                state.comments.insert(0, comment.clone());
                state.revision += 1;
                Ok(comment)
            }
            Err(e) => {
                let err = ClientError::from_submission(e);
                log::warn!(target: "gateway_calls", "Comment submission failed: {}", err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Remove one of the viewer's own comments.
    ///
    /// The comment disappears immediately. If the backend refuses, the list is
    /// restored as it was, or, when the list changed in the meantime, the
    /// comment is put back next to its former neighbours.
    pub async fn delete_comment(&self, comment_id: &str) -> ClientResult<()> {
        self.ensure_live()?;
        let viewer = self.session.current_user().await;

        let (snapshot, removed, index, neighbours, revision) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let Some(index) = state.comments.iter().position(|c| c.id == comment_id) else {
                return Err(ClientError::NotFound(format!("comment {}", comment_id)));
            };
            let is_author = viewer
                .as_ref()
                .map(|user| user.id == state.comments[index].author.id)
                .unwrap_or(false);
            if !is_author {
                let err = ClientError::Permission("only the author can delete a comment".to_string());
                state.error = Some(err.user_message());
                return Err(err);
            }

            let snapshot = state.comments.clone();
            let removed = state.comments.remove(index);
            let neighbours = Neighbours {
                before: index
                    .checked_sub(1)
                    .map(|i| state.comments[i].id.clone()),
                after: state.comments.get(index).map(|c| c.id.clone()),
            };
            state.revision += 1;
            log::debug!(target: "optimistic", "Removed comment {} at index {}", comment_id, index);
            (snapshot, removed, index, neighbours, state.revision)
        };

        log::debug!(target: "gateway_calls", "delete_comment({})", comment_id);
        let result = self.content.delete_comment(comment_id).await;

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        match result {
            Ok(()) => {
                log::info!(target: "general", "Comment {} deleted", comment_id);
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from_submission(e);
                log::warn!(target: "optimistic", "Deleting comment {} failed, restoring: {}", comment_id, err);
                if state.revision == revision {
                    state.comments = snapshot;
                } else if !state.comments.iter().any(|c| c.id == removed.id) {
                    let at = neighbours.restore_index(&state.comments, index);
                    state.comments.insert(at, removed);
                }
                state.revision += 1;
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// `"@username "` prefill for replying to a comment
    pub async fn mention_for(&self, comment_id: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .map(|c| format!("@{} ", c.author.username))
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            log::debug!(target: "general", "Thread controller disposed");
        }
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    pub async fn snapshot(&self) -> ThreadView {
        let state = self.state.lock().await;
        ThreadView {
            phase: state.phase,
            post: state.post.clone(),
            comments: state.comments.clone(),
            error: state.error.clone(),
            loading_comments: state.pages.is_loading(),
            has_more_comments: state.pages.has_more(),
            submitting: state.submitting,
        }
    }
}

#[async_trait]
impl LoadMore for ThreadStateController {
    async fn load_more(&self) -> ClientResult<PageLoad> {
        ThreadStateController::load_more(self).await
    }
}
