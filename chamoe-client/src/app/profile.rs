use async_trait::async_trait;
use chamoe_types::{step_count, Page, PageToken, Post, Profile, ProfileTab, ToggleCounts, ToggleKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::state::{append_unique, resolve_toggle, Phase, ProfileView, Resolution, ToggleOutcome};
use crate::config::ControllerOptions;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{ContentGateway, GatewayResult};
use crate::optimistic::{ToggleKey, ToggleLedger};
use crate::pagination::{LoadMore, PageLoad, Paginator};
use crate::session::SessionContext;

/// Posts of one tab plus its cursor state
#[derive(Debug, Default)]
struct TabList {
    posts: Vec<Post>,
    pages: Paginator,
}

#[derive(Debug, Default)]
struct ProfileState {
    phase: Phase,
    username: Option<String>,
    profile: Option<Profile>,
    active_tab: ProfileTab,
    posts_tab: TabList,
    likes_tab: TabList,
    error: Option<String>,
    loading: bool,
    ledger: ToggleLedger,
}

impl ProfileState {
    fn tab(&self, tab: ProfileTab) -> &TabList {
        match tab {
            ProfileTab::Posts => &self.posts_tab,
            ProfileTab::Likes => &self.likes_tab,
        }
    }

    fn tab_mut(&mut self, tab: ProfileTab) -> &mut TabList {
        match tab {
            ProfileTab::Posts => &mut self.posts_tab,
            ProfileTab::Likes => &mut self.likes_tab,
        }
    }

    /// Every copy of a post across both tabs
    fn occurrences_mut<'a>(&'a mut self, post_id: &'a str) -> impl Iterator<Item = &'a mut Post> + 'a {
        self.posts_tab
            .posts
            .iter_mut()
            .chain(self.likes_tab.posts.iter_mut())
            .filter(move |p| p.id == post_id)
    }

    fn username(&self) -> ClientResult<String> {
        self.username
            .clone()
            .ok_or_else(|| ClientError::InvalidOperation("no profile loaded".to_string()))
    }
}

/// A user's profile with its `posts` and `likes` tabs.
pub struct ProfileStateController {
    content: Arc<dyn ContentGateway>,
    session: Arc<SessionContext>,
    options: ControllerOptions,
    state: Mutex<ProfileState>,
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

impl ProfileStateController {
    pub fn new(
        content: Arc<dyn ContentGateway>,
        session: Arc<SessionContext>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            content,
            session,
            options,
            state: Mutex::new(ProfileState::default()),
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

    /// Load the profile, then the first page of its `posts` tab.
    ///
    /// A failed posts page leaves the profile shown with an error message.
    pub async fn load(&self, username: &str) -> ClientResult<Profile> {
        self.ensure_live()?;
        {
            let mut state = self.state.lock().await;
            state.phase.ensure_loadable(state.loading)?;
            state.username = Some(username.to_string());
        }
        self.fetch_profile().await
    }

    pub async fn retry(&self) -> ClientResult<Profile> {
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
        self.fetch_profile().await
    }

    async fn fetch_profile(&self) -> ClientResult<Profile> {
        let username = {
            let mut state = self.state.lock().await;
            if state.loading {
                return Err(ClientError::InvalidOperation(
                    "load already in progress".to_string(),
                ));
            }
            let username = state.username()?;
            state.loading = true;
            state.error = None;
            username
        };

        log::debug!(target: "gateway_calls", "get_profile({})", username);
        let result = self.content.get_profile(&username).await;

        let (profile, token) = {
            let mut state = self.state.lock().await;
            state.loading = false;
            if self.is_disposed() {
                return Err(ClientError::Disposed);
            }
            let profile = match result {
                Ok(profile) => profile,
                Err(e) => {
                    let err = ClientError::from_fetch(e);
                    log::warn!(target: "gateway_calls", "Loading profile {} failed: {}", username, err);
                    state.phase = Phase::failed_with(&err);
                    state.error = Some(err.user_message());
                    return Err(err);
                }
            };
            log::info!(target: "general", "Profile {} loaded", profile.username);
            state.profile = Some(profile.clone());
            state.phase = Phase::Ready;
            match state.posts_tab.pages.begin(None) {
                Ok(token) => (profile, token),
                // The first page is already loaded or loading
                Err(_) => return Ok(profile),
            }
        };

        // The profile stays visible even if its posts could not be fetched
        if let Err(e) = self.fetch_tab_page(ProfileTab::Posts, username, token).await {
            log::debug!(target: "general", "Profile shown without posts: {}", e);
        }
        Ok(profile)
    }

    /// Runs with the tab's page guard already claimed
    async fn fetch_tab_page(
        &self,
        tab: ProfileTab,
        username: String,
        token: Option<PageToken>,
    ) -> ClientResult<PageLoad> {
        log::debug!(
            target: "gateway_calls",
            "list {} tab of {} ({:?})",
            tab.as_str(),
            username,
            token
        );
        let result: GatewayResult<Page<Post>> = match tab {
            ProfileTab::Posts => self.content.list_user_posts(&username, token.as_ref()).await,
            ProfileTab::Likes => self.content.list_liked_posts(&username, token.as_ref()).await,
        };

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            state.tab_mut(tab).pages.finish_failure();
            return Ok(PageLoad::Discarded);
        }
        match result {
            Ok(page) => {
                let has_more = page.next.is_some();
                let list = state.tab_mut(tab);
                list.pages.finish_success(token, page.next);
                let added = append_unique(&mut list.posts, page.items, |p| p.id.as_str());
                log::debug!(
                    target: "pagination",
                    "{} tab of {} appended {} posts (more: {})",
                    tab.as_str(),
                    username,
                    added,
                    has_more
                );
                Ok(PageLoad::Loaded { added, has_more })
            }
            Err(e) => {
                state.tab_mut(tab).pages.finish_failure();
                let err = ClientError::from_fetch(e);
                log::warn!(target: "pagination", "{} tab of {} failed: {}", tab.as_str(), username, err);
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Switch tabs. No request is made; use [`load_more`](Self::load_more) to fill the tab.
    pub async fn select_tab(&self, tab: ProfileTab) {
        let mut state = self.state.lock().await;
        if state.active_tab != tab {
            log::debug!(target: "general", "Profile tab switched to {}", tab.as_str());
            state.active_tab = tab;
        }
    }

    /// Load the next page of the active tab (its first page if it was never loaded).
    pub async fn load_more(&self) -> ClientResult<PageLoad> {
        self.ensure_live()?;
        let (tab, username, token) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let username = state.username()?;
            let tab = state.active_tab;
            match state.tab_mut(tab).pages.begin_next() {
                Ok(token) => (tab, username, token),
                Err(skipped) => {
                    log::debug!(target: "pagination", "{} tab load_more skipped: {:?}", tab.as_str(), skipped);
                    return Ok(skipped);
                }
            }
        };
        self.fetch_tab_page(tab, username, token).await
    }

    /// Follow or unfollow this profile on behalf of the viewer.
    pub async fn toggle_follow(&self) -> ClientResult<ToggleOutcome> {
        self.ensure_live()?;
        let viewer = self.session.current_user().await;

        let (key, ticket) = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let Some(viewer) = viewer else {
                let err = ClientError::Permission("sign in to follow".to_string());
                state.error = Some(err.user_message());
                return Err(err);
            };
            let Some(profile) = state.profile.as_mut() else {
                return Err(ClientError::NotReady);
            };
            if profile.username == viewer.username {
                return Err(ClientError::InvalidOperation(
                    "You cannot follow yourself".to_string(),
                ));
            }
            let key = ToggleKey::new(ToggleKind::Follow, profile.username.as_str());
            let previous = profile.follow_counts();
            profile.toggle_follow();
            let optimistic = profile.follow_counts();
            log::debug!(
                target: "optimistic",
                "follow on {}: {:?} -> {:?}",
                key.target,
                previous,
                optimistic
            );
            let ticket = state.ledger.begin(key.clone(), previous, optimistic);
            (key, ticket)
        };

        let result = self.content.toggle_follow(&key.target).await;

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
        let Some(profile) = state.profile.as_mut() else {
            return Ok(ToggleOutcome::Missing);
        };
        let outcome = match resolution {
            Resolution::Confirmed(counts) => {
                profile.apply_follow_counts(counts);
                ToggleOutcome::Applied(counts)
            }
            Resolution::RolledBack(counts) => {
                profile.apply_follow_counts(counts);
                ToggleOutcome::RolledBack(counts)
            }
            Resolution::Unchanged => ToggleOutcome::Applied(profile.follow_counts()),
        };
        if let ToggleOutcome::RolledBack(_) = outcome {
            state.error = Some(
                ClientError::Submission("follow was not saved".to_string()).user_message(),
            );
        }
        Ok(outcome)
    }

    pub async fn toggle_like(&self, post_id: &str) -> ClientResult<ToggleOutcome> {
        self.toggle_post(post_id, PostToggle::Like).await
    }

    pub async fn toggle_share(&self, post_id: &str) -> ClientResult<ToggleOutcome> {
        self.toggle_post(post_id, PostToggle::Share).await
    }

    /// Toggles every copy of the post in both tabs together
    async fn toggle_post(&self, post_id: &str, toggle: PostToggle) -> ClientResult<ToggleOutcome> {
        self.ensure_live()?;
        let key = ToggleKey::new(toggle.kind(), post_id);
        let ticket = {
            let mut state = self.state.lock().await;
            state.phase.ensure_ready()?;
            let Some(previous) = state.occurrences_mut(post_id).next().map(|p| toggle.counts(p)) else {
                log::debug!(target: "optimistic", "Toggle on unknown post {} ignored", post_id);
                return Ok(ToggleOutcome::Missing);
            };
            let optimistic = ToggleCounts {
                active: !previous.active,
                count: step_count(previous.count, !previous.active),
            };
            for post in state.occurrences_mut(post_id) {
                toggle.apply(post, optimistic);
            }
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
        let settled = match resolution {
            Resolution::Confirmed(counts) | Resolution::RolledBack(counts) => {
                for post in state.occurrences_mut(post_id) {
                    toggle.apply(post, counts);
                }
                Some(counts)
            }
            Resolution::Unchanged => None,
        };
        let Some(current) = state.occurrences_mut(post_id).next().map(|p| toggle.counts(p)) else {
            return Ok(ToggleOutcome::Missing);
        };
        if let (Resolution::RolledBack(_), Some(counts)) = (resolution, settled) {
            state.error = Some(
                ClientError::Submission(format!("{} was not saved", key.kind.as_str()))
                    .user_message(),
            );
            return Ok(ToggleOutcome::RolledBack(counts));
        }
        Ok(ToggleOutcome::Applied(current))
    }

    /// Whether the viewer is looking at their own profile
    pub async fn is_own_profile(&self) -> bool {
        let Some(viewer) = self.session.current_user().await else {
            return false;
        };
        let state = self.state.lock().await;
        state
            .profile
            .as_ref()
            .map(|p| p.username == viewer.username)
            .unwrap_or(false)
    }

    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            log::debug!(target: "general", "Profile controller disposed");
        }
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    pub async fn snapshot(&self) -> ProfileView {
        let state = self.state.lock().await;
        let tab = state.tab(state.active_tab);
        ProfileView {
            phase: state.phase,
            profile: state.profile.clone(),
            active_tab: state.active_tab,
            posts: tab.posts.clone(),
            error: state.error.clone(),
            loading_more: tab.pages.is_loading(),
            has_more: tab.pages.has_more(),
        }
    }
}

#[async_trait]
impl LoadMore for ProfileStateController {
    async fn load_more(&self) -> ClientResult<PageLoad> {
        ProfileStateController::load_more(self).await
    }
}
