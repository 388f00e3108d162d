//! In-memory backend that both gateways share.
//!
//! Content calls act on behalf of whichever user most recently logged in,
//! signed up or had a session restored; logout clears that viewer.

use async_trait::async_trait;
use chamoe_types::{
    AuthSession, Comment, Page, PageToken, Post, Profile, ToggleCounts, User, step_count,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ContentGateway, GatewayError, GatewayResult, SessionGateway};

pub const DEFAULT_AVATAR_URL: &str = "https://i.ibb.co/MV9cG2N/default-profile.webp";

/// Tokens look like `mock-<user id>.<uuid>`
const TOKEN_PREFIX: &str = "mock-";

/// Operations that can be made to fail once, for exercising error paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListFeed,
    CreatePost,
    GetPost,
    ListComments,
    CreateComment,
    DeleteComment,
    GetProfile,
    ListUserPosts,
    ListLikedPosts,
    Toggle,
}

struct Account {
    user: User,
    password: String,
    bio: Option<String>,
    joined_at: DateTime<Utc>,
    base_followers: u32,
    following_count: u32,
}

struct StoredPost {
    post: Post,
}

struct StoredComment {
    comment: Comment,
}

#[derive(Default)]
struct Backend {
    accounts: Vec<Account>,
    sessions: HashMap<String, String>, // token -> user id
    viewer: Option<String>,
    posts: Vec<StoredPost>, // newest first
    comments: Vec<StoredComment>,
    post_likes: HashSet<(String, String)>, // (user id, post id)
    post_shares: HashSet<(String, String)>,
    comment_likes: HashSet<(String, String)>,
    follows: HashSet<(String, String)>, // (follower id, followed username)
    page_size: usize,
    failures: HashSet<GatewayOp>,
}

impl Backend {
    fn seeded(page_size: usize) -> Self {
        let now = Utc::now();
        let mut backend = Backend {
            page_size: page_size.max(1),
            ..Default::default()
        };

        let names = ["user1", "user2", "user3", "user4"];
        for (i, name) in names.iter().enumerate() {
            let id = (i + 1).to_string();
            backend.accounts.push(Account {
                user: User {
                    id: id.clone(),
                    email: format!("{}@example.com", name),
                    username: name.to_string(),
                    display_name: format!("User {}", i + 1),
                    avatar_url: Some(DEFAULT_AVATAR_URL.to_string()),
                },
                password: "password".to_string(),
                bio: Some("Hello! Nice to meet you.".to_string()),
                joined_at: now - Duration::days(300 - i as i64 * 30),
                base_followers: 100 - i as u32 * 10,
                following_count: 50,
            });
        }

        let seed_posts: [(&str, &str, u32, u32); 7] = [
            ("1", "This is the first post!", 5, 2),
            ("2", "Melons are in season.", 12, 1),
            ("3", "Anyone up for a walk?", 0, 0),
            ("4", "Shipping a new feature today.", 42, 12),
            ("5", "Quiet morning.", 3, 0),
            ("6", "Reading list for the weekend.", 8, 4),
            ("7", "Hello from the other side.", 1, 0),
        ];
        for (i, (id, content, likes, shares)) in seed_posts.iter().enumerate() {
            let author = backend.accounts[i % backend.accounts.len()].user.as_author();
            backend.posts.push(StoredPost {
                post: Post {
                    id: id.to_string(),
                    content: content.to_string(),
                    author,
                    created_at: now - Duration::minutes(i as i64 * 45),
                    likes: *likes,
                    shares: *shares,
                    comments: 0,
                    is_liked: false,
                    is_shared: false,
                },
            });
        }

        for index in 0..12 {
            let author = backend.accounts[(index + 1) % backend.accounts.len()]
                .user
                .as_author();
            backend.comments.push(StoredComment {
                comment: Comment {
                    id: format!("comment-{}", index + 1),
                    post_id: "1".to_string(),
                    content: format!("This is comment number {}.", index + 1),
                    author,
                    created_at: now - Duration::minutes(index as i64),
                    likes: (index as u32 * 3) % 10,
                    is_liked: false,
                },
            });
        }
        backend.recount_comments("1");

        backend
    }

    fn take_failure(&mut self, op: GatewayOp) -> GatewayResult<()> {
        if self.failures.remove(&op) {
            log::debug!(target: "gateway_calls", "In-memory gateway failing {:?} on request", op);
            return Err(GatewayError::Network(format!("connection reset during {:?}", op)));
        }
        Ok(())
    }

    fn viewer_id(&self) -> GatewayResult<String> {
        self.viewer
            .clone()
            .ok_or_else(|| GatewayError::Unauthorized("no active session".to_string()))
    }

    fn account_by_id(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user.id == id)
    }

    fn account_by_username(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user.username == username)
    }

    fn recount_comments(&mut self, post_id: &str) {
        let count = self
            .comments
            .iter()
            .filter(|c| c.comment.post_id == post_id)
            .count() as u32;
        if let Some(stored) = self.posts.iter_mut().find(|p| p.post.id == post_id) {
            stored.post.comments = count;
        }
    }

    fn issue_session(&mut self, user: User) -> AuthSession {
        let token = format!("{}{}.{}", TOKEN_PREFIX, user.id, Uuid::new_v4());
        self.sessions.insert(token.clone(), user.id.clone());
        self.viewer = Some(user.id.clone());
        AuthSession { user, token }
    }

    fn view_post(&self, post: &Post) -> Post {
        let mut post = post.clone();
        if let Some(viewer) = &self.viewer {
            let key = (viewer.clone(), post.id.clone());
            post.is_liked = self.post_likes.contains(&key);
            post.is_shared = self.post_shares.contains(&key);
        }
        post
    }

    fn view_comment(&self, comment: &Comment) -> Comment {
        let mut comment = comment.clone();
        if let Some(viewer) = &self.viewer {
            comment.is_liked = self
                .comment_likes
                .contains(&(viewer.clone(), comment.id.clone()));
        }
        comment
    }

    fn followers_of(&self, username: &str, base: u32) -> u32 {
        let follows = self.follows.iter().filter(|(_, u)| u == username).count() as u32;
        base + follows
    }

    fn view_profile(&self, account: &Account) -> Profile {
        let username = &account.user.username;
        let is_following = self
            .viewer
            .as_ref()
            .map(|v| self.follows.contains(&(v.clone(), username.clone())))
            .unwrap_or(false);
        Profile {
            id: account.user.id.clone(),
            username: username.clone(),
            display_name: account.user.display_name.clone(),
            avatar_url: account.user.avatar_url.clone(),
            bio: account.bio.clone(),
            followers_count: self.followers_of(username, account.base_followers),
            following_count: account.following_count,
            joined_at: account.joined_at,
            is_following,
        }
    }

    fn paginate<T: Clone>(&self, items: Vec<T>, cursor: Option<&PageToken>) -> GatewayResult<Page<T>> {
        let offset = match cursor {
            None => 0,
            Some(token) => token
                .as_str()
                .parse::<usize>()
                .map_err(|_| GatewayError::BadRequest(format!("invalid cursor: {}", token)))?,
        };
        let end = (offset + self.page_size).min(items.len());
        let page_items = if offset < items.len() {
            items[offset..end].to_vec()
        } else {
            Vec::new()
        };
        let next = if end < items.len() {
            Some(PageToken::new(end.to_string()))
        } else {
            None
        };
        Ok(Page::new(page_items, next))
    }
}

/// Shared handle to the in-memory backend
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Mutex<Backend>>,
}

impl InMemoryBackend {
    /// Backend seeded with demonstration users, posts and comments
    pub fn seeded(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Backend::seeded(page_size))),
        }
    }

    pub fn session_gateway(&self) -> InMemorySessionGateway {
        InMemorySessionGateway {
            backend: self.clone(),
        }
    }

    pub fn content_gateway(&self) -> InMemoryContentGateway {
        InMemoryContentGateway {
            backend: self.clone(),
        }
    }

    /// Make the next call of `op` fail with a network error
    pub async fn fail_next(&self, op: GatewayOp) {
        self.inner.lock().await.failures.insert(op);
    }
}

#[derive(Clone)]
pub struct InMemorySessionGateway {
    backend: InMemoryBackend,
}

#[derive(Clone)]
pub struct InMemoryContentGateway {
    backend: InMemoryBackend,
}

impl InMemoryContentGateway {
    pub fn backend(&self) -> &InMemoryBackend {
        &self.backend
    }
}

#[async_trait]
impl SessionGateway for InMemorySessionGateway {
    async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthSession> {
        let mut backend = self.backend.inner.lock().await;
        let user = backend
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.user.clone())
            .ok_or_else(|| GatewayError::Unauthorized("invalid email or password".to_string()))?;
        Ok(backend.issue_session(user))
    }

    async fn signup(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> GatewayResult<AuthSession> {
        let mut backend = self.backend.inner.lock().await;
        if backend.account_by_username(username).is_some() {
            return Err(GatewayError::BadRequest(format!(
                "username '{}' is already taken",
                username
            )));
        }
        if backend
            .accounts
            .iter()
            .any(|a| a.user.email.eq_ignore_ascii_case(email))
        {
            return Err(GatewayError::BadRequest(format!(
                "email '{}' is already registered",
                email
            )));
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            display_name: username.to_string(),
            avatar_url: None,
        };
        backend.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            bio: None,
            joined_at: Utc::now(),
            base_followers: 0,
            following_count: 0,
        });
        Ok(backend.issue_session(user))
    }

    async fn current_user(&self, token: &str) -> GatewayResult<Option<User>> {
        let mut backend = self.backend.inner.lock().await;
        // Tokens issued by an earlier process still name a seeded account
        let user_id = match backend.sessions.get(token) {
            Some(id) => Some(id.clone()),
            None => token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|rest| rest.split_once('.'))
                .map(|(id, _)| id.to_string()),
        };
        let user = user_id
            .as_deref()
            .and_then(|id| backend.account_by_id(id))
            .map(|a| a.user.clone());
        if let Some(user) = &user {
            backend.sessions.insert(token.to_string(), user.id.clone());
            backend.viewer = Some(user.id.clone());
        }
        Ok(user)
    }

    async fn logout(&self, token: &str) -> GatewayResult<()> {
        let mut backend = self.backend.inner.lock().await;
        if let Some(user_id) = backend.sessions.remove(token) {
            if backend.viewer.as_deref() == Some(user_id.as_str()) {
                backend.viewer = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContentGateway for InMemoryContentGateway {
    async fn list_feed(&self, cursor: Option<&PageToken>) -> GatewayResult<Page<Post>> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::ListFeed)?;
        let posts: Vec<Post> = backend.posts.iter().map(|p| backend.view_post(&p.post)).collect();
        backend.paginate(posts, cursor)
    }

    async fn create_post(&self, content: &str) -> GatewayResult<Post> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::CreatePost)?;
        let viewer = backend.viewer_id()?;
        chamoe_types::validate_post_content(content)
            .map_err(|e| GatewayError::BadRequest(e.to_string()))?;
        let author = backend
            .account_by_id(&viewer)
            .map(|a| a.user.as_author())
            .ok_or_else(|| GatewayError::Unauthorized("session user no longer exists".to_string()))?;
        let post = Post {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            author,
            created_at: Utc::now(),
            likes: 0,
            shares: 0,
            comments: 0,
            is_liked: false,
            is_shared: false,
        };
        backend.posts.insert(0, StoredPost { post: post.clone() });
        Ok(post)
    }

    async fn get_post(&self, post_id: &str) -> GatewayResult<Post> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::GetPost)?;
        backend
            .posts
            .iter()
            .find(|p| p.post.id == post_id)
            .map(|p| backend.view_post(&p.post))
            .ok_or_else(|| GatewayError::NotFound(format!("post {}", post_id)))
    }

    async fn list_comments(
        &self,
        post_id: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Comment>> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::ListComments)?;
        if !backend.posts.iter().any(|p| p.post.id == post_id) {
            return Err(GatewayError::NotFound(format!("post {}", post_id)));
        }
        let comments: Vec<Comment> = backend
            .comments
            .iter()
            .filter(|c| c.comment.post_id == post_id)
            .map(|c| backend.view_comment(&c.comment))
            .collect();
        backend.paginate(comments, cursor)
    }

    async fn create_comment(&self, post_id: &str, content: &str) -> GatewayResult<Comment> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::CreateComment)?;
        let viewer = backend.viewer_id()?;
        if !backend.posts.iter().any(|p| p.post.id == post_id) {
            return Err(GatewayError::NotFound(format!("post {}", post_id)));
        }
        chamoe_types::validate_comment_content(content)
            .map_err(|e| GatewayError::BadRequest(e.to_string()))?;
        let author = backend
            .account_by_id(&viewer)
            .map(|a| a.user.as_author())
            .ok_or_else(|| GatewayError::Unauthorized("session user no longer exists".to_string()))?;
        let comment = Comment {
            id: format!("comment-{}", Uuid::new_v4()),
            post_id: post_id.to_string(),
            content: content.to_string(),
            author,
            created_at: Utc::now(),
            likes: 0,
            is_liked: false,
        };
        backend.comments.insert(
            0,
            StoredComment {
                comment: comment.clone(),
            },
        );
        backend.recount_comments(post_id);
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: &str) -> GatewayResult<()> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::DeleteComment)?;
        let viewer = backend.viewer_id()?;
        let index = backend
            .comments
            .iter()
            .position(|c| c.comment.id == comment_id)
            .ok_or_else(|| GatewayError::NotFound(format!("comment {}", comment_id)))?;
        if backend.comments[index].comment.author.id != viewer {
            return Err(GatewayError::Forbidden(
                "only the author can delete a comment".to_string(),
            ));
        }
        let removed = backend.comments.remove(index);
        backend.recount_comments(&removed.comment.post_id);
        Ok(())
    }

    async fn get_profile(&self, username: &str) -> GatewayResult<Profile> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::GetProfile)?;
        backend
            .account_by_username(username)
            .map(|a| backend.view_profile(a))
            .ok_or_else(|| GatewayError::NotFound(format!("user {}", username)))
    }

    async fn list_user_posts(
        &self,
        username: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Post>> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::ListUserPosts)?;
        if backend.account_by_username(username).is_none() {
            return Err(GatewayError::NotFound(format!("user {}", username)));
        }
        let posts: Vec<Post> = backend
            .posts
            .iter()
            .filter(|p| p.post.author.username == username)
            .map(|p| backend.view_post(&p.post))
            .collect();
        backend.paginate(posts, cursor)
    }

    async fn list_liked_posts(
        &self,
        username: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Post>> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::ListLikedPosts)?;
        let user_id = backend
            .account_by_username(username)
            .map(|a| a.user.id.clone())
            .ok_or_else(|| GatewayError::NotFound(format!("user {}", username)))?;
        let posts: Vec<Post> = backend
            .posts
            .iter()
            .filter(|p| backend.post_likes.contains(&(user_id.clone(), p.post.id.clone())))
            .map(|p| backend.view_post(&p.post))
            .collect();
        backend.paginate(posts, cursor)
    }

    async fn toggle_like(&self, post_id: &str) -> GatewayResult<ToggleCounts> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::Toggle)?;
        let viewer = backend.viewer_id()?;
        let key = (viewer, post_id.to_string());
        let active = !backend.post_likes.contains(&key);
        let stored = backend
            .posts
            .iter_mut()
            .find(|p| p.post.id == post_id)
            .ok_or_else(|| GatewayError::NotFound(format!("post {}", post_id)))?;
        stored.post.likes = step_count(stored.post.likes, active);
        let count = stored.post.likes;
        if active {
            backend.post_likes.insert(key);
        } else {
            backend.post_likes.remove(&key);
        }
        Ok(ToggleCounts { active, count })
    }

    async fn toggle_share(&self, post_id: &str) -> GatewayResult<ToggleCounts> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::Toggle)?;
        let viewer = backend.viewer_id()?;
        let key = (viewer, post_id.to_string());
        let active = !backend.post_shares.contains(&key);
        let stored = backend
            .posts
            .iter_mut()
            .find(|p| p.post.id == post_id)
            .ok_or_else(|| GatewayError::NotFound(format!("post {}", post_id)))?;
        stored.post.shares = step_count(stored.post.shares, active);
        let count = stored.post.shares;
        if active {
            backend.post_shares.insert(key);
        } else {
            backend.post_shares.remove(&key);
        }
        Ok(ToggleCounts { active, count })
    }

    async fn toggle_comment_like(&self, comment_id: &str) -> GatewayResult<ToggleCounts> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::Toggle)?;
        let viewer = backend.viewer_id()?;
        let key = (viewer, comment_id.to_string());
        let active = !backend.comment_likes.contains(&key);
        let stored = backend
            .comments
            .iter_mut()
            .find(|c| c.comment.id == comment_id)
            .ok_or_else(|| GatewayError::NotFound(format!("comment {}", comment_id)))?;
        stored.comment.likes = step_count(stored.comment.likes, active);
        let count = stored.comment.likes;
        if active {
            backend.comment_likes.insert(key);
        } else {
            backend.comment_likes.remove(&key);
        }
        Ok(ToggleCounts { active, count })
    }

    async fn toggle_follow(&self, username: &str) -> GatewayResult<ToggleCounts> {
        let mut backend = self.backend.inner.lock().await;
        backend.take_failure(GatewayOp::Toggle)?;
        let viewer = backend.viewer_id()?;
        let base = backend
            .account_by_username(username)
            .map(|a| a.base_followers)
            .ok_or_else(|| GatewayError::NotFound(format!("user {}", username)))?;
        if backend
            .account_by_id(&viewer)
            .map(|a| a.user.username == username)
            .unwrap_or(false)
        {
            return Err(GatewayError::BadRequest("cannot follow yourself".to_string()));
        }
        let key = (viewer, username.to_string());
        let active = !backend.follows.contains(&key);
        if active {
            backend.follows.insert(key);
        } else {
            backend.follows.remove(&key);
        }
        Ok(ToggleCounts {
            active,
            count: backend.followers_of(username, base),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_pages_are_disjoint_and_end() {
        let backend = InMemoryBackend::seeded(3);
        let content = backend.content_gateway();

        let first = content.list_feed(None).await.unwrap();
        assert_eq!(first.items.len(), 3);
        let second = content.list_feed(first.next.as_ref()).await.unwrap();
        assert_eq!(second.items.len(), 3);
        let third = content.list_feed(second.next.as_ref()).await.unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.next.is_none());

        let mut ids: Vec<String> = first
            .items
            .iter()
            .chain(second.items.iter())
            .chain(third.items.iter())
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let backend = InMemoryBackend::seeded(5);
        let session = backend.session_gateway();
        let result = session.login("user1@example.com", "wrong").await;
        assert!(matches!(result, Err(GatewayError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_toggle_like_requires_session_and_reports_counts() {
        let backend = InMemoryBackend::seeded(5);
        let content = backend.content_gateway();
        assert!(matches!(
            content.toggle_like("1").await,
            Err(GatewayError::Unauthorized(_))
        ));

        backend
            .session_gateway()
            .login("user1@example.com", "password")
            .await
            .unwrap();
        let counts = content.toggle_like("1").await.unwrap();
        assert_eq!(counts, ToggleCounts { active: true, count: 6 });
        let post = content.get_post("1").await.unwrap();
        assert!(post.is_liked);
        let counts = content.toggle_like("1").await.unwrap();
        assert_eq!(counts, ToggleCounts { active: false, count: 5 });
    }

    #[tokio::test]
    async fn test_share_and_comment_like_counters_step_back() {
        let backend = InMemoryBackend::seeded(5);
        backend
            .session_gateway()
            .login("user1@example.com", "password")
            .await
            .unwrap();
        let content = backend.content_gateway();

        let shares = content.get_post("1").await.unwrap().shares;
        let shared = content.toggle_share("1").await.unwrap();
        assert_eq!(shared, ToggleCounts { active: true, count: shares + 1 });
        let unshared = content.toggle_share("1").await.unwrap();
        assert_eq!(unshared, ToggleCounts { active: false, count: shares });

        let liked = content.toggle_comment_like("comment-1").await.unwrap();
        assert_eq!(liked, ToggleCounts { active: true, count: 1 });
        let unliked = content.toggle_comment_like("comment-1").await.unwrap();
        assert_eq!(unliked, ToggleCounts { active: false, count: 0 });
    }

    #[tokio::test]
    async fn test_delete_comment_checks_author() {
        let backend = InMemoryBackend::seeded(5);
        backend
            .session_gateway()
            .login("user1@example.com", "password")
            .await
            .unwrap();
        let content = backend.content_gateway();
        // comment-1 is written by user2
        assert!(matches!(
            content.delete_comment("comment-1").await,
            Err(GatewayError::Forbidden(_))
        ));
        let mine = content.create_comment("1", "mine").await.unwrap();
        content.delete_comment(&mine.id).await.unwrap();
        assert!(matches!(
            content.delete_comment(&mine.id).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_token_restores_in_fresh_backend() {
        let first = InMemoryBackend::seeded(5);
        let session = first.session_gateway().login("user3@example.com", "password").await.unwrap();

        let restarted = InMemoryBackend::seeded(5);
        let user = restarted.session_gateway().current_user(&session.token).await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("user3".to_string()));
        assert_eq!(
            restarted.session_gateway().current_user("mock-99.abc").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_fail_next_fails_once() {
        let backend = InMemoryBackend::seeded(5);
        let content = backend.content_gateway();
        backend.fail_next(GatewayOp::GetPost).await;
        assert!(matches!(
            content.get_post("1").await,
            Err(GatewayError::Network(_))
        ));
        assert!(content.get_post("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_bad_request() {
        let backend = InMemoryBackend::seeded(5);
        let content = backend.content_gateway();
        let cursor = PageToken::new("not-a-number");
        assert!(matches!(
            content.list_feed(Some(&cursor)).await,
            Err(GatewayError::BadRequest(_))
        ));
    }
}
