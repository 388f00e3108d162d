//! Request/response contracts the controllers consume.
//!
//! Both gateways are transport-agnostic: the in-memory implementations in
//! [`memory`] stand in for a real backend.

mod error;
pub mod memory;

pub use error::{GatewayError, GatewayResult};
pub use memory::{InMemoryContentGateway, InMemorySessionGateway};

use async_trait::async_trait;
use chamoe_types::{AuthSession, Comment, Page, PageToken, Post, Profile, ToggleCounts, User};

/// Login, signup and session lookup
#[async_trait]
pub trait SessionGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> GatewayResult<AuthSession>;

    async fn signup(&self, email: &str, password: &str, username: &str)
        -> GatewayResult<AuthSession>;

    /// Resolve a persisted token back to its user. `None` when the token is no longer valid.
    async fn current_user(&self, token: &str) -> GatewayResult<Option<User>>;

    async fn logout(&self, token: &str) -> GatewayResult<()>;
}

/// Posts, comments and profiles
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn list_feed(&self, cursor: Option<&PageToken>) -> GatewayResult<Page<Post>>;

    async fn create_post(&self, content: &str) -> GatewayResult<Post>;

    async fn get_post(&self, post_id: &str) -> GatewayResult<Post>;

    async fn list_comments(
        &self,
        post_id: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Comment>>;

    async fn create_comment(&self, post_id: &str, content: &str) -> GatewayResult<Comment>;

    async fn delete_comment(&self, comment_id: &str) -> GatewayResult<()>;

    async fn get_profile(&self, username: &str) -> GatewayResult<Profile>;

    async fn list_user_posts(
        &self,
        username: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Post>>;

    async fn list_liked_posts(
        &self,
        username: &str,
        cursor: Option<&PageToken>,
    ) -> GatewayResult<Page<Post>>;

    async fn toggle_like(&self, post_id: &str) -> GatewayResult<ToggleCounts>;

    async fn toggle_share(&self, post_id: &str) -> GatewayResult<ToggleCounts>;

    async fn toggle_comment_like(&self, comment_id: &str) -> GatewayResult<ToggleCounts>;

    async fn toggle_follow(&self, username: &str) -> GatewayResult<ToggleCounts>;
}
