use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

/// Minimal author profile embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: AuthorSummary,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    pub shares: u32,
    pub comments: u32,
    /// Whether the viewer has liked this post (local, per viewer)
    #[serde(default)]
    pub is_liked: bool,
    /// Whether the viewer has shared this post (local, per viewer)
    #[serde(default)]
    pub is_shared: bool,
}

impl Post {
    /// Flip the viewer's like and move the counter with it.
    pub fn toggle_like(&mut self) {
        self.is_liked = !self.is_liked;
        self.likes = step_count(self.likes, self.is_liked);
    }

    /// Flip the viewer's share and move the counter with it.
    pub fn toggle_share(&mut self) {
        self.is_shared = !self.is_shared;
        self.shares = step_count(self.shares, self.is_shared);
    }

    pub fn like_counts(&self) -> ToggleCounts {
        ToggleCounts {
            active: self.is_liked,
            count: self.likes,
        }
    }

    pub fn share_counts(&self) -> ToggleCounts {
        ToggleCounts {
            active: self.is_shared,
            count: self.shares,
        }
    }

    pub fn apply_like_counts(&mut self, counts: ToggleCounts) {
        self.is_liked = counts.active;
        self.likes = counts.count;
    }

    pub fn apply_share_counts(&mut self, counts: ToggleCounts) {
        self.is_shared = counts.active;
        self.shares = counts.count;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    /// Post this comment belongs to
    pub post_id: String,
    pub content: String,
    pub author: AuthorSummary,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    #[serde(default)]
    pub is_liked: bool,
}

impl Comment {
    pub fn toggle_like(&mut self) {
        self.is_liked = !self.is_liked;
        self.likes = step_count(self.likes, self.is_liked);
    }

    pub fn like_counts(&self) -> ToggleCounts {
        ToggleCounts {
            active: self.is_liked,
            count: self.likes,
        }
    }

    pub fn apply_like_counts(&mut self, counts: ToggleCounts) {
        self.is_liked = counts.active;
        self.likes = counts.count;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub followers_count: u32,
    pub following_count: u32,
    #[serde(with = "datetime_format")]
    pub joined_at: DateTime<Utc>,
    /// Whether the viewer follows this profile (local, per viewer)
    #[serde(default)]
    pub is_following: bool,
}

impl Profile {
    pub fn toggle_follow(&mut self) {
        self.is_following = !self.is_following;
        self.followers_count = step_count(self.followers_count, self.is_following);
    }

    pub fn follow_counts(&self) -> ToggleCounts {
        ToggleCounts {
            active: self.is_following,
            count: self.followers_count,
        }
    }

    pub fn apply_follow_counts(&mut self, counts: ToggleCounts) {
        self.is_following = counts.active;
        self.followers_count = counts.count;
    }

    pub fn as_author(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// The signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn as_author(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Confirmed state of a toggle after the backend applied it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleCounts {
    pub active: bool,
    pub count: u32,
}

/// Opaque cursor returned by a paginated fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One batch of a paginated listing. `next` is `None` at the end of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<PageToken>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Session credentials handed out by login and signup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Move a counter one step with a toggle, never below zero
pub fn step_count(count: u32, now_active: bool) -> u32 {
    if now_active {
        count.saturating_add(1)
    } else {
        count.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post(likes: u32, shares: u32) -> Post {
        Post {
            id: "1".to_string(),
            content: "first post".to_string(),
            author: AuthorSummary {
                id: "1".to_string(),
                username: "user1".to_string(),
                display_name: "User One".to_string(),
                avatar_url: None,
            },
            created_at: Utc::now(),
            likes,
            shares,
            comments: 0,
            is_liked: false,
            is_shared: false,
        }
    }

    #[test]
    fn test_toggle_like_round_trip() {
        let mut post = sample_post(5, 0);
        post.toggle_like();
        assert_eq!(post.likes, 6);
        assert!(post.is_liked);
        post.toggle_like();
        assert_eq!(post.likes, 5);
        assert!(!post.is_liked);
    }

    #[test]
    fn test_unshare_at_zero_saturates() {
        // Inconsistent server data: flagged as shared but zero shares
        let mut post = sample_post(0, 0);
        post.is_shared = true;
        post.toggle_share();
        assert_eq!(post.shares, 0);
        assert!(!post.is_shared);
    }

    #[test]
    fn test_local_flags_default_when_absent() {
        let json = r#"{
            "id": "7",
            "content": "hi",
            "author": {"id": "2", "username": "user2", "displayName": "User Two"},
            "createdAt": "2024-01-15T10:00:00+00:00",
            "likes": 1,
            "shares": 0,
            "comments": 3
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert!(!post.is_liked);
        assert!(!post.is_shared);
        assert_eq!(post.author.avatar_url, None);
        assert_eq!(post.comments, 3);
    }

    #[test]
    fn test_follow_toggle_moves_followers() {
        let mut profile = Profile {
            id: "1".to_string(),
            username: "user1".to_string(),
            display_name: "User One".to_string(),
            avatar_url: None,
            bio: None,
            followers_count: 100,
            following_count: 50,
            joined_at: Utc::now(),
            is_following: false,
        };
        profile.toggle_follow();
        assert_eq!(profile.follow_counts(), ToggleCounts { active: true, count: 101 });
        profile.toggle_follow();
        assert_eq!(profile.follow_counts(), ToggleCounts { active: false, count: 100 });
    }
}
