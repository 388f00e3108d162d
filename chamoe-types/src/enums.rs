use serde::{Deserialize, Serialize};

/// Tabs on a profile page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTab {
    #[default]
    Posts,
    Likes,
}

impl ProfileTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileTab::Posts => "posts",
            ProfileTab::Likes => "likes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "posts" => Some(ProfileTab::Posts),
            "likes" => Some(ProfileTab::Likes),
            _ => None,
        }
    }
}

/// Kinds of viewer toggles that are applied optimistically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    PostLike,
    PostShare,
    CommentLike,
    Follow,
}

impl ToggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::PostLike => "post_like",
            ToggleKind::PostShare => "post_share",
            ToggleKind::CommentLike => "comment_like",
            ToggleKind::Follow => "follow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_tab_parse() {
        assert_eq!(ProfileTab::parse("Posts"), Some(ProfileTab::Posts));
        assert_eq!(ProfileTab::parse("likes"), Some(ProfileTab::Likes));
        assert_eq!(ProfileTab::parse("media"), None);
        assert_eq!(ProfileTab::default().as_str(), "posts");
    }
}
