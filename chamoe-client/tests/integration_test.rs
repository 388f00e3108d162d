use chamoe::gateway::memory::{GatewayOp, InMemoryBackend};
use chamoe::storage::{FileTokenStore, TokenStore};
use chamoe::{
    ClientError, ControllerOptions, FeedStateController, PageLoad, Phase, ProfileStateController,
    SessionContext, ThreadStateController, ToggleOutcome,
};
use chamoe_types::{ProfileTab, ToggleCounts};
use std::sync::Arc;
use tempfile::TempDir;

struct Client {
    backend: InMemoryBackend,
    session: Arc<SessionContext>,
}

impl Client {
    fn start(backend: &InMemoryBackend, data_dir: &TempDir) -> Self {
        let session = SessionContext::new(
            Arc::new(backend.session_gateway()),
            Arc::new(FileTokenStore::in_dir(data_dir.path())),
        );
        Self {
            backend: backend.clone(),
            session: Arc::new(session),
        }
    }

    fn feed(&self) -> FeedStateController {
        FeedStateController::new(
            Arc::new(self.backend.content_gateway()),
            self.session.clone(),
            ControllerOptions::default(),
        )
    }

    fn thread(&self) -> ThreadStateController {
        ThreadStateController::new(
            Arc::new(self.backend.content_gateway()),
            self.session.clone(),
            ControllerOptions::default(),
        )
    }

    fn profile(&self) -> ProfileStateController {
        ProfileStateController::new(
            Arc::new(self.backend.content_gateway()),
            self.session.clone(),
            ControllerOptions::default(),
        )
    }
}

#[tokio::test]
async fn test_session_survives_restart() {
    let data_dir = TempDir::new().unwrap();
    let backend = InMemoryBackend::seeded(5);

    let first = Client::start(&backend, &data_dir);
    assert_eq!(first.session.init().await.unwrap(), None);
    first.session.login("user1@example.com", "password").await.unwrap();
    assert!(FileTokenStore::in_dir(data_dir.path()).load_token().unwrap().is_some());

    // A new process sees a freshly seeded backend and the persisted token
    let restarted = Client::start(&InMemoryBackend::seeded(5), &data_dir);
    let user = restarted.session.init().await.unwrap().unwrap();
    assert_eq!(user.username, "user1");

    restarted.session.logout().await.unwrap();
    assert!(!restarted.session.is_authenticated().await);
    assert_eq!(
        FileTokenStore::in_dir(data_dir.path()).load_token().unwrap(),
        None
    );
}

#[tokio::test]
async fn test_feed_to_thread_flow() {
    let data_dir = TempDir::new().unwrap();
    let backend = InMemoryBackend::seeded(5);
    let client = Client::start(&backend, &data_dir);
    client.session.login("user2@example.com", "password").await.unwrap();

    let feed = client.feed();
    let posts = feed.load_initial().await.unwrap();
    assert_eq!(posts.len(), 5);
    let created = feed.compose("Chamoe season is here").await.unwrap();
    assert_eq!(feed.snapshot().await.posts[0].id, created.id);

    // The liked state carries over to a thread opened afterwards
    assert_eq!(
        feed.toggle_like("1").await.unwrap(),
        ToggleOutcome::Applied(ToggleCounts { active: true, count: 6 })
    );
    feed.dispose();

    let thread = client.thread();
    let post = thread.load("1").await.unwrap();
    assert!(post.is_liked);
    assert_eq!(post.likes, 6);

    let mut loaded = 0;
    while let PageLoad::Loaded { added, .. } = thread.load_more().await.unwrap() {
        loaded += added;
    }
    assert_eq!(loaded, 12);

    let mention = thread.mention_for("comment-2").await.unwrap();
    let reply = thread
        .submit_comment(&format!("{}agreed", mention))
        .await
        .unwrap();
    assert_eq!(reply.content, "@user3 agreed");
    assert_eq!(thread.snapshot().await.comments[0].id, reply.id);

    thread.delete_comment(&reply.id).await.unwrap();
    assert_eq!(thread.snapshot().await.comments.len(), 12);
}

#[tokio::test]
async fn test_backend_failure_rolls_back_delete() {
    let data_dir = TempDir::new().unwrap();
    let backend = InMemoryBackend::seeded(3);
    let client = Client::start(&backend, &data_dir);
    client.session.login("user3@example.com", "password").await.unwrap();

    let thread = client.thread();
    thread.load("1").await.unwrap();
    thread.load_more().await.unwrap();
    backend.fail_next(GatewayOp::DeleteComment).await;

    let before = thread.snapshot().await.comments;
    assert!(matches!(
        thread.delete_comment("comment-2").await,
        Err(ClientError::Submission(_))
    ));
    assert_eq!(thread.snapshot().await.comments, before);

    // The backend recovered; the delete goes through now
    thread.delete_comment("comment-2").await.unwrap();
    assert_eq!(thread.snapshot().await.comments.len(), 2);
}

#[tokio::test]
async fn test_profile_flow() {
    let data_dir = TempDir::new().unwrap();
    let backend = InMemoryBackend::seeded(5);
    let client = Client::start(&backend, &data_dir);
    client.session.login("user1@example.com", "password").await.unwrap();

    let profile = client.profile();
    profile.load("user2").await.unwrap();
    assert!(!profile.is_own_profile().await);
    assert_eq!(
        profile.toggle_follow().await.unwrap(),
        ToggleOutcome::Applied(ToggleCounts { active: true, count: 91 })
    );

    profile.select_tab(ProfileTab::Likes).await;
    assert_eq!(
        profile.load_more().await.unwrap(),
        PageLoad::Loaded { added: 0, has_more: false }
    );
    assert_eq!(profile.load_more().await.unwrap(), PageLoad::Exhausted);

    // A fresh view of the same profile sees the follow
    let again = client.profile();
    assert!(again.load("user2").await.unwrap().is_following);

    let own = client.profile();
    own.load("user1").await.unwrap();
    assert!(own.is_own_profile().await);
    assert!(matches!(
        own.toggle_follow().await,
        Err(ClientError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_failed_load_then_retry() {
    let data_dir = TempDir::new().unwrap();
    let backend = InMemoryBackend::seeded(5);
    let client = Client::start(&backend, &data_dir);
    backend.fail_next(GatewayOp::GetProfile).await;

    let profile = client.profile();
    assert!(matches!(profile.load("user4").await, Err(ClientError::Fetch(_))));
    assert!(matches!(profile.snapshot().await.phase, Phase::Failed(_)));

    let loaded = profile.retry().await.unwrap();
    assert_eq!(loaded.username, "user4");
    assert_eq!(profile.snapshot().await.phase, Phase::Ready);
}
