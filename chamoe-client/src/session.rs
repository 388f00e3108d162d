use chamoe_types::{validate_email, validate_password, validate_username, AuthSession, User};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ClientError, ClientResult};
use crate::gateway::{GatewayError, SessionGateway};
use crate::storage::TokenStore;

#[derive(Debug, Clone)]
struct ActiveSession {
    user: User,
    token: String,
}

/// The signed-in viewer, shared by every controller of one client.
///
/// Created once at startup and injected into controllers. `init` restores a
/// persisted session; `logout` tears it down and clears the stored token.
pub struct SessionContext {
    gateway: Arc<dyn SessionGateway>,
    store: Arc<dyn TokenStore>,
    active: RwLock<Option<ActiveSession>>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn SessionGateway>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            gateway,
            store,
            active: RwLock::new(None),
        }
    }

    /// Try to restore the session from the persisted token.
    ///
    /// A token the backend no longer recognises is cleared. A transport failure
    /// keeps the token for the next start and reports `Fetch`.
    pub async fn init(&self) -> ClientResult<Option<User>> {
        let token = match self.store.load_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::debug!(target: "session", "No persisted session token");
                return Ok(None);
            }
            Err(e) => {
                log::warn!(target: "session", "Failed to read session token: {:#}", e);
                return Ok(None);
            }
        };

        match self.gateway.current_user(&token).await {
            Ok(Some(user)) => {
                log::info!(target: "session", "Restored session for {}", user.username);
                *self.active.write().await = Some(ActiveSession {
                    user: user.clone(),
                    token,
                });
                Ok(Some(user))
            }
            Ok(None) => {
                log::info!(target: "session", "Persisted session expired, clearing token");
                if let Err(e) = self.store.clear_token() {
                    log::warn!(target: "session", "Failed to clear stale token: {:#}", e);
                }
                Ok(None)
            }
            Err(e) => {
                log::warn!(target: "session", "Session restore failed: {}", e);
                Err(ClientError::Fetch(e.to_string()))
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let session = self
            .gateway
            .login(&email, password)
            .await
            .map_err(auth_error)?;
        Ok(self.begin(session).await)
    }

    pub async fn signup(&self, email: &str, password: &str, username: &str) -> ClientResult<User> {
        let email = validate_email(email)?;
        validate_password(password)?;
        let username = validate_username(username)?;

        let session = self
            .gateway
            .signup(&email, password, &username)
            .await
            .map_err(auth_error)?;
        Ok(self.begin(session).await)
    }

    /// End the session. The backend call is best effort; local state is always cleared.
    pub async fn logout(&self) -> ClientResult<()> {
        let previous = self.active.write().await.take();

        if let Some(session) = previous {
            if let Err(e) = self.gateway.logout(&session.token).await {
                log::warn!(target: "session", "Backend logout failed: {}", e);
            }
            log::info!(target: "session", "Logged out {}", session.user.username);
        }

        self.store
            .clear_token()
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))
    }

    pub async fn current_user(&self) -> Option<User> {
        self.active.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.active.read().await.is_some()
    }

    async fn begin(&self, session: AuthSession) -> User {
        // A failed save only costs the restore on next start
        if let Err(e) = self.store.store_token(&session.token) {
            log::warn!(target: "session", "Failed to persist session token: {:#}", e);
        }
        log::info!(target: "session", "Signed in as {}", session.user.username);
        let user = session.user.clone();
        *self.active.write().await = Some(ActiveSession {
            user: session.user,
            token: session.token,
        });
        user
    }
}

fn auth_error(err: GatewayError) -> ClientError {
    match err {
        GatewayError::Network(msg) => ClientError::Fetch(msg),
        GatewayError::Unauthorized(msg)
        | GatewayError::BadRequest(msg)
        | GatewayError::Forbidden(msg)
        | GatewayError::NotFound(msg)
        | GatewayError::Api(msg) => ClientError::Auth(msg),
    }
}
