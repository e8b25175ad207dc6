//! Credential sources consulted by the channel.
//!
//! The channel never owns the auth token. It asks a [`CredentialSource`] for
//! the current token on every send, and delegates refresh and forced logout
//! to it when the backend reports an unauthorized session.

use parking_lot::RwLock;
use tracing::info;

use vaulthalla_core::catalog::{AuthLogin, AuthRefresh, LoginRequest};
use vaulthalla_core::model::{AuthSession, User};

use crate::channel::Channel;
use crate::error::{ChannelError, CredentialError};

/// External holder of the auth token.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// Token to embed in the next outgoing envelope, if any.
    fn token(&self) -> Option<String>;

    /// Obtain a fresh token after the backend rejected the current one.
    ///
    /// `channel` is the channel that received the unauthorized signal; sources
    /// that refresh over the command socket use it to send `auth.refresh`.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] if no fresh token could be obtained.
    async fn refresh(&self, channel: &Channel) -> Result<(), CredentialError>;

    /// Drop the session after refresh has been exhausted.
    async fn logout(&self);
}

/// A fixed token supplied up front, e.g. from `VAULTHALLA_TOKEN`.
///
/// It cannot be refreshed; a forced logout clears it so later non-`auth.`
/// commands fail fast instead of being rejected by the backend.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }
}

#[async_trait::async_trait]
impl CredentialSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn refresh(&self, _channel: &Channel) -> Result<(), CredentialError> {
        Err(CredentialError::Unsupported)
    }

    async fn logout(&self) {
        *self.token.write() = None;
        info!("static token cleared after unauthorized session");
    }
}

/// Session state populated by `auth.login` and kept fresh with `auth.refresh`.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    session: RwLock<Option<AuthSession>>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in over `channel` and store the resulting session.
    ///
    /// The channel must already be connected; `auth.` commands need no token.
    ///
    /// # Errors
    ///
    /// Returns the channel error if the login command fails.
    pub async fn login(
        &self,
        channel: &Channel,
        email: &str,
        password: &str,
    ) -> Result<User, ChannelError> {
        let request = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let session = channel.call::<AuthLogin>(&request).await?;
        let user = session.user.clone();
        self.set_session(session);
        info!(user_id = user.id, "logged in");
        Ok(user)
    }

    /// Replace the stored session.
    pub fn set_session(&self, session: AuthSession) {
        *self.session.write() = Some(session);
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    /// Forget the session locally.
    pub fn clear(&self) {
        *self.session.write() = None;
    }
}

#[async_trait::async_trait]
impl CredentialSource for SessionCredentials {
    fn token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.token.clone())
    }

    async fn refresh(&self, channel: &Channel) -> Result<(), CredentialError> {
        let session = channel.call::<AuthRefresh>(&()).await?;
        self.set_session(session);
        Ok(())
    }

    async fn logout(&self) {
        self.clear();
        info!("session cleared after unauthorized session");
    }
}
