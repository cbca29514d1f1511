//! The identity service seam.
//!
//! Everything the forms and the session provider know about authentication
//! goes through [`IdentityService`]. The crate ships one implementation,
//! [`LocalIdentityService`], backed by the same `SQLite` file as the
//! application tables; tests substitute their own.

mod local;
mod password;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use local::{IdentitySettings, LocalIdentityService};
pub use password::{hash_password, verify_password};

/// Errors raised by the identity service. The display text is what the
/// forms show to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Sign-up with an email that already has an identity.
    #[error("User already registered")]
    UserAlreadyRegistered,

    /// The email is not shaped like an address.
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// The password is shorter than the configured minimum.
    #[error("Password should be at least {min} characters")]
    WeakPassword {
        /// Minimum accepted length.
        min: usize,
    },

    /// An operation needed a current session and there is none.
    #[error("Auth session missing!")]
    SessionMissing,

    /// The backing store failed.
    #[error("identity service failure: {0}")]
    Backend(String),
}

impl From<crate::error::Error> for AuthError {
    fn from(err: crate::error::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Result alias for identity operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity id; the profile row shares it.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Most recent sign-in, if any.
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token.
    pub access_token: String,
    /// The signed-in user.
    pub user: AuthUser,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// What a sign-up returned. Either part may be absent: `session` is `None`
/// when new identities must confirm before signing in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpResponse {
    /// The created identity.
    pub user: Option<AuthUser>,
    /// A session for it, when signed in immediately.
    pub session: Option<Session>,
}

/// Kind of auth-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    /// A session was established.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The session was reissued.
    TokenRefreshed,
    /// The user's identity data changed.
    UserUpdated,
}

/// An auth-state change and the session that resulted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// What happened.
    pub kind: AuthEventKind,
    /// The session after the change.
    pub session: Option<Session>,
}

impl AuthEvent {
    /// A sign-in event carrying `session`.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    /// A sign-out event.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }
}

/// A live subscription to auth-state changes.
///
/// Dropping the subscription or calling [`unsubscribe`](Self::unsubscribe)
/// releases it.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged` if events were dropped because the
    /// subscriber fell behind, and `RecvError::Closed` once the service is
    /// gone.
    pub async fn recv(&mut self) -> Result<AuthEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {
        drop(self.receiver);
    }
}

/// Operations of the identity/session service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchange an email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// Create an identity.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed email, a short password or an email
    /// that is already registered.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpResponse>;

    /// End the current session, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn sign_out(&self) -> AuthResult<()>;

    /// The current session, or `None` when signed out or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn get_session(&self) -> AuthResult<Option<Session>>;

    /// Subscribe to auth-state changes made after this call.
    fn subscribe(&self) -> AuthSubscription;
}
