//! Test doubles for the identity and profile seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{
    AuthError, AuthEvent, AuthResult, AuthSubscription, AuthUser, IdentityService, Session,
    SignUpResponse,
};
use crate::error::{Error, Result};
use crate::model::{NewProfile, UserProfile};
use crate::storage::ProfileStore;

pub(crate) const GOOD_PASSWORD: &str = "secret1";

pub(crate) fn session_for(id: Uuid, email: &str) -> Session {
    Session {
        access_token: format!("token-{id}"),
        user: AuthUser {
            id,
            email: email.to_string(),
            created_at: Utc::now(),
            last_sign_in_at: None,
        },
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Identity service whose session and events are driven by the test.
#[derive(Debug)]
pub(crate) struct FakeIdentityService {
    events: broadcast::Sender<AuthEvent>,
    session: Mutex<Option<Session>>,
    sign_up_returns_user: bool,
    get_session_calls: AtomicUsize,
}

impl FakeIdentityService {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            session: Mutex::new(None),
            sign_up_returns_user: true,
            get_session_calls: AtomicUsize::new(0),
        }
    }

    /// A service whose sign-up succeeds without returning a user.
    pub(crate) fn without_sign_up_user() -> Self {
        Self {
            sign_up_returns_user: false,
            ..Self::new()
        }
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    /// Replace the session and notify subscribers, if there are any.
    pub(crate) fn emit(&self, event: AuthEvent) {
        self.set_session(event.session.clone());
        let _ = self.events.send(event);
    }

    pub(crate) fn get_session_calls(&self) -> usize {
        self.get_session_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl IdentityService for FakeIdentityService {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        if password != GOOD_PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        let session = session_for(Uuid::new_v4(), email);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> AuthResult<SignUpResponse> {
        if !self.sign_up_returns_user {
            return Ok(SignUpResponse::default());
        }
        let session = session_for(Uuid::new_v4(), email);
        Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<Session>> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

/// Profile store whose inserts always fail.
#[derive(Debug, Default)]
pub(crate) struct FailingProfileStore;

pub(crate) const PROFILE_INSERT_FAILURE: &str = "duplicate key value violates unique constraint";

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn insert_profile(&self, _profile: &NewProfile) -> Result<UserProfile> {
        Err(Error::invalid_input(PROFILE_INSERT_FAILURE))
    }

    async fn fetch_profile(&self, uid: Uuid) -> Result<UserProfile> {
        Err(Error::not_found("users", uid))
    }
}
