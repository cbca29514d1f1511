//! The session/profile provider.
//!
//! [`SessionProvider`] mirrors the identity service's session and the
//! matching profile row into a [`SessionState`] published on a `watch`
//! channel. A single background task owns every write: the initial sync, each
//! auth-state event in arrival order, and explicit resync requests. Each sync
//! raises the loading flag. The last failure message stays in place until a
//! later sync fails with a new one.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::{AuthSubscription, AuthUser, IdentityService, Session};
use crate::error::{Error, Result};
use crate::model::UserProfile;
use crate::nav::{Navigator, Route};
use crate::storage::ProfileStore;

/// Where the provider's state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// A sync is in progress.
    #[default]
    Loading,
    /// Signed in and the profile row was found.
    AuthenticatedWithProfile,
    /// Signed in but no profile row exists for the user.
    AuthenticatedWithoutProfile,
    /// Nobody is signed in.
    Anonymous,
    /// The session or profile could not be read.
    Error,
}

/// Snapshot of the provider's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// The signed-in user.
    pub user: Option<AuthUser>,
    /// The current session.
    pub session: Option<Session>,
    /// The user's profile row.
    pub profile: Option<UserProfile>,
    /// A sync is in progress.
    pub is_loading: bool,
    /// Message of the most recent session or profile failure. Successful
    /// syncs and sign-out leave it in place.
    pub error: Option<String>,
    /// State machine position.
    pub phase: SessionPhase,
    /// Number of completed syncs.
    pub revision: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            profile: None,
            is_loading: true,
            error: None,
            phase: SessionPhase::Loading,
            revision: 0,
        }
    }
}

#[derive(Debug)]
enum Command {
    Resync,
    Shutdown,
}

/// Process-wide session and profile store.
pub struct SessionProvider {
    auth: Arc<dyn IdentityService>,
    nav: Arc<dyn Navigator>,
    state: watch::Receiver<SessionState>,
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("state", &*self.state.borrow())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SessionProvider {
    /// Subscribe to auth-state changes, then start the sync task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        auth: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        nav: Arc<dyn Navigator>,
    ) -> Self {
        let subscription = auth.subscribe();
        let (state_tx, state) = watch::channel(SessionState::default());
        let (commands, command_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            auth: Arc::clone(&auth),
            profiles,
            state: state_tx,
        };
        let task = tokio::spawn(worker.run(subscription, command_rx));
        debug!("Session provider started");

        Self {
            auth,
            nav,
            state,
            commands,
            task: Mutex::new(Some(task)),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until `predicate` holds for the published state.
    pub async fn wait_for(&self, predicate: impl FnMut(&SessionState) -> bool) -> SessionState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(predicate).await.map(|state| state.clone());
        result.unwrap_or_else(|_| self.state())
    }

    /// Wait until the first sync has finished.
    pub async fn wait_until_loaded(&self) -> SessionState {
        self.wait_for(|state| state.revision > 0 && !state.is_loading)
            .await
    }

    /// Whether the sync task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Re-read the session and profile without waiting for an event.
    pub fn resync(&self) {
        let _ = self.commands.send(Command::Resync);
    }

    /// Sign out, then send the user to the login route. The error field is
    /// left as it is.
    ///
    /// # Errors
    ///
    /// Returns the identity service's error.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await.map_err(Error::from)?;
        self.nav.push(Route::Login);
        self.nav.refresh();
        Ok(())
    }

    /// Stop the sync task and release the subscription.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        debug!("Session provider stopped");
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

struct Worker {
    auth: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    state: watch::Sender<SessionState>,
}

impl Worker {
    async fn run(
        self,
        mut subscription: AuthSubscription,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        self.sync_from_service().await;

        let mut events_open = true;
        loop {
            tokio::select! {
                event = subscription.recv(), if events_open => match event {
                    Ok(event) => {
                        debug!("Auth event {:?}", event.kind);
                        self.apply(event.session).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Session provider missed {} auth events; resyncing", missed);
                        self.sync_from_service().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Auth event stream closed");
                        events_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Resync) => self.sync_from_service().await,
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        subscription.unsubscribe();
    }

    async fn sync_from_service(&self) {
        match self.auth.get_session().await {
            Ok(session) => self.apply(session).await,
            Err(err) => {
                self.begin();
                self.finish(None, None, Some(err.to_string()), SessionPhase::Error);
            }
        }
    }

    async fn apply(&self, session: Option<Session>) {
        self.begin();

        let Some(session) = session else {
            self.finish(None, None, None, SessionPhase::Anonymous);
            return;
        };

        let uid = session.user.id;
        match self.profiles.fetch_profile(uid).await {
            Ok(profile) => self.finish(
                Some(session),
                Some(profile),
                None,
                SessionPhase::AuthenticatedWithProfile,
            ),
            Err(err) => {
                debug!("Profile fetch for {} failed: {}", uid, err);
                let phase = if err.is_not_found() {
                    SessionPhase::AuthenticatedWithoutProfile
                } else {
                    SessionPhase::Error
                };
                self.finish(Some(session), None, Some(err.to_string()), phase);
            }
        }
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.phase = SessionPhase::Loading;
        });
    }

    fn finish(
        &self,
        session: Option<Session>,
        profile: Option<UserProfile>,
        error: Option<String>,
        phase: SessionPhase,
    ) {
        self.state.send_modify(|state| {
            state.user = session.as_ref().map(|s| s.user.clone());
            state.session = session;
            state.profile = profile;
            if error.is_some() {
                state.error = error;
            }
            state.phase = phase;
            state.is_loading = false;
            state.revision += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::auth::AuthEvent;
    use crate::model::UserRole;
    use crate::nav::MemoryNavigator;
    use crate::storage::{test_support, Storage};
    use crate::testing::{session_for, FakeIdentityService};

    struct Fixture {
        auth: Arc<FakeIdentityService>,
        storage: Arc<Storage>,
        nav: Arc<MemoryNavigator>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                auth: Arc::new(FakeIdentityService::new()),
                storage: Arc::new(test_support::storage()),
                nav: Arc::new(MemoryNavigator::new()),
            }
        }

        fn start(&self) -> SessionProvider {
            SessionProvider::start(
                Arc::clone(&self.auth) as Arc<dyn IdentityService>,
                Arc::clone(&self.storage) as Arc<dyn ProfileStore>,
                Arc::clone(&self.nav) as Arc<dyn Navigator>,
            )
        }

        fn signed_in_profile(&self, name: &str) -> (UserProfile, Session) {
            let profile = test_support::profile(&self.storage, name, UserRole::Manager);
            let session = session_for(profile.uid, &profile.email);
            (profile, session)
        }
    }

    async fn after(provider: &SessionProvider, revision: u64) -> SessionState {
        tokio::time::timeout(
            Duration::from_secs(5),
            provider.wait_for(|s| s.revision > revision && !s.is_loading),
        )
        .await
        .expect("provider did not sync in time")
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let f = Fixture::new();
        let provider = f.start();
        let initial = provider.state();
        assert!(initial.is_loading);
        assert_eq!(initial.phase, SessionPhase::Loading);
        assert_eq!(initial.revision, 0);
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_anonymous_without_session() {
        let f = Fixture::new();
        let provider = f.start();

        let state = after(&provider, 0).await;
        assert_eq!(state.phase, SessionPhase::Anonymous);
        assert!(state.profile.is_none());
        assert!(state.user.is_none());
        assert!(state.error.is_none());
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_initial_session_loads_profile() {
        let f = Fixture::new();
        let (profile, session) = f.signed_in_profile("Ada");
        f.auth.set_session(Some(session.clone()));

        let provider = f.start();
        let state = provider.wait_until_loaded().await;

        assert_eq!(state.phase, SessionPhase::AuthenticatedWithProfile);
        assert_eq!(state.profile, Some(profile));
        assert_eq!(state.session, Some(session.clone()));
        assert_eq!(state.user, Some(session.user));
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribes_before_reading_session() {
        let f = Fixture::new();
        let provider = f.start();
        assert_eq!(f.auth.subscriber_count(), 1);

        after(&provider, 0).await;
        assert_eq!(f.auth.get_session_calls(), 1);
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_null_session_event_clears_profile() {
        let f = Fixture::new();
        let (_, session) = f.signed_in_profile("Ada");
        f.auth.set_session(Some(session));
        let provider = f.start();
        let loaded = provider.wait_until_loaded().await;
        assert!(loaded.profile.is_some());

        f.auth.emit(AuthEvent::signed_out());
        let state = after(&provider, loaded.revision).await;

        assert!(state.profile.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.phase, SessionPhase::Anonymous);
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_profile_captured_as_error() {
        let f = Fixture::new();
        let uid = Uuid::new_v4();
        f.auth.set_session(Some(session_for(uid, "ghost@example.com")));

        let provider = f.start();
        let state = provider.wait_until_loaded().await;

        assert_eq!(state.phase, SessionPhase::AuthenticatedWithoutProfile);
        assert!(state.profile.is_none());
        assert!(state.user.is_some());
        assert_eq!(state.error, Some(format!("users not found: {uid}")));
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_kept_after_successful_sync() {
        let f = Fixture::new();
        f.auth
            .set_session(Some(session_for(Uuid::new_v4(), "ghost@example.com")));
        let provider = f.start();
        let failed = provider.wait_until_loaded().await;
        assert!(failed.error.is_some());

        let (profile, session) = f.signed_in_profile("Ada");
        f.auth.emit(AuthEvent::signed_in(session));
        let state = after(&provider, failed.revision).await;

        assert_eq!(state.phase, SessionPhase::AuthenticatedWithProfile);
        assert_eq!(state.profile, Some(profile));
        assert_eq!(state.error, failed.error);
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_error_replaced_by_newer_failure() {
        let f = Fixture::new();
        let first = Uuid::new_v4();
        f.auth.set_session(Some(session_for(first, "ghost@example.com")));
        let provider = f.start();
        let failed = provider.wait_until_loaded().await;

        let second = Uuid::new_v4();
        f.auth
            .emit(AuthEvent::signed_in(session_for(second, "other@example.com")));
        let state = after(&provider, failed.revision).await;

        assert_eq!(state.error, Some(format!("users not found: {second}")));
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_out_keeps_error() {
        let f = Fixture::new();
        let uid = Uuid::new_v4();
        f.auth.set_session(Some(session_for(uid, "ghost@example.com")));
        let provider = f.start();
        let failed = provider.wait_until_loaded().await;
        assert_eq!(failed.phase, SessionPhase::AuthenticatedWithoutProfile);

        provider.sign_out().await.unwrap();
        let state = after(&provider, failed.revision).await;

        assert_eq!(state.phase, SessionPhase::Anonymous);
        assert!(state.session.is_none());
        assert_eq!(state.error, Some(format!("users not found: {uid}")));
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_resync_without_event() {
        let f = Fixture::new();
        let provider = f.start();
        let loaded = provider.wait_until_loaded().await;

        let (profile, session) = f.signed_in_profile("Ada");
        f.auth.set_session(Some(session));
        provider.resync();
        let state = after(&provider, loaded.revision).await;

        assert_eq!(state.profile, Some(profile));
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_lagged_subscription_resyncs() {
        let f = Fixture::new();
        let provider = f.start();

        // The spawned task has not run yet, so these overflow its buffer.
        let mut last = None;
        for i in 0..20 {
            let session = session_for(Uuid::new_v4(), &format!("u{i}@example.com"));
            last = Some(session.user.id);
            f.auth.emit(AuthEvent::signed_in(session));
        }

        // Initial sync, one resync for the lag, then the 16 buffered events.
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            provider.wait_for(|s| !s.is_loading && s.revision >= 18),
        )
        .await
        .expect("provider did not catch up");
        assert_eq!(state.user.map(|u| u.id), last);
        assert_eq!(f.auth.get_session_calls(), 2);
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_sign_out_navigates_to_login() {
        let f = Fixture::new();
        let (_, session) = f.signed_in_profile("Ada");
        f.auth.set_session(Some(session));
        let provider = f.start();
        let loaded = provider.wait_until_loaded().await;

        provider.sign_out().await.unwrap();
        assert_eq!(f.nav.current(), Some(Route::Login));

        let state = after(&provider, loaded.revision).await;
        assert!(state.session.is_none());
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription() {
        let f = Fixture::new();
        let provider = f.start();
        provider.wait_until_loaded().await;

        provider.shutdown().await;
        assert!(!provider.is_running());
        assert_eq!(f.auth.subscriber_count(), 0);
    }
}
