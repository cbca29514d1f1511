//! Application state with explicit setup and teardown.
//!
//! [`AppState`] owns the shared store, the identity service and the
//! navigator. The session provider is started on demand and stays reachable
//! through [`AppState::use_user`] until [`AppState::shutdown`].

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::auth::{IdentityService, IdentitySettings, LocalIdentityService};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::forms::{SignInForm, SignUpForm};
use crate::model::UserProfile;
use crate::nav::{Navigator, TracingNavigator};
use crate::service::Services;
use crate::session::SessionProvider;
use crate::storage::{ProfileStore, Storage};

/// Everything a front end needs, wired together.
pub struct AppState {
    config: Config,
    storage: Arc<Storage>,
    auth: Arc<dyn IdentityService>,
    nav: Arc<dyn Navigator>,
    services: Services,
    session: Mutex<Option<Arc<SessionProvider>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.storage.path())
            .field("session_running", &self.use_user().is_ok())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Open the database and the local identity service described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn init(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(config.database_path())?);
        let auth = LocalIdentityService::new(
            Arc::clone(&storage),
            IdentitySettings::from_config(&config),
        )?;
        info!("Application initialized");
        Ok(Self::assemble(
            config,
            storage,
            Arc::new(auth),
            Arc::new(TracingNavigator),
        ))
    }

    /// Wire already-built parts together with default configuration.
    #[must_use]
    pub fn from_parts(
        storage: Arc<Storage>,
        auth: Arc<dyn IdentityService>,
        nav: Arc<dyn Navigator>,
    ) -> Self {
        Self::assemble(Config::default(), storage, auth, nav)
    }

    fn assemble(
        config: Config,
        storage: Arc<Storage>,
        auth: Arc<dyn IdentityService>,
        nav: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            services: Services::new(Arc::clone(&storage)),
            storage,
            auth,
            nav,
            session: Mutex::new(None),
        }
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared store.
    #[must_use]
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// The identity service.
    #[must_use]
    pub fn auth(&self) -> &Arc<dyn IdentityService> {
        &self.auth
    }

    /// Role-checked operations.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Start the session provider, or return the one already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_session(&self) -> Arc<SessionProvider> {
        let mut slot = self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(provider) = slot.as_ref().filter(|p| p.is_running()) {
            return Arc::clone(provider);
        }

        let provider = Arc::new(SessionProvider::start(
            Arc::clone(&self.auth),
            Arc::clone(&self.storage) as Arc<dyn ProfileStore>,
            Arc::clone(&self.nav),
        ));
        *slot = Some(Arc::clone(&provider));
        provider
    }

    /// The running session provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutsideProvider` before [`Self::start_session`] or
    /// after [`Self::shutdown`].
    pub fn use_user(&self) -> Result<Arc<SessionProvider>> {
        self.session
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().filter(|p| p.is_running()).map(Arc::clone))
            .ok_or(Error::OutsideProvider)
    }

    /// A fresh sign-in form.
    #[must_use]
    pub fn sign_in_form(&self) -> SignInForm {
        SignInForm::new(Arc::clone(&self.auth), Arc::clone(&self.nav))
    }

    /// A fresh sign-up form.
    #[must_use]
    pub fn sign_up_form(&self) -> SignUpForm {
        SignUpForm::new(
            Arc::clone(&self.auth),
            Arc::clone(&self.storage) as Arc<dyn ProfileStore>,
            Arc::clone(&self.nav),
        )
    }

    /// Profile of whoever holds the current session.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSignedIn` without a session and `Error::NotFound`
    /// when the signed-in identity has no profile row.
    pub async fn current_profile(&self) -> Result<UserProfile> {
        let session = self.auth.get_session().await?.ok_or(Error::NotSignedIn)?;
        self.storage
            .get_profile(session.user.id)?
            .ok_or_else(|| Error::not_found("users", session.user.id))
    }

    /// Stop the session provider and release its subscription.
    pub async fn shutdown(&self) {
        let provider = self
            .session
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(provider) = provider {
            provider.shutdown().await;
        }
        debug!("Application shut down");
    }
}
