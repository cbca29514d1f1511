use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{require, FormStatus, StatusCell};
use crate::auth::IdentityService;
use crate::error::{Error, Result};
use crate::model::{NewProfile, UserProfile};
use crate::nav::{Navigator, Route};
use crate::storage::ProfileStore;

/// Account registration: an identity first, then its profile row.
///
/// The two steps are not atomic. When the profile insert fails the identity
/// stays behind without a profile; the failure is shown to the user and
/// logged with the identity id.
pub struct SignUpForm {
    auth: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    nav: Arc<dyn Navigator>,
    status: StatusCell,
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Job title.
    pub position: String,
}

impl std::fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpForm")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("position", &self.position)
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}

impl SignUpForm {
    /// An empty form.
    #[must_use]
    pub fn new(
        auth: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        nav: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            auth,
            profiles,
            nav,
            status: StatusCell::new(),
            email: String::new(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            position: String::new(),
        }
    }

    /// Current loading flag and error.
    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.status.get()
    }

    /// Follow status changes.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<FormStatus> {
        self.status.watch()
    }

    /// Register the account. Returns the new profile, or `None` with the
    /// error kept in [`status`](Self::status).
    pub async fn submit(&mut self) -> Option<UserProfile> {
        self.status.begin();

        match self.register().await {
            Ok(profile) => {
                info!("Signed up {} as {}", profile.uid, profile.role);
                self.status.succeed();
                self.nav.push(Route::Dashboard);
                self.nav.refresh();
                Some(profile)
            }
            Err(err) => {
                debug!("Sign-up failed: {}", err);
                self.status.fail(&err);
                None
            }
        }
    }

    /// Switch to the sign-in form.
    pub fn go_to_sign_in(&self) {
        self.nav.push(Route::Login);
    }

    async fn register(&self) -> Result<UserProfile> {
        require(&[
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
            ("first name", self.first_name.as_str()),
            ("last name", self.last_name.as_str()),
            ("position", self.position.as_str()),
        ])?;

        let response = self.auth.sign_up(&self.email, &self.password).await?;
        let user = response.user.ok_or(Error::SignUpNoUser)?;

        let profile = NewProfile::for_sign_up(
            user.id,
            &user.email,
            self.first_name.trim(),
            self.last_name.trim(),
            self.position.trim(),
        );
        self.profiles.insert_profile(&profile).await.map_err(|err| {
            warn!(
                "Identity {} was created but its profile insert failed: {}",
                user.id, err
            );
            err
        })
    }
}
