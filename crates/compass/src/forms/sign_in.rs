use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::{require, FormStatus, StatusCell};
use crate::auth::{IdentityService, Session};
use crate::error::Error;
use crate::nav::{Navigator, Route};

/// Email and password sign-in.
pub struct SignInForm {
    auth: Arc<dyn IdentityService>,
    nav: Arc<dyn Navigator>,
    status: StatusCell,
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInForm")
            .field("email", &self.email)
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}

impl SignInForm {
    /// An empty form.
    #[must_use]
    pub fn new(auth: Arc<dyn IdentityService>, nav: Arc<dyn Navigator>) -> Self {
        Self {
            auth,
            nav,
            status: StatusCell::new(),
            email: String::new(),
            password: String::new(),
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

    /// Sign in with the entered credentials. On success the user is sent to
    /// the dashboard; on failure the error is kept in [`status`](Self::status)
    /// and `None` is returned.
    pub async fn submit(&mut self) -> Option<Session> {
        self.status.begin();

        let required = [
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ];
        let result = match require(&required) {
            Ok(()) => self
                .auth
                .sign_in_with_password(&self.email, &self.password)
                .await
                .map_err(Error::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(session) => {
                info!("Signed in as {}", session.user.email);
                self.status.succeed();
                self.nav.push(Route::Dashboard);
                self.nav.refresh();
                Some(session)
            }
            Err(err) => {
                debug!("Sign-in failed: {}", err);
                self.status.fail(&err);
                None
            }
        }
    }

    /// Switch to the sign-up form.
    pub fn go_to_sign_up(&self) {
        self.nav.push(Route::SignUp);
    }
}
