//! Sign-in and sign-up forms.
//!
//! A form owns its field values and a [`FormStatus`] published through a
//! `watch` channel, so a front end can render the loading flag and the error
//! message while a submit is in flight. Every failure is caught at submit and
//! kept as the error's display text.

mod sign_in;
mod sign_up;

use tokio::sync::watch;

use crate::error::Error;

pub use sign_in::SignInForm;
pub use sign_up::SignUpForm;

/// What a form shows besides its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    /// A submit is in flight.
    pub is_loading: bool,
    /// Message from the last failed submit.
    pub error: Option<String>,
}

/// Shared status plumbing for both forms.
#[derive(Debug)]
struct StatusCell {
    tx: watch::Sender<FormStatus>,
}

impl StatusCell {
    fn new() -> Self {
        let (tx, _) = watch::channel(FormStatus::default());
        Self { tx }
    }

    fn get(&self) -> FormStatus {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<FormStatus> {
        self.tx.subscribe()
    }

    /// Clear the previous error and raise the loading flag.
    fn begin(&self) {
        self.tx.send_replace(FormStatus {
            is_loading: true,
            error: None,
        });
    }

    fn succeed(&self) {
        self.tx.send_modify(|status| status.is_loading = false);
    }

    fn fail(&self, err: &Error) {
        let message = err.to_string();
        self.tx.send_modify(|status| {
            status.is_loading = false;
            status.error = Some(message);
        });
    }
}

/// The first empty field among `fields`, as an error.
fn require(fields: &[(&str, &str)]) -> Result<(), Error> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(Error::invalid_input(format!("{name} is required"))),
        None => Ok(()),
    }
}
