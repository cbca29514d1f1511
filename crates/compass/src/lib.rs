//! `compass` - Corporate hierarchy, goals and reviews
//!
//! This library provides sign-in and sign-up forms, a session/profile
//! provider fed by an identity service, and role-checked operations over
//! holding companies, subsidiaries, divisions and the work done in them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod access;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod model;
pub mod nav;
pub mod service;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use app::AppState;
pub use auth::{AuthError, IdentityService, LocalIdentityService};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use nav::{Navigator, Route};
pub use service::Services;
pub use session::{SessionPhase, SessionProvider, SessionState};
pub use storage::{ProfileStore, Storage, StorageStats};
