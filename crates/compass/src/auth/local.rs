//! Identity service backed by the compass database.
//!
//! Session tokens are random, handed to the caller once, and stored only as
//! blake3 digests. The current token is also written to a session file so
//! that separate CLI invocations share one sign-in.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use regex::Regex;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    hash_password, verify_password, AuthError, AuthEvent, AuthResult, AuthSubscription, AuthUser,
    IdentityService, Session, SignUpResponse,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{IdentityRecord, SessionRecord, Storage};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Tunables for [`LocalIdentityService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySettings {
    /// Lifetime of an issued session.
    pub session_ttl: Duration,
    /// Shortest accepted password, in characters.
    pub min_password_length: usize,
    /// Issue a session straight from sign-up.
    pub auto_confirm: bool,
    /// Where the current token is kept between processes. `None` keeps it
    /// in memory only.
    pub session_file: Option<PathBuf>,
    /// Capacity of the auth-state event channel.
    pub event_buffer: usize,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            min_password_length: 6,
            auto_confirm: true,
            session_file: None,
            event_buffer: 16,
        }
    }
}

impl IdentitySettings {
    /// Settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_ttl: config.session_ttl(),
            min_password_length: config.auth.min_password_length,
            auto_confirm: config.auth.auto_confirm,
            session_file: Some(config.session_file()),
            event_buffer: config.session.event_buffer,
        }
    }
}

/// [`IdentityService`] over `auth_identities` and `auth_sessions`.
#[derive(Debug)]
pub struct LocalIdentityService {
    storage: Arc<Storage>,
    settings: IdentitySettings,
    email_pattern: Regex,
    events: broadcast::Sender<AuthEvent>,
    current_token: Mutex<Option<String>>,
}

impl LocalIdentityService {
    /// Create the service and drop sessions that have already expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the expired-session sweep fails.
    pub fn new(storage: Arc<Storage>, settings: IdentitySettings) -> Result<Self> {
        let email_pattern = Regex::new(EMAIL_PATTERN)
            .map_err(|e| Error::internal(format!("email pattern: {e}")))?;
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));

        storage.delete_expired_sessions(Utc::now())?;

        Ok(Self {
            storage,
            settings,
            email_pattern,
            events,
            current_token: Mutex::new(None),
        })
    }

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &IdentitySettings {
        &self.settings
    }

    fn issue_session(&self, identity: &IdentityRecord) -> AuthResult<Session> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let created_at = Utc::now();
        let record = SessionRecord {
            token_hash: token_hash(&token),
            identity_id: identity.id,
            created_at,
            expires_at: created_at + self.settings.session_ttl,
        };
        self.storage.insert_session(&record)?;
        self.remember_token(Some(&token))?;

        Ok(Session {
            access_token: token,
            user: auth_user(identity),
            expires_at: record.expires_at,
        })
    }

    fn remember_token(&self, token: Option<&str>) -> AuthResult<()> {
        *self
            .current_token
            .lock()
            .map_err(|_| AuthError::Backend("session lock poisoned".to_string()))? =
            token.map(str::to_string);

        let Some(path) = &self.settings.session_file else {
            return Ok(());
        };
        let io_err = |e: std::io::Error| {
            AuthError::Backend(format!("session file {}: {e}", path.display()))
        };
        match token {
            Some(token) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(io_err)?;
                }
                write_owner_only(path, token).map_err(io_err)?;
            }
            None => match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(e)),
            },
        }
        Ok(())
    }

    fn current_token(&self) -> AuthResult<Option<String>> {
        let cached = self
            .current_token
            .lock()
            .map_err(|_| AuthError::Backend("session lock poisoned".to_string()))?
            .clone();
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(path) = &self.settings.session_file else {
            return Ok(None);
        };
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let token = text.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Backend(format!(
                "session file {}: {e}",
                path.display()
            ))),
        }
    }

    fn resolve(&self, token: &str) -> AuthResult<Option<Session>> {
        let hash = token_hash(token);
        let Some(record) = self.storage.find_session(&hash)? else {
            return Ok(None);
        };
        if record.is_expired_at(Utc::now()) {
            debug!("Session for {} expired", record.identity_id);
            self.storage.delete_session(&hash)?;
            return Ok(None);
        }
        let Some(identity) = self.storage.get_identity(record.identity_id)? else {
            return Ok(None);
        };
        Ok(Some(Session {
            access_token: token.to_string(),
            user: auth_user(&identity),
            expires_at: record.expires_at,
        }))
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityService for LocalIdentityService {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        let email = email.trim();
        let identity = self
            .storage
            .find_identity_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &identity.password_hash)? {
            debug!("Wrong password for {}", identity.id);
            return Err(AuthError::InvalidCredentials);
        }

        let signed_in_at = Utc::now();
        self.storage.touch_last_sign_in(identity.id, signed_in_at)?;
        let identity = IdentityRecord {
            last_sign_in_at: Some(signed_in_at),
            ..identity
        };

        let session = self.issue_session(&identity)?;
        info!("Signed in {}", identity.id);
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpResponse> {
        let email = email.trim();
        if !self.email_pattern.is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < self.settings.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.settings.min_password_length,
            });
        }
        if self.storage.find_identity_by_email(email)?.is_some() {
            return Err(AuthError::UserAlreadyRegistered);
        }

        let identity = self
            .storage
            .insert_identity(email, &hash_password(password)?)?;
        info!("Registered identity {}", identity.id);

        if !self.settings.auto_confirm {
            return Ok(SignUpResponse {
                user: Some(auth_user(&identity)),
                session: None,
            });
        }

        let session = self.issue_session(&identity)?;
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(token) = self.current_token()? {
            self.storage.delete_session(&token_hash(&token))?;
        }
        self.remember_token(None)?;
        info!("Signed out");
        self.emit(AuthEvent::signed_out());
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<Session>> {
        let Some(token) = self.current_token()? else {
            return Ok(None);
        };
        let session = self.resolve(&token)?;
        if session.is_none() {
            self.remember_token(None)?;
        }
        Ok(session)
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }
}

fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Write `token` to `path` with mode 0600 on Unix, tightening an existing
/// file too.
fn write_owner_only(path: &Path, token: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_bytes())
}

fn auth_user(identity: &IdentityRecord) -> AuthUser {
    AuthUser {
        id: identity.id,
        email: identity.email.clone(),
        created_at: identity.created_at,
        last_sign_in_at: identity.last_sign_in_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthEventKind;
    use crate::storage::test_support;

    fn service_with(settings: IdentitySettings) -> LocalIdentityService {
        LocalIdentityService::new(Arc::new(test_support::storage()), settings).unwrap()
    }

    fn service() -> LocalIdentityService {
        service_with(IdentitySettings::default())
    }

    fn temp_session_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("compass_{name}_{}", std::process::id()))
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = service();
        let response = auth.sign_up("ada@example.com", "secret1").await.unwrap();
        let user = response.user.unwrap();
        assert!(response.session.is_some());

        let session = auth
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);
        assert!(session.user.last_sign_in_at.is_some());
        assert_eq!(auth.get_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let auth = service();
        auth.sign_up("ada@example.com", "secret1").await.unwrap();

        let wrong = auth.sign_in_with_password("ada@example.com", "nope").await;
        assert_eq!(wrong.unwrap_err(), AuthError::InvalidCredentials);

        let unknown = auth.sign_in_with_password("bob@example.com", "secret1").await;
        assert_eq!(unknown.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let auth = service();
        assert_eq!(
            auth.sign_up("not-an-email", "secret1").await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(
            auth.sign_up("ada@example.com", "abc").await.unwrap_err(),
            AuthError::WeakPassword { min: 6 }
        );

        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        assert_eq!(
            auth.sign_up("ADA@example.com", "secret1").await.unwrap_err(),
            AuthError::UserAlreadyRegistered
        );
    }

    #[tokio::test]
    async fn test_sign_up_without_auto_confirm() {
        let auth = service_with(IdentitySettings {
            auto_confirm: false,
            ..IdentitySettings::default()
        });
        let response = auth.sign_up("ada@example.com", "secret1").await.unwrap();
        assert!(response.user.is_some());
        assert!(response.session.is_none());
        assert!(auth.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_ends_session_and_notifies() {
        let auth = service();
        let mut events = auth.subscribe();
        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        assert!(auth.get_session().await.unwrap().is_none());
        assert_eq!(events.recv().await.unwrap().kind, AuthEventKind::SignedIn);
        let signed_out = events.recv().await.unwrap();
        assert_eq!(signed_out.kind, AuthEventKind::SignedOut);
        assert!(signed_out.session.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let auth = service_with(IdentitySettings {
            session_ttl: Duration::seconds(-1),
            ..IdentitySettings::default()
        });
        auth.sign_up("ada@example.com", "secret1").await.unwrap();
        assert!(auth.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_file_shared_between_instances() {
        let path = temp_session_file("shared_session");
        let _ = std::fs::remove_file(&path);
        let storage = Arc::new(test_support::storage());
        let settings = IdentitySettings {
            session_file: Some(path.clone()),
            ..IdentitySettings::default()
        };

        let first = LocalIdentityService::new(Arc::clone(&storage), settings.clone()).unwrap();
        let session = first
            .sign_up("ada@example.com", "secret1")
            .await
            .unwrap()
            .session
            .unwrap();

        let second = LocalIdentityService::new(Arc::clone(&storage), settings).unwrap();
        assert_eq!(second.get_session().await.unwrap(), Some(session));

        second.sign_out().await.unwrap();
        assert!(!path.exists());
        assert!(first.get_session().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_readable_by_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_session_file("private_session");
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let auth = service_with(IdentitySettings {
            session_file: Some(path.clone()),
            ..IdentitySettings::default()
        });

        let session = auth
            .sign_up("ada@example.com", "secret1")
            .await
            .unwrap()
            .session
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), session.access_token);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_tokens_stored_hashed() {
        let hash = token_hash("abc");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, "abc");
    }
}
