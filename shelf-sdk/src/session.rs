//! Session lifecycle: token, profile, and expiry.
//!
//! The session store is the only writer of the three persisted keys and
//! of the in-memory token. HTTP happens through the auth client; the
//! token is never baked into a client, it's handed out per call via
//! [`SessionStore::token`].
//!
//! Expiry is advisory. The store decodes the token's `exp` claim (or
//! falls back to a TTL) purely to schedule a single warning ahead of
//! expiry; nothing is enforced client-side, the backend rejects stale
//! tokens on its own. The warning is delivered as a [`SessionEvent`] on
//! a channel so presentation code decides what a warning looks like.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shelf_catalog::{AuthClient, AuthError, Credentials, UserProfile};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::{StateStore, StateStoreError};
use crate::token::token_expiry;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "auth_user";
pub const EXPIRY_KEY: &str = "auth_exp";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication failed")]
    Auth(#[from] AuthError),
    #[error("couldn't persist session state")]
    Store(#[from] StateStoreError),
}

impl SessionError {
    /// A message suitable for direct display to a user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Auth(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Notifications emitted by the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The token is within the warning margin of expiring.
    ExpiryWarning,
}

/// What [`SessionStore::renew_or_logout`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Refreshed,
    LoggedOut,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Assumed token lifetime when the token carries no decodable `exp`.
    pub fallback_ttl: Duration,
    /// How far ahead of expiry the warning fires.
    pub warning_margin: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            fallback_ttl: Duration::from_secs(24 * 60 * 60),
            warning_margin: Duration::from_secs(2 * 60),
        }
    }
}

/// Holds the signed-in state and keeps it in sync with a [StateStore].
pub struct SessionStore<S> {
    auth: AuthClient,
    store: S,
    config: SessionConfig,
    token: Option<String>,
    user: Option<UserProfile>,
    expires_at: Option<DateTime<Utc>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    // At most one pending warning; replaced atomically on reschedule.
    warning_timer: Option<JoinHandle<()>>,
}

impl<S: StateStore> SessionStore<S> {
    /// Create an empty (signed-out) session store and the receiving end
    /// of its event channel. Call [`SessionStore::load`] to pick up a
    /// persisted session.
    pub fn new(
        auth: AuthClient,
        store: S,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = SessionStore {
            auth,
            store,
            config,
            token: None,
            user: None,
            expires_at: None,
            events,
            warning_timer: None,
        };
        (session, receiver)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Populate from the persisted state, scheduling a fresh warning
    /// timer if a session is found. Corrupt persisted values degrade
    /// rather than fail: an unreadable profile is dropped, an unreadable
    /// expiry is recomputed from the token.
    ///
    /// The warning timer needs a tokio runtime; called outside one, the
    /// session is still restored but no warning is scheduled.
    pub fn load(&mut self) -> Result<(), SessionError> {
        let Some(token) = self.store.get(TOKEN_KEY)? else {
            debug!("no persisted session");
            return Ok(());
        };

        self.user = self
            .store
            .get(USER_KEY)?
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let expires_at = self
            .store
            .get(EXPIRY_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| token_expiry(&token, self.config.fallback_ttl));

        debug!(%expires_at, "restored persisted session");
        self.token = Some(token);
        self.expires_at = Some(expires_at);
        self.reschedule_warning();
        Ok(())
    }

    /// Exchange credentials for a session and persist it.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let response = self.auth.login(credentials).await?;
        self.set_session(response.token, Some(response.user))
    }

    /// Sign out. The backend is notified best-effort; local state is
    /// cleared no matter what, so this never fails.
    pub async fn logout(&mut self) {
        self.cancel_warning();
        if let Some(token) = self.token.take() {
            if let Err(err) = self.auth.logout(&token).await {
                warn!(%err, "logout request failed, clearing session anyway");
            }
        }
        self.user = None;
        self.expires_at = None;
        for key in [TOKEN_KEY, USER_KEY, EXPIRY_KEY] {
            if let Err(err) = self.store.remove(key) {
                warn!(%err, key, "couldn't clear persisted session key");
            }
        }
    }

    /// Trade the current token for a fresh one, keeping the profile.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let token = self.token.clone().ok_or(AuthError::NoToken)?;
        let replacement = self.auth.refresh(&token).await?;
        self.set_session(replacement, None)
    }

    /// The confirmed-warning path: refresh if the backend allows it,
    /// otherwise force a logout so the UI never sits on a dead session.
    pub async fn renew_or_logout(&mut self) -> RenewOutcome {
        match self.refresh().await {
            Ok(()) => RenewOutcome::Refreshed,
            Err(err) => {
                warn!(%err, "token refresh failed, logging out");
                self.logout().await;
                RenewOutcome::LoggedOut
            },
        }
    }

    /// Install a new token (and optionally a new profile), recompute
    /// expiry, persist all of it, and reschedule the warning.
    fn set_session(
        &mut self,
        token: String,
        user: Option<UserProfile>,
    ) -> Result<(), SessionError> {
        let expires_at = token_expiry(&token, self.config.fallback_ttl);

        self.store.set(TOKEN_KEY, &token)?;
        if let Some(ref user) = user {
            let encoded = serde_json::to_string(user).map_err(StateStoreError::Encode)?;
            self.store.set(USER_KEY, &encoded)?;
        }
        self.store.set(EXPIRY_KEY, &expires_at.to_rfc3339())?;

        self.token = Some(token);
        if let Some(user) = user {
            self.user = Some(user);
        }
        self.expires_at = Some(expires_at);
        self.reschedule_warning();
        Ok(())
    }

    fn reschedule_warning(&mut self) {
        self.cancel_warning();
        let Some(expires_at) = self.expires_at else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime, not scheduling expiry warning");
            return;
        };

        let margin = chrono::Duration::seconds(self.config.warning_margin.as_secs() as i64);
        // Already inside the margin fires immediately.
        let delay = (expires_at - Utc::now() - margin)
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(delay_secs = delay.as_secs(), "scheduling expiry warning");

        let events = self.events.clone();
        // Anchor the deadline now: the spawned task may not be polled
        // until later, and sleep(delay) would only start counting then.
        let deadline = tokio::time::Instant::now() + delay;
        self.warning_timer = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Nobody listening is fine.
            let _ = events.send(SessionEvent::ExpiryWarning);
        }));
    }

    fn cancel_warning(&mut self) {
        if let Some(timer) = self.warning_timer.take() {
            timer.abort();
        }
    }
}

impl<S> Drop for SessionStore<S> {
    fn drop(&mut self) {
        if let Some(timer) = self.warning_timer.take() {
            timer.abort();
        }
    }
}
