use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::Error;
use crate::oauth::TokenResponse;
use crate::token::{self, IdentityClaims};

/// Store-level error type. Implementations report failures however they like.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque session identifier (ULID) carried in the encrypted session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Ulid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a cookie value. Anything that is not a ULID is treated by
    /// callers as "no session".
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Ulid::from_string(value).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Tokens and identity of a logged-in user, kept server-side in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub access_token: String,
    pub identity_token: String,
    /// Claims decoded from `identity_token`.
    pub claims: IdentityClaims,
    pub refresh_token: Option<String>,
}

impl AuthContext {
    /// Build a context from a token endpoint response, decoding the identity
    /// token payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the identity token payload cannot be
    /// decoded.
    pub fn from_token_response(tokens: TokenResponse) -> Result<Self, Error> {
        let claims = token::decode_identity_claims(&tokens.id_token)?;
        Ok(Self {
            access_token: tokens.access_token,
            identity_token: tokens.id_token,
            claims,
            refresh_token: tokens.refresh_token,
        })
    }
}

/// Server-side session record.
///
/// `auth_context` is present exactly when the user is logged in. Logging out
/// clears it but keeps the record and its cookie alive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub auth_context: Option<AuthContext>,
    /// Where to land after the next completed login.
    pub return_to: Option<String>,
    /// State nonce of the authorization redirect currently in flight.
    pub oauth_state: Option<String>,
    /// One-shot message for the error page.
    pub flash_error: Option<String>,
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session record.
    async fn load(&self, id: SessionId) -> Result<Option<SessionData>, StoreError>;

    /// Create or replace a session record.
    async fn save(&self, id: SessionId, data: SessionData) -> Result<(), StoreError>;

    /// Drop a session record.
    async fn delete(&self, id: SessionId) -> Result<(), StoreError>;
}

/// In-memory store used by the sample apps. Sessions do not survive a
/// restart, and a multi-instance deployment needs a shared store instead.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionData>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: SessionId) -> Result<Option<SessionData>, StoreError> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn save(&self, id: SessionId, data: SessionData) -> Result<(), StoreError> {
        self.sessions.write().insert(id, data);
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), StoreError> {
        self.sessions.write().remove(&id);
        Ok(())
    }
}

/// Handle to one request's session.
///
/// Every operation is a load-modify-save against the store. Two concurrent
/// requests on the same session race with last-write-wins, which is the
/// cookie-session model the pages are written against.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    store: Arc<dyn SessionStore>,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, store: Arc<dyn SessionStore>) -> Self {
        Self { id, store }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Make sure the record exists. Sessions are created on first sight of a
    /// request, logged in or not.
    pub async fn touch(&self) -> Result<(), Error> {
        if self.load().await?.is_none() {
            self.store
                .save(self.id, SessionData::default())
                .await
                .map_err(store_error)?;
        }
        Ok(())
    }

    /// Tokens and identity of the logged-in user, if any.
    pub async fn auth_context(&self) -> Result<Option<AuthContext>, Error> {
        Ok(self.load().await?.and_then(|data| data.auth_context))
    }

    /// Store a fresh authentication context (login or silent re-auth).
    pub async fn login(&self, context: AuthContext) -> Result<(), Error> {
        self.update(|data| data.auth_context = Some(context)).await
    }

    /// Drop the authentication context. The session record itself stays.
    pub async fn logout(&self) -> Result<(), Error> {
        self.update(|data| data.auth_context = None).await
    }

    /// Remember where to land after the next completed login.
    pub async fn set_return_to(&self, url: impl Into<String>) -> Result<(), Error> {
        let url = url.into();
        self.update(move |data| data.return_to = Some(url)).await
    }

    pub async fn take_return_to(&self) -> Result<Option<String>, Error> {
        self.take(|data| data.return_to.take()).await
    }

    /// Remember the state nonce of an authorization redirect.
    pub async fn set_oauth_state(&self, state: impl Into<String>) -> Result<(), Error> {
        let state = state.into();
        self.update(move |data| data.oauth_state = Some(state)).await
    }

    pub async fn take_oauth_state(&self) -> Result<Option<String>, Error> {
        self.take(|data| data.oauth_state.take()).await
    }

    /// Flash a one-shot message for the error page.
    pub async fn set_flash(&self, message: impl Into<String>) -> Result<(), Error> {
        let message = message.into();
        self.update(move |data| data.flash_error = Some(message))
            .await
    }

    pub async fn take_flash(&self) -> Result<Option<String>, Error> {
        self.take(|data| data.flash_error.take()).await
    }

    async fn load(&self) -> Result<Option<SessionData>, Error> {
        self.store.load(self.id).await.map_err(store_error)
    }

    async fn update<F>(&self, apply: F) -> Result<(), Error>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut data = self.load().await?.unwrap_or_default();
        apply(&mut data);
        self.store.save(self.id, data).await.map_err(store_error)
    }

    async fn take<T, F>(&self, apply: F) -> Result<Option<T>, Error>
    where
        F: FnOnce(&mut SessionData) -> Option<T>,
    {
        let mut data = self.load().await?.unwrap_or_default();
        let value = apply(&mut data);
        self.store.save(self.id, data).await.map_err(store_error)?;
        Ok(value)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&self.id).finish()
    }
}

fn store_error(e: StoreError) -> Error {
    Error::Session(e.to_string())
}
