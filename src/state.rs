use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::oauth::AuthClient;
use crate::pages::Pages;
use crate::profile::ProfileClient;
use crate::session::SessionStore;

/// Shared state for the app routers.
#[derive(Clone)]
pub struct AppState {
    /// Primary identity configuration. Routes bound to another configuration
    /// carry their own client.
    pub auth: Arc<AuthClient>,
    pub profile: Arc<ProfileClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub pages: Arc<Pages>,
    /// Encrypts the session-id cookie.
    pub cookie_key: Key,
    /// Off during local development so plain-HTTP cookies work.
    pub secure_cookies: bool,
    /// Where the app's protected page lives; the entry handler redirects
    /// authenticated users there.
    pub protected_path: String,
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
