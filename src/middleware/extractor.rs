use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AuthError;
use crate::error::Error;
use crate::session::{AuthContext, Session};

/// Authenticated context for the current request, inserted by the gate.
///
/// Handlers behind [`gate::authenticate`](super::gate::authenticate) extract
/// this to reach the tokens and claims without touching the store again.
///
/// ```rust,ignore
/// async fn protected(AuthUser(context): AuthUser) -> impl IntoResponse {
///     format!("Hello, {}", context.claims.sub)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthContext);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

// The session middleware inserts the handle; its absence is a wiring bug,
// not a client error.
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            AuthError::Service(Error::Session("session middleware not installed".into()))
        })
    }
}
