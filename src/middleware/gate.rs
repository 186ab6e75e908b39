use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use super::cookies;
use super::error::AuthError;
use super::extractor::AuthUser;
use crate::error::Error;
use crate::oauth::{AuthClient, AuthorizeOptions};
use crate::session::{AuthContext, Session};
use crate::state::AppState;

/// What the gate does for a request without a live login.
#[derive(Debug, Clone, Copy)]
pub struct GateOptions {
    /// Try one silent re-login from the refresh-token cookie before
    /// challenging. Failure falls through to the challenge, never to an
    /// error response.
    pub attempt_refresh: bool,
    /// Let the challenge mint an anonymous identity instead of showing the
    /// sign-in widget.
    pub allow_anonymous: bool,
    /// Mirror the session's refresh token onto the response as a cookie.
    pub store_refresh_cookie: bool,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            attempt_refresh: true,
            allow_anonymous: false,
            store_refresh_cookie: true,
        }
    }
}

/// Standard gate for protected pages: session context, then silent refresh,
/// then an authorization redirect remembering the original URL.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    run(state, GateOptions::default(), session, jar, request, next).await
}

/// Gate without the silent-refresh step; an expired session goes straight to
/// the challenge. For pages that only make sense inside a live login.
pub async fn authenticate_without_refresh(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let options = GateOptions {
        attempt_refresh: false,
        allow_anonymous: false,
        store_refresh_cookie: false,
    };
    run(state, options, session, jar, request, next).await
}

/// Runs the gate with explicit options.
pub async fn run(
    state: AppState,
    options: GateOptions,
    session: Session,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let original_url = request.uri().to_string();
    let context = match established_context(&state, &options, &session, &jar).await {
        Ok(Some(context)) => context,
        Ok(None) => return challenge(&state, &options, &session, original_url).await,
        Err(e) => return e.into_response(),
    };

    // Mirrored from the pre-handler context: the cookie goes out even when
    // the handler itself ends the login.
    let mirrored = options
        .store_refresh_cookie
        .then(|| context.refresh_token.clone())
        .flatten();
    request.extensions_mut().insert(AuthUser(context));

    let response = next.run(request).await;

    match mirrored {
        Some(token) => (jar.add(cookies::refresh_token_cookie(&token)), response).into_response(),
        None => response,
    }
}

/// The session's context, or one refresh attempt from the cookie.
async fn established_context(
    state: &AppState,
    options: &GateOptions,
    session: &Session,
    jar: &CookieJar,
) -> Result<Option<AuthContext>, AuthError> {
    if let Some(context) = session.auth_context().await? {
        return Ok(Some(context));
    }
    if !options.attempt_refresh {
        return Ok(None);
    }
    let Some(refresh_token) = cookies::refresh_token_from(jar) else {
        return Ok(None);
    };
    Ok(try_refresh(&state.auth, session, refresh_token).await?)
}

/// One silent re-authentication attempt. `Ok(None)` means the refresh token
/// was refused or produced an unusable identity token; the caller falls back
/// to interactive login.
pub(crate) async fn try_refresh(
    auth: &AuthClient,
    session: &Session,
    refresh_token: String,
) -> Result<Option<AuthContext>, Error> {
    let tokens = match auth.refresh_tokens(&refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::debug!(error = %e, "silent re-authentication failed");
            return Ok(None);
        }
    };

    let mut context = match AuthContext::from_token_response(tokens) {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(error = %e, "re-authentication returned an undecodable identity token");
            return Ok(None);
        }
    };
    // The token endpoint does not always rotate the refresh token; keep the
    // one that just worked.
    if context.refresh_token.is_none() {
        context.refresh_token = Some(refresh_token);
    }

    session.login(context.clone()).await?;
    tracing::debug!(sub = %context.claims.sub, "silent re-authentication succeeded");
    Ok(Some(context))
}

/// Redirect to the authorization endpoint, remembering where to come back to.
async fn challenge(
    state: &AppState,
    options: &GateOptions,
    session: &Session,
    original_url: String,
) -> Response {
    let redirect = state.auth.authorization_url(&AuthorizeOptions {
        allow_anonymous: options.allow_anonymous,
        ..Default::default()
    });
    if let Err(e) = session.set_return_to(original_url).await {
        return AuthError::from(e).into_response();
    }
    if let Err(e) = session.set_oauth_state(&redirect.state).await {
        return AuthError::from(e).into_response();
    }
    Redirect::to(&redirect.url).into_response()
}
