use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, MethodRouter};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::cookies;
use super::error::AuthError;
use crate::error::Error;
use crate::oauth::{AuthClient, AuthorizeOptions, ProviderPage};
use crate::session::{AuthContext, Session};
use crate::state::AppState;

/// How a login-initiating route behaves.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Land here after the callback completes. `None` keeps whatever an
    /// earlier challenge remembered, falling back to `/`.
    pub success_redirect: Option<String>,
    /// Ask for an anonymous (guest) identity.
    pub allow_anonymous: bool,
    /// Which provider-hosted page to open.
    pub page: ProviderPage,
}

impl LoginOptions {
    /// Interactive login that lands on `target` afterwards.
    #[must_use]
    pub fn redirecting_to(target: impl Into<String>) -> Self {
        Self {
            success_redirect: Some(target.into()),
            ..Default::default()
        }
    }

    /// Ask for an anonymous (guest) identity.
    #[must_use]
    pub fn with_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    /// Open a provider-hosted page other than the sign-in widget.
    #[must_use]
    pub fn with_page(mut self, page: ProviderPage) -> Self {
        self.page = page;
        self
    }
}

/// Failure policy for the `OAuth2` callback.
#[derive(Debug, Clone)]
pub enum CallbackFailure {
    /// Flash the message into the session and redirect to an error page.
    FlashRedirect { redirect: String },
    /// Answer 401 with the message as plain text.
    PlainText,
}

#[derive(Debug, Clone)]
pub struct CallbackOptions {
    pub failure: CallbackFailure,
}

impl CallbackOptions {
    /// Flash failures into the session and land on `redirect`.
    #[must_use]
    pub fn flash_to(redirect: impl Into<String>) -> Self {
        Self {
            failure: CallbackFailure::FlashRedirect {
                redirect: redirect.into(),
            },
        }
    }

    /// Report failures as plain text.
    #[must_use]
    pub fn plain_text() -> Self {
        Self {
            failure: CallbackFailure::PlainText,
        }
    }
}

/// `GET` route starting a login against `client`.
pub fn login_route(client: Arc<AuthClient>, options: LoginOptions) -> MethodRouter<AppState> {
    get(move |session: Session| start_login(client.clone(), options.clone(), session))
}

/// `GET` route completing a login against `client`.
pub fn callback_route(client: Arc<AuthClient>, options: CallbackOptions) -> MethodRouter<AppState> {
    get(move |session: Session, query: Query<CallbackParams>| {
        finish_login(client.clone(), options.clone(), session, query)
    })
}

// ── Login ──────────────────────────────────────────────────────────

async fn start_login(
    client: Arc<AuthClient>,
    options: LoginOptions,
    session: Session,
) -> Result<Redirect, AuthError> {
    if let Some(target) = &options.success_redirect {
        session.set_return_to(target.clone()).await?;
    }

    let redirect = client.authorization_url(&AuthorizeOptions {
        allow_anonymous: options.allow_anonymous,
        page: options.page,
    });
    session.set_oauth_state(&redirect.state).await?;

    Ok(Redirect::to(&redirect.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn finish_login(
    client: Arc<AuthClient>,
    options: CallbackOptions,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Response {
    match complete_login(&client, &session, params).await {
        Ok(target) => Redirect::to(&target).into_response(),
        // Session persistence failing is an internal error, not a login failure.
        Err(e @ Error::Session(_)) => AuthError::from(e).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "login callback failed");
            match options.failure {
                CallbackFailure::FlashRedirect { ref redirect } => {
                    if let Err(store_err) = session.set_flash(e.to_string()).await {
                        return AuthError::from(store_err).into_response();
                    }
                    Redirect::to(redirect).into_response()
                }
                CallbackFailure::PlainText => {
                    (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
                }
            }
        }
    }
}

/// Validate the provider's answer, trade the code for tokens and log the
/// session in. Returns where to send the browser next.
async fn complete_login(
    client: &AuthClient,
    session: &Session,
    params: CallbackParams,
) -> Result<String, Error> {
    if let Some(error) = &params.error {
        let detail = params
            .error_description
            .clone()
            .unwrap_or_else(|| error.clone());
        tracing::warn!(error = %error, description = %detail, "authorization was refused");
        return Err(Error::OAuth {
            operation: "authorization",
            status: None,
            detail,
        });
    }

    let code = params.code.ok_or(Error::OAuth {
        operation: "authorization",
        status: None,
        detail: "missing authorization code".into(),
    })?;

    let expected = session.take_oauth_state().await?;
    if expected.is_none() || expected != params.state {
        return Err(Error::OAuth {
            operation: "authorization",
            status: None,
            detail: "state mismatch".into(),
        });
    }

    let tokens = client.exchange_code(&code).await?;
    let context = AuthContext::from_token_response(tokens)?;
    tracing::info!(
        sub = %context.claims.sub,
        anonymous = context.claims.is_anonymous(),
        "login completed"
    );
    session.login(context).await?;

    Ok(session.take_return_to().await?.unwrap_or_else(|| "/".into()))
}

// ── Logout ─────────────────────────────────────────────────────────

/// Drops the login and the refresh cookie, then goes home. The session
/// record and its cookie survive.
pub async fn logout(
    session: Session,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    session.logout().await?;
    Ok((jar.remove(cookies::clear_refresh_cookie()), Redirect::to("/")))
}
