//! Handlers shared by both sample applications.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::middleware::cookies;
use crate::middleware::gate;
use crate::middleware::{AuthError, AuthUser};
use crate::pages;
use crate::session::{AuthContext, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleParams {
    #[serde(rename = "foodItem")]
    food_item: Option<String>,
}

/// The protected food-selection page.
///
/// Reads the subject's profile attributes, applies the `?foodItem` toggle,
/// grants the one-time welcome bonus and renders the page. A profile store
/// that no longer accepts the access token ends the login instead of
/// failing the request.
pub async fn protected(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
    session: Session,
    Query(params): Query<ToggleParams>,
) -> Result<Response, AuthError> {
    match load_and_update_profile(&state, &context, params.food_item.as_deref()).await {
        Ok(data) => {
            let html = state.pages.render("protected", &data)?;
            Ok(Html(html).into_response())
        }
        Err(Error::Unauthorized { operation }) => {
            tracing::warn!(operation, "profile store rejected the access token, dropping the login");
            session.logout().await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// The profile side of the protected page: fetch attributes, apply the
/// toggle, grant the bonus. Returns the data for the render step.
///
/// Two requests for the same subject can interleave here; the profile store
/// keeps whichever write lands last.
async fn load_and_update_profile(
    state: &AppState,
    context: &AuthContext,
    toggled_item: Option<&str>,
) -> Result<serde_json::Value, Error> {
    let access_token = &context.access_token;
    let attributes = state.profile.get_all_attributes(access_token).await?;
    let mut selection = pages::parse_selection(&attributes)?;
    let first_login = pages::is_first_login(&context.claims, &attributes);

    if let Some(item) = toggled_item {
        pages::toggle_item(&mut selection, item);
        let stored = serde_json::to_string(&selection)?;
        state
            .profile
            .set_attribute(access_token, pages::FOOD_SELECTION_ATTRIBUTE, &stored)
            .await?;
    }

    if first_login {
        state
            .profile
            .set_attribute(access_token, pages::POINTS_ATTRIBUTE, pages::POINTS_BONUS)
            .await?;
    }

    pages::protected_page_data(&context.claims, &selection, first_login)
}

/// Shows the session's authentication context as JSON, or `null` when the
/// session carries none. Deliberately not gated, like the page it mirrors.
pub async fn tokens(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AuthError> {
    let context = session.auth_context().await?;
    let payload = serde_json::to_string_pretty(&context).map_err(Error::from)?;
    let html = state.pages.render("token", &json!({ "tokens": payload }))?;
    Ok(Html(html))
}

/// Shows the identity claims of the current login, or `null`.
pub async fn id_token(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AuthError> {
    let claims = session.auth_context().await?.map(|context| context.claims);
    let payload = serde_json::to_string_pretty(&claims).map_err(Error::from)?;
    let html = state.pages.render("token", &json!({ "tokens": payload }))?;
    Ok(Html(html))
}

/// Fetches the provider's user-info document for the current login. A fetch
/// failure renders the info-error page instead of failing the request.
pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(context): AuthUser,
) -> Result<Html<String>, AuthError> {
    let html = match state.profile.user_info(&context.access_token).await {
        Ok(info) => {
            let payload = serde_json::to_string_pretty(&info).map_err(Error::from)?;
            state.pages.render("userInfo", &json!({ "user_info": payload }))?
        }
        Err(e) => {
            tracing::warn!(error = %e, "user info fetch failed");
            state.pages.render("infoError", &json!({}))?
        }
    };
    Ok(Html(html))
}

/// Shows the login failure flashed by the callback. The message reads once;
/// reloading the page shows an empty error.
pub async fn login_error(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AuthError> {
    let message = session.take_flash().await?;
    let html = state
        .pages
        .render("error", &json!({ "error_message": message }))?;
    Ok(Html(html))
}

/// Fallback for everything the static directory does not cover. A logged-in
/// visitor goes straight to the protected page; otherwise one silent refresh
/// from the `refreshToken` cookie is attempted before the variant's entry
/// page is served.
pub async fn root(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    entry_page: &'static str,
) -> Result<Response, AuthError> {
    if session.auth_context().await?.is_some() {
        return Ok(Redirect::to(&state.protected_path).into_response());
    }

    if let Some(refresh_token) = cookies::refresh_token_from(&jar) {
        if gate::try_refresh(&state.auth, &session, refresh_token)
            .await?
            .is_some()
        {
            return Ok(Redirect::to(&state.protected_path).into_response());
        }
    }

    Ok(Html(entry_page).into_response())
}
