use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use crate::session::{Session, SessionId};
use crate::state::AppState;

/// Attaches a [`Session`] handle to every request.
///
/// The server-side record is created on first sight of a request, logged in
/// or not. Requests arriving without a usable session cookie get a fresh id
/// and the cookie added to the response.
pub async fn load_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let known = cookies::session_id_from(&jar);
    let id = known.unwrap_or_else(SessionId::new);

    let session = Session::new(id, state.sessions.clone());
    if let Err(e) = session.touch().await {
        tracing::error!(error = %e, "session initialization failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
    }
    request.extensions_mut().insert(session);

    let response = next.run(request).await;

    if known.is_some() {
        response
    } else {
        let jar = jar.add(cookies::session_cookie(
            &id.to_string(),
            state.secure_cookies,
        ));
        (jar, response).into_response()
    }
}
