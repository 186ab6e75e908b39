use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use time::Duration;

use crate::session::SessionId;

/// Name of the encrypted session-id cookie.
pub const SESSION_COOKIE_NAME: &str = "__appid_session";

/// Name of the refresh-token cookie used for silent re-authentication.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Lifetime of the refresh-token cookie.
pub const REFRESH_COOKIE_DAYS: i64 = 30;

/// Session-id cookie. No max-age: the cookie lives for the browser session,
/// expiry belongs to the server-side record.
pub(crate) fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .build()
}

/// Refresh-token cookie, scoped to the whole app for 30 days so a returning
/// browser can be logged in silently.
pub(crate) fn refresh_token_cookie(refresh_token: &str) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, refresh_token.to_string()))
        .path("/".to_string())
        .max_age(Duration::days(REFRESH_COOKIE_DAYS))
        .build()
}

/// Removal cookie for the refresh token.
pub(crate) fn clear_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Session id from the encrypted jar, if present and well-formed.
pub(crate) fn session_id_from(jar: &PrivateCookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| SessionId::parse(c.value()))
}

/// Refresh token from the plain jar.
pub(crate) fn refresh_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string())
}
