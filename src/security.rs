//! Response hardening shared by both applications.
//!
//! [`harden`] injects the header set the samples ship with: frame, sniffing
//! and XSS protections plus a full no-cache group, so no authenticated page
//! ever lands in a shared cache. [`enforce_https`] is added when not running
//! locally and turns plain-HTTP requests away based on the
//! `x-forwarded-proto` header set by the platform router.

use axum::extract::Request;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

const PLAIN_HTTP_REJECTION: &str = "Please use HTTPS when submitting data to this server.";

/// Stacks the security and no-cache response headers onto `router`.
pub fn harden<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::overriding(
            header::X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("surrogate-control"),
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
}

/// Rejects requests that did not come in over HTTPS.
///
/// Trusts the platform proxy's `x-forwarded-proto`. Safe methods are
/// redirected to the HTTPS origin; everything else is refused so form data
/// is never accepted over plain HTTP.
pub async fn enforce_https(request: Request, next: Next) -> Response {
    let proto = request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok());
    if proto == Some("https") {
        return next.run(request).await;
    }

    let method = request.method();
    if method == Method::GET || method == Method::HEAD {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let target = format!("https://{host}{}", request.uri());
        return Redirect::permanent(&target).into_response();
    }

    (StatusCode::FORBIDDEN, PLAIN_HTTP_REJECTION).into_response()
}
