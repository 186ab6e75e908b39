//! Shared router builders.
//!
//! Both binaries and the integration tests assemble their stacks through
//! these functions, so what the tests drive is exactly what the binaries
//! serve. The common tail applied by [`finish`] is, outermost first:
//!
//! 1. Request/response tracing
//! 2. Security and no-cache headers
//! 3. HTTPS enforcement (skipped for local runs)
//! 4. Session loading
//! 5. Routes, with per-route authentication gates

use std::sync::Arc;

use axum::extract::State;
use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{self, CallbackOptions, LoginOptions};
use crate::oauth::{AuthClient, ProviderPage};
use crate::security;
use crate::session::Session;
use crate::state::AppState;

pub const LOGIN_URL: &str = "/ibm/bluemix/appid/login";
pub const LOGIN_URL2: &str = "/ibm/bluemix/appid/login2";
pub const CALLBACK_URL: &str = "/ibm/bluemix/appid/callback";
pub const CALLBACK_URL2: &str = "/ibm/bluemix/appid/callback2";

/// Directory served as-is next to the dynamic routes.
pub const PUBLIC_DIR: &str = "public";

/// Entry page of the full sample, offering both login actions.
const INDEX_HTML: &str = include_str!("../public/index.html");

/// Entry page of the reduced sample; it has no guest entry to offer.
const SIMPLE_INDEX_HTML: &str = include_str!("../public/simple.html");

/// Routes of the full sample: two identity configurations, anonymous login
/// and the provider-hosted account pages.
///
/// `secondary` is the second identity configuration; the gate and the silent
/// refresh always go through the primary one in `state`.
pub fn web_app_router(state: AppState, secondary: Arc<AuthClient>) -> Router {
    let primary = state.auth.clone();
    let router = Router::new()
        // Explicit login endpoints; these always show the login widget.
        .route(
            LOGIN_URL,
            middleware::login_route(primary.clone(), LoginOptions::default()),
        )
        .route(
            LOGIN_URL2,
            middleware::login_route(secondary.clone(), LoginOptions::default()),
        )
        // Authorization callbacks. Failures flash the message and land on /error.
        .route(
            CALLBACK_URL,
            middleware::callback_route(primary.clone(), CallbackOptions::flash_to("/error")),
        )
        .route(
            CALLBACK_URL2,
            middleware::callback_route(secondary.clone(), CallbackOptions::flash_to("/error")),
        )
        // The protected page, behind the refresh-then-challenge gate.
        .route(
            "/protected",
            get(handlers::protected)
                .layer(from_fn_with_state(state.clone(), middleware::authenticate)),
        )
        // Guest entry: anonymous login straight to the protected page.
        .route(
            "/anon_login",
            middleware::login_route(
                primary.clone(),
                LoginOptions::redirecting_to("/protected").with_anonymous(),
            ),
        )
        .route(
            "/login",
            middleware::login_route(primary.clone(), LoginOptions::redirecting_to("/protected")),
        )
        .route(
            "/login2",
            middleware::login_route(secondary, LoginOptions::redirecting_to("/protected")),
        )
        .route("/logout", get(middleware::logout))
        .route("/token", get(handlers::tokens))
        // Gated without a silent refresh attempt.
        .route(
            "/userInfo",
            get(handlers::user_info).layer(from_fn_with_state(
                state.clone(),
                middleware::authenticate_without_refresh,
            )),
        )
        .route("/error", get(handlers::login_error))
        // Provider-hosted account pages for Cloud Directory users.
        .route(
            "/change_password",
            middleware::login_route(
                primary.clone(),
                LoginOptions::redirecting_to("/protected")
                    .with_page(ProviderPage::ChangePassword),
            ),
        )
        .route(
            "/change_details",
            middleware::login_route(
                primary,
                LoginOptions::redirecting_to("/protected").with_page(ProviderPage::ChangeDetails),
            ),
        );

    finish(router, state, INDEX_HTML)
}

/// Routes of the reduced sample: a single identity configuration, one login
/// entry and plain-text callback failures.
pub fn web_app_simple_router(state: AppState) -> Router {
    let auth = state.auth.clone();
    let router = Router::new()
        .route(
            "/login",
            middleware::login_route(
                auth.clone(),
                LoginOptions::redirecting_to("/protected.html"),
            ),
        )
        .route(
            CALLBACK_URL,
            middleware::callback_route(auth, CallbackOptions::plain_text()),
        )
        .route(
            "/protected.html",
            get(handlers::protected)
                .layer(from_fn_with_state(state.clone(), middleware::authenticate)),
        )
        .route("/idToken", get(handlers::id_token))
        .route("/logout", get(middleware::logout));

    finish(router, state, SIMPLE_INDEX_HTML)
}

/// Applies the static fallback and the common middleware tail.
fn finish(router: Router<AppState>, state: AppState, entry_page: &'static str) -> Router {
    let entry = move |state: State<AppState>, session: Session, jar: CookieJar| {
        handlers::root(state, session, jar, entry_page)
    };
    let public = ServeDir::new(PUBLIC_DIR)
        .append_index_html_on_directories(false)
        // Not `not_found_service`: that would pin the entry responses to 404.
        .fallback(entry.with_state(state.clone()));

    let mut router = router
        // Anything that is not a route: a static file, or the entry handler.
        .fallback_service(public)
        // Session loading.
        .layer(from_fn_with_state(state.clone(), middleware::load_session));

    // HTTPS enforcement, inside the header layers so rejections carry them too.
    if state.secure_cookies {
        router = router.layer(axum::middleware::from_fn(security::enforce_https));
    }

    security::harden(router)
        // Request/response tracing.
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
