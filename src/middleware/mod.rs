//! Session and authentication plumbing for the routers.
//!
//! [`load_session`] runs application-wide and hands every request a
//! [`Session`](crate::session::Session) backed by the store. Individual
//! routes opt into authentication with [`gate::authenticate`], which gives
//! handlers an [`AuthUser`] or walks the browser through the authorization
//! flow mounted by [`login_route`] and [`callback_route`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use appid_sample::middleware::{self, LoginOptions, CallbackOptions};
//!
//! let app = axum::Router::new()
//!     .route("/login", middleware::login_route(auth.clone(), LoginOptions::default()))
//!     .route("/callback", middleware::callback_route(auth.clone(), CallbackOptions::flash_to("/error")))
//!     .route(
//!         "/protected",
//!         axum::routing::get(protected)
//!             .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::authenticate)),
//!     )
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::load_session))
//!     .with_state(state);
//! ```

pub(crate) mod cookies;
mod error;
mod extractor;
pub mod gate;
mod routes;
mod session_layer;

pub use cookies::{REFRESH_COOKIE_DAYS, REFRESH_COOKIE_NAME, SESSION_COOKIE_NAME};
pub use error::AuthError;
pub use extractor::AuthUser;
pub use gate::{authenticate, authenticate_without_refresh, GateOptions};
pub use routes::{
    callback_route, login_route, logout, CallbackFailure, CallbackOptions, LoginOptions,
};
pub use session_layer::load_session;
