use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::Error;

/// Errors surfaced while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Handler ran without the gate having established a login.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Page template failed to render.
    #[error("Render error: {0}")]
    Render(String),

    /// Failure from configuration, the identity provider, the profile store
    /// or session persistence.
    #[error(transparent)]
    Service(#[from] Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Service(Error::Unauthorized { .. }) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Self::Render(_) | Self::Service(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<handlebars::RenderError> for AuthError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Render(e.to_string())
    }
}
