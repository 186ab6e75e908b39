/// Errors surfaced by configuration loading, the OAuth2 client, the profile
/// store client and session persistence.
///
/// `Unauthorized` is distinguished from the other HTTP failures because the
/// protected page reacts to it (forced logout) instead of failing the request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("OAuth2 {operation} failed{}: {detail}", fmt_status(.status))]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("profile store {operation} failed{}: {detail}", fmt_status(.status))]
    Profile {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("{operation} rejected: access token no longer accepted")]
    Unauthorized { operation: &'static str },
    #[error("identity token error: {0}")]
    Token(String),
    #[error("session store error: {0}")]
    Session(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}
