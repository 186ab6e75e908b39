use std::path::Path;

use axum_extra::extract::cookie::Key;
use serde_json::Value;

use crate::error::Error;

/// Identity configuration parameters, in validation order. The first missing
/// one is the one reported.
pub const REQUIRED_PARAMS: [&str; 5] = [
    "clientId",
    "secret",
    "tenantId",
    "oauthServerUrl",
    "profilesUrl",
];

/// Environment variable carrying a service-binding JSON document. The binding
/// holds the same fields as the local file plus `redirectUri`.
pub const SERVICE_BINDING_ENV: &str = "APPID_SERVICE_BINDING";

/// Printed by the binaries when local configuration loading fails.
pub const LOCAL_CONFIG_HINT: &str = "When running locally, make sure to create a file \
     localdev-config.json in the root directory. See config.template.json for an \
     example of a configuration file.";

/// Tenant coordinates and credentials for one identity configuration.
///
/// Use [`from_local_file()`](AppIdConfig::from_local_file) during local
/// development, or [`from_service_binding()`](AppIdConfig::from_service_binding)
/// when the platform injects the binding as an environment variable.
#[derive(Debug, Clone)]
pub struct AppIdConfig {
    pub client_id: String,
    pub secret: String,
    pub tenant_id: String,
    pub oauth_server_url: String,
    pub profiles_url: String,
    pub redirect_uri: String,
    /// Optional API version passthrough from the configuration document.
    pub version: Option<u64>,
    /// Optional custom service endpoint passthrough (`appidServiceEndpoint`).
    pub service_endpoint: Option<String>,
}

impl AppIdConfig {
    /// Load configuration from a local JSON file such as `localdev-config.json`.
    ///
    /// The file does not carry a callback URI, so the caller supplies
    /// `redirect_uri` (see [`local_redirect_uri`]). A missing file is treated
    /// as an empty document and reported as the first missing parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing required parameter,
    /// or describing malformed JSON.
    pub fn from_local_file(
        path: impl AsRef<Path>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).unwrap_or_default();
        let document: Value = if raw.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&raw)
                .map_err(|e| Error::Config(format!("{} is not valid JSON: {e}", path.display())))?
        };
        Self::from_document(&document, Some(redirect_uri.into()))
    }

    /// Load configuration from a service-binding environment variable,
    /// conventionally [`SERVICE_BINDING_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the variable is unset, not JSON, or
    /// missing a required parameter. The binding must carry `redirectUri`.
    pub fn from_service_binding(var: &str) -> Result<Self, Error> {
        let raw = std::env::var(var).map_err(|_| Error::Config(format!("{var} is not set")))?;
        let document: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{var} is not valid JSON: {e}")))?;
        Self::from_document(&document, None)
    }

    /// Validate a configuration document. `redirect_uri` is `None` when the
    /// document itself must carry `redirectUri` (the service-binding case).
    fn from_document(document: &Value, redirect_uri: Option<String>) -> Result<Self, Error> {
        let client_id = required_param(document, "clientId")?;
        let secret = required_param(document, "secret")?;
        let tenant_id = required_param(document, "tenantId")?;
        let oauth_server_url = required_param(document, "oauthServerUrl")?;
        let profiles_url = required_param(document, "profilesUrl")?;

        let redirect_uri = match redirect_uri {
            Some(uri) => uri,
            None => required_param(document, "redirectUri")?,
        };

        Ok(Self {
            client_id,
            secret,
            tenant_id,
            oauth_server_url,
            profiles_url,
            redirect_uri,
            version: document.get("version").and_then(Value::as_u64),
            service_endpoint: param(document, "appidServiceEndpoint"),
        })
    }
}

fn required_param(document: &Value, name: &str) -> Result<String, Error> {
    param(document, name)
        .ok_or_else(|| Error::Config(format!("required parameter is missing: {name}")))
}

/// Environment variables take precedence over the configuration document, so
/// individual parameters can be overridden without editing the file.
fn param(document: &Value, name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    document
        .get(name)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// True when not running on a hosting platform (no `VCAP_APPLICATION`).
/// Locally the apps speak plain HTTP and cookies are not marked secure.
pub fn running_locally() -> bool {
    std::env::var("VCAP_APPLICATION").is_err()
}

/// Callback URI for a locally hosted app.
pub fn local_redirect_uri(port: u16, callback_path: &str) -> String {
    format!("http://localhost:{port}{callback_path}")
}

/// Listen port from the `PORT` environment variable, defaulting to 3000.
pub fn port_from_env() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

/// Session cookie encryption key, from `COOKIE_KEY` when set.
///
/// Without the env var an ephemeral key is generated, which invalidates
/// sessions across restarts. Fine for the samples, set the var in production.
///
/// # Errors
///
/// Returns [`Error::Config`] if `COOKIE_KEY` is set but shorter than 64 bytes.
pub fn cookie_key_from_env() -> Result<Key, Error> {
    match std::env::var("COOKIE_KEY") {
        Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
            Error::Config(
                "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                 Remove the env var to use an ephemeral key, or provide a valid key."
                    .into(),
            )
        }),
        Err(_) => Ok(Key::generate()),
    }
}
