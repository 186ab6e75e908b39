use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use url::Url;

use crate::config::AppIdConfig;
use crate::error::Error;

/// Scope requested on every authorization redirect.
pub const DEFAULT_SCOPE: &str = "appid_default";

/// `idp` query value selecting the anonymous identity provider.
const ANONYMOUS_IDP: &str = "appid_anon";

/// Provider-hosted page an authorization redirect can target. All three run
/// the code flow and come back through the registered callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderPage {
    /// The interactive sign-in widget.
    #[default]
    SignIn,
    /// Cloud Directory change-password form.
    ChangePassword,
    /// Cloud Directory change-details form.
    ChangeDetails,
}

/// Options for building an authorization redirect.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizeOptions {
    /// Ask the tenant for an anonymous (guest) identity instead of showing
    /// the sign-in widget.
    pub allow_anonymous: bool,
    pub page: ProviderPage,
}

/// Authorization URL with the state nonce to store in session.
#[non_exhaustive]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}

/// Token response from the tenant's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// `OAuth2` authorization-code client for one identity configuration.
///
/// This is a confidential client: token requests authenticate with the
/// client id and secret over HTTP basic auth.
pub struct AuthClient {
    client_id: String,
    secret: String,
    redirect_uri: String,
    scope: String,
    authorize_endpoint: Url,
    token_endpoint: Url,
    change_password_endpoint: Url,
    change_details_endpoint: Url,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a client from an identity configuration.
    ///
    /// Endpoints are derived from `oauthServerUrl`, which points at the
    /// tenant root (`.../oauth/v4/{tenantId}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `oauthServerUrl` does not parse as a URL.
    pub fn new(config: &AppIdConfig) -> Result<Self, Error> {
        let base = config.oauth_server_url.trim_end_matches('/').to_owned();
        Ok(Self {
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: DEFAULT_SCOPE.into(),
            authorize_endpoint: endpoint(&base, "/authorization")?,
            token_endpoint: endpoint(&base, "/token")?,
            change_password_endpoint: endpoint(&base, "/cloud_directory/change_password")?,
            change_details_endpoint: endpoint(&base, "/cloud_directory/change_details")?,
            http: reqwest::Client::new(),
        })
    }

    /// Swap in a preconfigured HTTP client, e.g. to share a connection pool.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Override the requested scope (default: [`DEFAULT_SCOPE`]).
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Registered callback URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build an authorization redirect with a fresh state nonce.
    #[must_use]
    pub fn authorization_url(&self, options: &AuthorizeOptions) -> AuthorizationRedirect {
        let state = generate_state();

        let mut url = match options.page {
            ProviderPage::SignIn => self.authorize_endpoint.clone(),
            ProviderPage::ChangePassword => self.change_password_endpoint.clone(),
            ProviderPage::ChangeDetails => self.change_details_endpoint.clone(),
        };
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &self.scope)
                .append_pair("state", &state);
            if options.allow_anonymous {
                pairs.append_pair("idp", ANONYMOUS_IDP);
            }
        }

        AuthorizationRedirect {
            url: url.into(),
            state,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint returns an error.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Redeem a refresh token for a fresh token set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the token endpoint rejects the refresh token.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token refresh").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    /// Passes a successful response through, or reads the body into an error.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}

fn endpoint(base: &str, suffix: &str) -> Result<Url, Error> {
    format!("{base}{suffix}")
        .parse()
        .map_err(|e| Error::Config(format!("oauthServerUrl: {e}")))
}

/// Generates a cryptographically random state parameter for `OAuth2`.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
