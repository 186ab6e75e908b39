use std::collections::HashMap;

use url::Url;

use crate::config::AppIdConfig;
use crate::error::Error;

/// Client for the tenant's profile store (per-user attributes) and userinfo
/// endpoint. Every request is authorized by the end user's access token, so
/// the subject is always the token's subject.
pub struct ProfileClient {
    attributes_endpoint: Url,
    userinfo_endpoint: Url,
    http: reqwest::Client,
}

impl ProfileClient {
    /// Create a client from an identity configuration. Attributes live under
    /// `profilesUrl`, userinfo under `oauthServerUrl`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either base URL does not parse.
    pub fn new(config: &AppIdConfig) -> Result<Self, Error> {
        let profiles = config.profiles_url.trim_end_matches('/');
        let oauth = config.oauth_server_url.trim_end_matches('/');
        Ok(Self {
            attributes_endpoint: format!("{profiles}/api/v1/attributes")
                .parse()
                .map_err(|e| Error::Config(format!("profilesUrl: {e}")))?,
            userinfo_endpoint: format!("{oauth}/userinfo")
                .parse()
                .map_err(|e| Error::Config(format!("oauthServerUrl: {e}")))?,
            http: reqwest::Client::new(),
        })
    }

    /// Swap in a preconfigured HTTP client, e.g. to share a connection pool.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Fetch every attribute stored on the subject's profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the access token is no longer
    /// accepted, [`Error::Profile`] for other upstream failures, or
    /// [`Error::Http`] on network failure.
    pub async fn get_all_attributes(
        &self,
        access_token: &str,
    ) -> Result<HashMap<String, String>, Error> {
        let response = self
            .http
            .get(self.attributes_endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "attribute fetch").await?;
        response.json().await.map_err(Into::into)
    }

    /// Store one attribute on the subject's profile.
    ///
    /// Writes replace the whole value; concurrent writers race and the last
    /// write wins.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_all_attributes`](Self::get_all_attributes).
    pub async fn set_attribute(
        &self,
        access_token: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let url = format!("{}/{}", self.attributes_endpoint, urlencoding::encode(name));
        let response = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .body(value.to_owned())
            .send()
            .await?;

        Self::ensure_success(response, "attribute update").await?;
        Ok(())
    }

    /// Fetch the claims the userinfo endpoint exposes for the access token.
    ///
    /// The shape is tenant-defined, so the payload stays untyped.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get_all_attributes`](Self::get_all_attributes).
    pub async fn user_info(&self, access_token: &str) -> Result<serde_json::Value, Error> {
        let response = self
            .http
            .get(self.userinfo_endpoint.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        response.json().await.map_err(Into::into)
    }

    /// Checks HTTP response status. 401 maps to `Error::Unauthorized` so
    /// callers can force a re-login instead of failing the request.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized { operation });
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Profile {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}
