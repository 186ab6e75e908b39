//! Shared helpers driving the sample routers in-process.
//!
//! [`TestClient`] plays the browser: it keeps cookies between requests and
//! never follows redirects, so tests can assert on every hop of the
//! authorization flow. The identity provider and the profile store are one
//! wiremock server standing in for the tenant.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, Key};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appid_sample::config::AppIdConfig;
use appid_sample::oauth::AuthClient;
use appid_sample::profile::ProfileClient;
use appid_sample::router::{self, web_app_router, web_app_simple_router};
use appid_sample::session::MemoryStore;
use appid_sample::state::AppState;
use appid_sample::Pages;

/// Tenant prefix under which the mock provider serves the OAuth endpoints.
pub const TENANT_PATH: &str = "/oauth/v4/test-tenant";

pub fn test_config(provider_uri: &str, callback_path: &str) -> AppIdConfig {
    AppIdConfig {
        client_id: "test-client".into(),
        secret: "test-secret".into(),
        tenant_id: "test-tenant".into(),
        oauth_server_url: format!("{provider_uri}{TENANT_PATH}"),
        profiles_url: provider_uri.to_owned(),
        redirect_uri: format!("http://localhost:3000{callback_path}"),
        version: None,
        service_endpoint: None,
    }
}

fn test_state(provider_uri: &str, protected_path: &str) -> AppState {
    let config = test_config(provider_uri, router::CALLBACK_URL);
    AppState {
        auth: Arc::new(AuthClient::new(&config).unwrap()),
        profile: Arc::new(ProfileClient::new(&config).unwrap()),
        sessions: Arc::new(MemoryStore::default()),
        pages: Arc::new(Pages::new().unwrap()),
        cookie_key: Key::generate(),
        secure_cookies: false,
        protected_path: protected_path.into(),
    }
}

pub struct TestApp {
    pub provider: MockServer,
    pub client: TestClient,
}

/// Second identity configuration of the full sample, distinguishable from
/// the primary by its client id.
fn secondary_client(provider_uri: &str) -> Arc<AuthClient> {
    let mut config = test_config(provider_uri, router::CALLBACK_URL2);
    config.client_id = "test-client-2".into();
    Arc::new(AuthClient::new(&config).unwrap())
}

/// Full sample app wired against a fresh mock provider.
pub async fn spawn_web_app() -> TestApp {
    let provider = MockServer::start().await;
    let state = test_state(&provider.uri(), "/protected");
    let secondary = secondary_client(&provider.uri());
    let client = TestClient::new(web_app_router(state, secondary));
    TestApp { provider, client }
}

/// Full sample app with secure cookies on, which also enables the HTTPS
/// enforcement layer.
pub async fn spawn_secure_web_app() -> TestApp {
    let provider = MockServer::start().await;
    let mut state = test_state(&provider.uri(), "/protected");
    state.secure_cookies = true;
    let secondary = secondary_client(&provider.uri());
    let client = TestClient::new(web_app_router(state, secondary));
    TestApp { provider, client }
}

/// Reduced sample app wired against a fresh mock provider.
pub async fn spawn_web_app_simple() -> TestApp {
    let provider = MockServer::start().await;
    let state = test_state(&provider.uri(), "/protected.html");
    let client = TestClient::new(web_app_simple_router(state));
    TestApp { provider, client }
}

/// Drives a router like a browser with a cookie jar.
pub struct TestClient {
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookies: BTreeMap::new(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> Response {
        self.request(Method::GET, uri, &[]).await
    }

    pub async fn request(
        &mut self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder.body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let parsed = Cookie::parse(set_cookie.to_str().unwrap().to_owned()).unwrap();
            let removal = parsed.value().is_empty()
                || parsed.max_age().is_some_and(|age| age.is_zero());
            if removal {
                self.cookies.remove(parsed.name());
            } else {
                self.cookies
                    .insert(parsed.name().to_owned(), parsed.value().to_owned());
            }
        }
        response
    }

    /// Plants a cookie as if an earlier visit had set it.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_owned(), value.to_owned());
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_owned()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

// ── Identity provider fixtures ─────────────────────────────────────

pub fn identified_claims(sub: &str, email: &str) -> serde_json::Value {
    json!({"sub": sub, "email": email, "amr": ["cloud_directory"]})
}

pub fn guest_claims(sub: &str) -> serde_json::Value {
    json!({"sub": sub, "amr": ["appid_anon"]})
}

pub fn encode_id_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn token_response(
    claims: &serde_json::Value,
    refresh_token: Option<&str>,
) -> serde_json::Value {
    let sub = claims["sub"].as_str().unwrap_or("user");
    let mut body = json!({
        "access_token": format!("access-{sub}"),
        "id_token": encode_id_token(claims),
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    body
}

pub async fn mock_code_exchange(
    server: &MockServer,
    claims: &serde_json::Value,
    refresh_token: Option<&str>,
) {
    Mock::given(method("POST"))
        .and(path(format!("{TENANT_PATH}/token")))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response(claims, refresh_token)),
        )
        .mount(server)
        .await;
}

pub async fn mock_refresh(
    server: &MockServer,
    claims: &serde_json::Value,
    refresh_token: Option<&str>,
) {
    Mock::given(method("POST"))
        .and(path(format!("{TENANT_PATH}/token")))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_response(claims, refresh_token)),
        )
        .mount(server)
        .await;
}

pub async fn mock_refresh_rejection(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{TENANT_PATH}/token")))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid_grant"}"#))
        .mount(server)
        .await;
}

// ── Profile store fixtures ─────────────────────────────────────────

pub async fn mock_attributes(server: &MockServer, attributes: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(attributes))
        .mount(server)
        .await;
}

/// Expects exactly one write of `expected_value` to the named attribute.
pub async fn mock_attribute_write(server: &MockServer, name: &str, expected_value: &str) {
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/attributes/{name}")))
        .and(body_string(expected_value.to_owned()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mock_user_info(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{TENANT_PATH}/userinfo")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Flow drivers ───────────────────────────────────────────────────

/// Runs the interactive flow from `entry`: challenge redirect, then the
/// callback with the state handed out. Returns where the callback lands.
pub async fn login(
    app: &mut TestApp,
    entry: &str,
    claims: &serde_json::Value,
    refresh_token: Option<&str>,
) -> String {
    mock_code_exchange(&app.provider, claims, refresh_token).await;

    let response = app.client.get(entry).await;
    assert_eq!(
        response.status(),
        StatusCode::SEE_OTHER,
        "{entry} should redirect to the authorization endpoint"
    );
    let authorize_url = location(&response);
    let state = query_param(&authorize_url, "state").expect("authorize redirect carries a state");

    let response = app
        .client
        .get(&format!(
            "{}?code=test-code&state={state}",
            router::CALLBACK_URL
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
}
