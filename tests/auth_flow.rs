mod common;

use axum::http::StatusCode;
use serde_json::json;

use appid_sample::middleware::{REFRESH_COOKIE_NAME, SESSION_COOKIE_NAME};
use appid_sample::router::{CALLBACK_URL, LOGIN_URL, LOGIN_URL2};

use common::{
    body_text, identified_claims, location, login, mock_attributes, mock_code_exchange,
    mock_refresh, mock_refresh_rejection, query_param, spawn_web_app, TENANT_PATH,
};

// ---- Test: challenge redirect ------------------------------------

#[tokio::test]
async fn visiting_protected_without_login_redirects_to_authorize() {
    let mut app = spawn_web_app().await;

    let response = app.client.get("/protected").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let url = location(&response);
    assert!(url.starts_with(&format!(
        "{}{TENANT_PATH}/authorization",
        app.provider.uri()
    )));
    assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client"));
    assert_eq!(
        query_param(&url, "scope").as_deref(),
        Some("appid_default")
    );
    assert!(query_param(&url, "state").is_some());
    // The interactive widget, not the anonymous flow.
    assert_eq!(query_param(&url, "idp"), None);

    // The visit minted a session for the state nonce to live in.
    assert!(app.client.cookie(SESSION_COOKIE_NAME).is_some());
}

#[tokio::test]
async fn guest_entry_requests_an_anonymous_identity() {
    let mut app = spawn_web_app().await;

    let response = app.client.get("/anon_login").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let url = location(&response);
    assert_eq!(query_param(&url, "idp").as_deref(), Some("appid_anon"));
}

// ---- Test: completing the login ----------------------------------

#[tokio::test]
async fn callback_completes_the_login_and_lands_on_the_protected_page() {
    let mut app = spawn_web_app().await;
    let claims = identified_claims("test-user", "test-user@example.com");

    let landing = login(&mut app, "/protected", &claims, Some("refresh-1")).await;
    assert_eq!(landing, "/protected");

    // The refresh cookie is written by the gate, not by the callback.
    assert_eq!(app.client.cookie(REFRESH_COOKIE_NAME), None);

    mock_attributes(&app.provider, json!({"points": "150"})).await;
    let response = app.client.get("/protected").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.client.cookie(REFRESH_COOKIE_NAME), Some("refresh-1"));
}

#[tokio::test]
async fn original_url_with_query_survives_the_challenge() {
    let mut app = spawn_web_app().await;
    let claims = identified_claims("test-user", "test-user@example.com");

    let landing = login(&mut app, "/protected?foodItem=pizza", &claims, None).await;

    assert_eq!(landing, "/protected?foodItem=pizza");
}

#[tokio::test]
async fn explicit_login_returns_home_when_nothing_was_remembered() {
    let mut app = spawn_web_app().await;
    let claims = identified_claims("test-user", "test-user@example.com");

    let landing = login(&mut app, LOGIN_URL, &claims, None).await;

    assert_eq!(landing, "/");
}

// ---- Test: second identity configuration -------------------------

#[tokio::test]
async fn second_login_route_uses_the_second_configuration() {
    let mut app = spawn_web_app().await;

    let response = app.client.get(LOGIN_URL2).await;
    let url = location(&response);
    assert_eq!(
        query_param(&url, "client_id").as_deref(),
        Some("test-client-2")
    );
    assert!(query_param(&url, "redirect_uri")
        .is_some_and(|uri| uri.ends_with("/ibm/bluemix/appid/callback2")));

    let response = app.client.get(LOGIN_URL).await;
    let url = location(&response);
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client"));
}

#[tokio::test]
async fn provider_account_pages_open_with_the_login_parameters() {
    let mut app = spawn_web_app().await;

    let response = app.client.get("/change_password").await;
    let url = location(&response);
    assert!(url.contains("/cloud_directory/change_password"));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some("test-client"));

    let response = app.client.get("/change_details").await;
    assert!(location(&response).contains("/cloud_directory/change_details"));
}

// ---- Test: callback failures -------------------------------------

#[tokio::test]
async fn callback_with_wrong_state_flashes_and_redirects_to_the_error_page() {
    let mut app = spawn_web_app().await;

    // Challenge first, so the session holds a state nonce.
    app.client.get("/login").await;
    let response = app
        .client
        .get(&format!("{CALLBACK_URL}?code=test-code&state=not-the-one"))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/error");

    let response = app.client.get("/error").await;
    let body = body_text(response).await;
    assert!(body.contains("state mismatch"), "body: {body}");

    // The flash reads once.
    let response = app.client.get("/error").await;
    let body = body_text(response).await;
    assert!(!body.contains("state mismatch"));
}

#[tokio::test]
async fn callback_without_a_challenge_rejects_the_state() {
    let mut app = spawn_web_app().await;
    mock_code_exchange(
        &app.provider,
        &identified_claims("test-user", "test-user@example.com"),
        None,
    )
    .await;

    let response = app
        .client
        .get(&format!("{CALLBACK_URL}?code=test-code&state=anything"))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/error");
}

#[tokio::test]
async fn provider_refusal_shows_the_description_on_the_error_page() {
    let mut app = spawn_web_app().await;

    let response = app
        .client
        .get(&format!(
            "{CALLBACK_URL}?error=access_denied&error_description=The+user+cancelled"
        ))
        .await;
    assert_eq!(location(&response), "/error");

    let response = app.client.get("/error").await;
    let body = body_text(response).await;
    assert!(body.contains("The user cancelled"), "body: {body}");
}

// ---- Test: logout ------------------------------------------------

#[tokio::test]
async fn logout_clears_the_login_and_the_refresh_cookie() {
    let mut app = spawn_web_app().await;
    let claims = identified_claims("test-user", "test-user@example.com");
    login(&mut app, "/protected", &claims, Some("refresh-1")).await;

    mock_attributes(&app.provider, json!({"points": "150"})).await;
    app.client.get("/protected").await;
    assert_eq!(app.client.cookie(REFRESH_COOKIE_NAME), Some("refresh-1"));

    let response = app.client.get("/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(app.client.cookie(REFRESH_COOKIE_NAME), None);
    // The session itself survives; only the login inside it is gone.
    assert!(app.client.cookie(SESSION_COOKIE_NAME).is_some());

    let response = app.client.get("/protected").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("/authorization"));
}

// ---- Test: silent refresh ----------------------------------------

#[tokio::test]
async fn silent_refresh_signs_the_session_back_in() {
    let mut app = spawn_web_app().await;
    app.client.set_cookie(REFRESH_COOKIE_NAME, "stored-refresh");
    mock_refresh(
        &app.provider,
        &identified_claims("test-user", "test-user@example.com"),
        Some("rotated-refresh"),
    )
    .await;
    mock_attributes(&app.provider, json!({"points": "150"})).await;

    let response = app.client.get("/protected").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.client.cookie(REFRESH_COOKIE_NAME),
        Some("rotated-refresh")
    );
}

#[tokio::test]
async fn rejected_refresh_token_falls_back_to_the_challenge() {
    let mut app = spawn_web_app().await;
    app.client.set_cookie(REFRESH_COOKIE_NAME, "expired-refresh");
    mock_refresh_rejection(&app.provider).await;

    let response = app.client.get("/protected").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("/authorization"));
}

#[tokio::test]
async fn refresh_without_rotation_keeps_the_working_cookie() {
    let mut app = spawn_web_app().await;
    app.client.set_cookie(REFRESH_COOKIE_NAME, "sticky-refresh");
    mock_refresh(
        &app.provider,
        &identified_claims("test-user", "test-user@example.com"),
        None,
    )
    .await;
    mock_attributes(&app.provider, json!({"points": "150"})).await;

    let response = app.client.get("/protected").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.client.cookie(REFRESH_COOKIE_NAME),
        Some("sticky-refresh")
    );
}
