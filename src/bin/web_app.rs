//! Full sample: two identity configurations, anonymous login, profile
//! attributes and the provider-hosted account pages.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use appid_sample::config::{self, AppIdConfig};
use appid_sample::oauth::AuthClient;
use appid_sample::profile::ProfileClient;
use appid_sample::router;
use appid_sample::session::MemoryStore;
use appid_sample::state::AppState;
use appid_sample::Pages;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appid_sample=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = config::port_from_env();

    // --- Identity configurations ---
    // Each file carries its own tenant credentials and gets its own callback.
    let primary_config = load_local_config(
        "localdev-config.json",
        config::local_redirect_uri(port, router::CALLBACK_URL),
    );
    let secondary_config = load_local_config(
        "localdev-config2.json",
        config::local_redirect_uri(port, router::CALLBACK_URL2),
    );

    let primary = Arc::new(AuthClient::new(&primary_config)?);
    let secondary = Arc::new(AuthClient::new(&secondary_config)?);
    // Attributes always go through the primary configuration.
    let profile = Arc::new(ProfileClient::new(&primary_config)?);

    // --- App state ---
    let state = AppState {
        auth: primary,
        profile,
        sessions: Arc::new(MemoryStore::default()),
        pages: Arc::new(Pages::new()?),
        cookie_key: config::cookie_key_from_env()?,
        secure_cookies: !config::running_locally(),
        protected_path: "/protected".into(),
    };

    let app = router::web_app_router(state, secondary);

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on http://localhost:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Loads one identity configuration, exiting with the setup hint when a
/// required parameter is missing.
fn load_local_config(path: &str, redirect_uri: String) -> AppIdConfig {
    match AppIdConfig::from_local_file(path, redirect_uri) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", config::LOCAL_CONFIG_HINT);
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Wait for SIGINT or SIGTERM so in-flight requests can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
