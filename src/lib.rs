#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod oauth;
pub mod pages;
pub mod profile;
pub mod router;
pub mod security;
pub mod session;
pub mod state;
pub mod token;

// Re-exports for convenient access
pub use config::AppIdConfig;
pub use error::Error;
pub use oauth::{AuthClient, AuthorizeOptions, ProviderPage, TokenResponse};
pub use pages::Pages;
pub use profile::ProfileClient;
pub use session::{AuthContext, MemoryStore, Session, SessionStore};
pub use state::AppState;
pub use token::IdentityClaims;
