//! Google Calendar provider implementation.
//!
//! This module provides a [`GoogleProvider`] that reads, deletes and creates
//! events in one Google calendar through the Calendar API v3.
//!
//! # Features
//!
//! - OAuth 2.0 PKCE authorization flow with loopback redirect
//! - Token persistence with owner-only file permissions
//! - Automatic token refresh
//! - Recurring event expansion (server-side)
//!
//! # Authentication Flow
//!
//! 1. User provides their own OAuth client ID/secret (required by Google)
//! 2. Provider starts a local HTTP server on a free port
//! 3. Prints and opens Google's authorization page with a PKCE challenge
//! 4. Google redirects to the loopback server with the authorization code
//! 5. Provider exchanges the code for access and refresh tokens
//! 6. Tokens are persisted for future use
//!
//! # Example
//!
//! ```ignore
//! use timehunt_providers::google::{GoogleProvider, GoogleConfig, OAuthCredentials};
//! use timehunt_providers::{CalendarGateway, FetchOptions};
//!
//! let credentials = OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! );
//!
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//!
//! if provider.needs_reauth() {
//!     provider.authenticate().await?;
//! }
//!
//! let events = provider.fetch_events(FetchOptions::new().with_query("Focus")).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
