//! Calendar gateway and credential traits, and their Google implementation.
//!
//! This crate provides the abstraction layer between the commands and a
//! calendar backend:
//!
//! - [`CalendarGateway`] - Fetch, delete and create events
//! - [`CredentialProvider`] - Re-acquire credentials after a rejection
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//!        ┌─────────────────┐
//!        │  Google API     │
//!        └────────┬────────┘
//!                 │
//!                 ▼
//!        ┌─────────────────┐
//!        │ GoogleProvider  │
//!        └────────┬────────┘
//!                 │ CalendarGateway + CredentialProvider
//!                 ▼
//!        ┌─────────────────┐
//!        │  CalendarEvent  │
//!        └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use timehunt_providers::{CalendarGateway, FetchOptions};
//!
//! async fn matching(gateway: &dyn CalendarGateway, name: &str) -> ProviderResult<Vec<CalendarEvent>> {
//!     gateway.fetch_events(FetchOptions::new().with_query(name)).await
//! }
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod provider;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarGateway, CredentialProvider, FetchOptions};
