//! Google Calendar provider implementation.
//!
//! This module implements [`CalendarGateway`] and [`CredentialProvider`] for
//! Google Calendar.

use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use timehunt_core::{CalendarEvent, DateTimeRange};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarGateway, CredentialProvider, FetchOptions};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// Google Calendar provider.
///
/// This provider reads and writes one Google calendar through the Calendar
/// API v3. It handles authentication via OAuth 2.0 PKCE flow.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    /// API client wrapped in tokio RwLock for async access
    api_client: TokioRwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    /// Provider name used in errors and logs.
    pub const NAME: &'static str = "google";

    /// Creates a new Google provider with the given configuration.
    ///
    /// This loads any cached tokens but does not initiate authentication.
    /// Gateway calls without usable tokens fail with an authentication error;
    /// call [`authenticate`](Self::authenticate) to obtain tokens.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        token_storage.load();

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(None),
        })
    }

    /// Returns the provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the OAuth authentication flow.
    ///
    /// This opens the user's browser to Google's consent page.
    /// After authorization, tokens are stored for future use.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        self.token_storage.set(tokens.clone())?;
        self.install_client(&tokens.access_token).await?;

        info!("authentication successful");
        Ok(())
    }

    /// Returns true when no cached tokens cover the configured scopes.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    async fn install_client(&self, access_token: &str) -> ProviderResult<()> {
        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(access_token),
            None => {
                *client = Some(GoogleCalendarClient::new(
                    access_token,
                    self.config.timeout,
                    &self.config.user_agent,
                )?);
            }
        }
        Ok(())
    }

    /// Ensures we have an API client with a usable access token, refreshing
    /// it if it expired.
    async fn ensure_client(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authorized - run 'timehunt auth google'")
                .with_provider(Self::NAME)
        })?;

        if !tokens.has_scopes(&self.config.scopes) {
            return Err(ProviderError::authentication(
                "cached tokens lack the calendar.events scope - re-authorization required",
            )
            .with_provider(Self::NAME));
        }

        if !tokens.is_expired() {
            if self.api_client.read().await.is_none() {
                self.install_client(&tokens.access_token).await?;
            }
            return Ok(());
        }

        let refresh_token = tokens.refresh_token.as_ref().ok_or_else(|| {
            ProviderError::authentication("no refresh token - re-authorization required")
                .with_provider(Self::NAME)
        })?;

        debug!("refreshing expired access token");
        let refreshed = self.oauth_client.refresh_token(refresh_token).await?;
        self.token_storage.update_access_token(
            &refreshed.access_token,
            refreshed.refresh_token,
            refreshed.expires_in,
        )?;
        self.install_client(&refreshed.access_token).await
    }

    async fn fetch_events_impl(&self, options: FetchOptions) -> ProviderResult<Vec<CalendarEvent>> {
        self.ensure_client().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        debug!(
            "fetching events from calendar {} (query: {:?})",
            self.config.calendar_id, options.query
        );
        client
            .list_events(&self.config.calendar_id, &options)
            .await
            .map_err(|e| e.with_provider(Self::NAME))
    }

    async fn delete_events_impl(&self, events: &[CalendarEvent]) -> ProviderResult<usize> {
        self.ensure_client().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let mut deleted = 0;
        for event in events {
            client
                .delete_event(&self.config.calendar_id, &event.id)
                .await
                .map_err(|e| e.with_provider(Self::NAME))?;
            deleted += 1;
        }
        info!("deleted {} events", deleted);
        Ok(deleted)
    }

    async fn create_event_impl(
        &self,
        name: &str,
        range: &DateTimeRange,
    ) -> ProviderResult<CalendarEvent> {
        self.ensure_client().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let created = client
            .insert_event(&self.config.calendar_id, name, range)
            .await
            .map_err(|e| e.with_provider(Self::NAME))?;
        info!("created event {:?} ({})", created.name, range);
        Ok(created)
    }
}

impl CalendarGateway for GoogleProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.fetch_events_impl(options))
    }

    fn delete_events<'a>(&'a self, events: &'a [CalendarEvent]) -> BoxFuture<'a, ProviderResult<usize>> {
        Box::pin(self.delete_events_impl(events))
    }

    fn create_event<'a>(
        &'a self,
        name: &'a str,
        range: &'a DateTimeRange,
    ) -> BoxFuture<'a, ProviderResult<CalendarEvent>> {
        Box::pin(self.create_event_impl(name, range))
    }
}

impl CredentialProvider for GoogleProvider {
    fn authorize(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(self.authenticate())
    }
}
