//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/timehunt/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is
//!
//! When the `[google]` section carries no credentials, `GOOGLE_CLIENT_ID` and
//! `GOOGLE_CLIENT_SECRET` are read from the environment instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use timehunt_core::{BusinessWindow, DisplayConfigError, DisplayOptions, parse_locale};

use crate::retry::{DEFAULT_MAX_AUTH_ATTEMPTS, ReauthPolicy};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the timehunt client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Display settings.
    #[serde(default)]
    pub display: DisplaySettings,

    /// Settings for the `fix` command.
    #[serde(default)]
    pub fix: FixSettings,
}

/// Display settings for output formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Locale used for weekday and month names.
    pub locale: String,

    /// strftime template for day headers.
    pub date_format: String,

    /// strftime template for times of day.
    pub time_format: String,

    /// Text shown instead of a span for all-day events.
    pub all_day_label: String,

    /// Text between the start and end of a span.
    pub range_separator: String,

    /// Text between spans on the same day.
    pub alternative_separator: String,

    /// Opening time of the business day (`HH:MM`).
    pub business_day_start: String,

    /// Closing time of the business day (`HH:MM`).
    pub business_day_end: String,

    /// `list` mentions when more events than this were found.
    pub event_count_notice: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let options = DisplayOptions::default();
        Self {
            locale: "ja_JP".to_string(),
            date_format: options.date_format,
            time_format: options.time_format,
            all_day_label: options.all_day_label,
            range_separator: options.range_separator,
            alternative_separator: options.alternative_separator,
            business_day_start: "09:00".to_string(),
            business_day_end: "19:00".to_string(),
            event_count_notice: 10,
        }
    }
}

impl DisplaySettings {
    /// Converts to formatter options, validating locale and business window.
    pub fn to_display_options(&self) -> Result<DisplayOptions, DisplayConfigError> {
        Ok(DisplayOptions {
            date_format: self.date_format.clone(),
            time_format: self.time_format.clone(),
            locale: parse_locale(&self.locale)?,
            all_day_label: self.all_day_label.clone(),
            range_separator: self.range_separator.clone(),
            alternative_separator: self.alternative_separator.clone(),
            business_window: BusinessWindow::parse(
                &self.business_day_start,
                &self.business_day_end,
            )?,
        })
    }
}

/// Settings for the `fix` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixSettings {
    /// Attempts allowed before giving up on rejected credentials.
    pub max_auth_attempts: u32,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
        }
    }
}

impl FixSettings {
    /// Returns the re-authorization policy for commands.
    pub fn reauth_policy(&self) -> ReauthPolicy {
        ReauthPolicy::new(self.max_auth_attempts)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Loads the file given on the command line, or the default one.
    ///
    /// An explicit path must exist; the default path may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, String> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timehunt")
    }

    /// Returns the Google settings, or empty ones relying on the environment.
    #[cfg(feature = "google")]
    pub fn google_settings(&self) -> GoogleSettings {
        self.google.clone().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Environment variable holding the OAuth client ID.
#[cfg(feature = "google")]
pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";

/// Environment variable holding the OAuth client secret.
#[cfg(feature = "google")]
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

/// Google Calendar provider settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Calendar to read and write. Defaults to `primary`.
    pub calendar_id: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// Per-request timeout for Calendar API calls, in seconds.
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration.
    ///
    /// `calendar_override` (from `--calendar-id` or `GOOGLE_CALENDAR_ID`)
    /// wins over the configured calendar.
    pub fn to_provider_config(
        &self,
        calendar_override: Option<&str>,
    ) -> Result<timehunt_providers::google::GoogleConfig, String> {
        use timehunt_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials);

        if let Some(calendar_id) = calendar_override.or(self.calendar_id.as_deref()) {
            config = config.with_calendar_id(calendar_id);
        }

        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }

        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err("timeout_secs must be at least 1".to_string());
            }
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Resolves Google OAuth credentials from inline fields or the process
    /// environment.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> Result<timehunt_providers::google::OAuthCredentials, String> {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolves credentials, looking up fallbacks through `env`.
    ///
    /// Each configured value is passed through `secret::resolve()` to expand
    /// `pass::` and `env::` references. A missing value falls back to
    /// `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`.
    pub(crate) fn resolve_credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<timehunt_providers::google::OAuthCredentials, String> {
        use timehunt_providers::google::OAuthCredentials;

        let id = match self.client_id.as_deref() {
            Some(raw) => crate::secret::resolve(raw)
                .map_err(|e| format!("failed to resolve client_id: {}", e))?,
            None => env(CLIENT_ID_ENV).ok_or_else(|| {
                format!(
                    "Google credentials not found. Add to {}:\n  \
                     [google]\n  \
                     client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                     client_secret = \"YOUR_SECRET\"\n\n  \
                     Or set {} and {}, or run: timehunt auth google --credentials-file <path>",
                    ClientConfig::default_path().display(),
                    CLIENT_ID_ENV,
                    CLIENT_SECRET_ENV,
                )
            })?,
        };

        let secret = match self.client_secret.as_deref() {
            Some(raw) => crate::secret::resolve(raw)
                .map_err(|e| format!("failed to resolve client_secret: {}", e))?,
            None => env(CLIENT_SECRET_ENV).ok_or_else(|| {
                format!(
                    "client_secret is missing from [google] section in config.toml and {} is not set",
                    CLIENT_SECRET_ENV
                )
            })?,
        };

        Ok(OAuthCredentials::new(id, secret))
    }

    /// Returns true when credentials are set in the file itself.
    pub fn has_inline_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_formatter_defaults() {
        let settings = DisplaySettings::default();
        assert_eq!(settings.to_display_options().unwrap(), DisplayOptions::default());
        assert_eq!(settings.event_count_notice, 10);
        assert_eq!(FixSettings::default().reauth_policy().max_attempts(), 3);
    }

    #[test]
    fn display_section_overrides() {
        let config: ClientConfig = toml::from_str(
            r#"
[display]
locale = "en_US"
date_format = "%a %b %-d"
business_day_start = "10:00"
business_day_end = "18:30"
event_count_notice = 5

[fix]
max_auth_attempts = 1
"#,
        )
        .unwrap();

        let options = config.display.to_display_options().unwrap();
        assert_eq!(options.date_format, "%a %b %-d");
        assert_eq!(options.time_format, "%H:%M");
        assert_eq!(options.locale, chrono::Locale::en_US);
        assert_eq!(
            options.business_window.end(),
            chrono::NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
        assert_eq!(config.display.event_count_notice, 5);
        assert_eq!(config.fix.max_auth_attempts, 1);
    }

    #[test]
    fn invalid_display_settings_are_rejected() {
        let settings = DisplaySettings {
            locale: "xx_XX".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.to_display_options(),
            Err(DisplayConfigError::UnknownLocale(_))
        ));

        let settings = DisplaySettings {
            business_day_start: "19:00".to_string(),
            business_day_end: "09:00".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.to_display_options(),
            Err(DisplayConfigError::InvertedWindow { .. })
        ));

        let settings = DisplaySettings {
            business_day_end: "7pm".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.to_display_options(),
            Err(DisplayConfigError::InvalidTime(_))
        ));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.display, DisplaySettings::default());
        assert_eq!(config.fix, FixSettings::default());
    }

    #[test]
    fn load_from_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[display\n").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("failed to parse config"));
        assert!(err.contains("config.toml"));

        let missing = tmp.path().join("missing.toml");
        assert!(ClientConfig::resolve(Some(&missing)).is_err());
    }

    #[cfg(feature = "google")]
    mod google {
        use super::super::*;

        fn no_env(_: &str) -> Option<String> {
            None
        }

        #[test]
        fn resolve_credentials_plain_text() {
            let settings = GoogleSettings {
                client_id: Some("test-id.apps.googleusercontent.com".to_string()),
                client_secret: Some("test-secret".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials_with(no_env).unwrap();
            assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "test-secret");
        }

        #[test]
        fn resolve_credentials_env_prefix() {
            unsafe {
                std::env::set_var("_TH_TEST_CLIENT_ID", "env-id.apps.googleusercontent.com");
                std::env::set_var("_TH_TEST_CLIENT_SECRET", "env-secret");
            }

            let settings = GoogleSettings {
                client_id: Some("env::_TH_TEST_CLIENT_ID".to_string()),
                client_secret: Some("env::_TH_TEST_CLIENT_SECRET".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials_with(no_env).unwrap();
            assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "env-secret");

            unsafe {
                std::env::remove_var("_TH_TEST_CLIENT_ID");
                std::env::remove_var("_TH_TEST_CLIENT_SECRET");
            }
        }

        #[test]
        fn resolve_credentials_falls_back_to_environment() {
            let env = |name: &str| match name {
                CLIENT_ID_ENV => Some("fallback.apps.googleusercontent.com".to_string()),
                CLIENT_SECRET_ENV => Some("fallback-secret".to_string()),
                _ => None,
            };
            let creds = GoogleSettings::default().resolve_credentials_with(env).unwrap();
            assert_eq!(creds.client_id, "fallback.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "fallback-secret");
        }

        #[test]
        fn file_values_win_over_environment() {
            let env = |_: &str| Some("from-env".to_string());
            let settings = GoogleSettings {
                client_id: Some("file.apps.googleusercontent.com".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials_with(env).unwrap();
            assert_eq!(creds.client_id, "file.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "from-env");
        }

        #[test]
        fn resolve_credentials_missing_id_errors() {
            let settings = GoogleSettings {
                client_secret: Some("secret".to_string()),
                ..Default::default()
            };
            let err = settings.resolve_credentials_with(no_env).unwrap_err();
            assert!(err.contains("credentials not found"));
        }

        #[test]
        fn resolve_credentials_missing_secret_errors() {
            let settings = GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".to_string()),
                ..Default::default()
            };
            let err = settings.resolve_credentials_with(no_env).unwrap_err();
            assert!(err.contains("client_secret"));
        }

        #[test]
        fn calendar_override_wins() {
            let settings = GoogleSettings {
                client_id: Some("test.apps.googleusercontent.com".to_string()),
                client_secret: Some("test-secret".to_string()),
                calendar_id: Some("team@example.com".to_string()),
                token_path: Some(PathBuf::from("/tmp/timehunt-tokens.json")),
                timeout_secs: None,
            };

            let config = settings.to_provider_config(None).unwrap();
            assert_eq!(config.calendar_id, "team@example.com");
            assert_eq!(config.token_path, PathBuf::from("/tmp/timehunt-tokens.json"));

            let config = settings.to_provider_config(Some("me@example.com")).unwrap();
            assert_eq!(config.calendar_id, "me@example.com");
        }

        #[test]
        fn calendar_defaults_to_primary() {
            let settings = GoogleSettings {
                client_id: Some("test.apps.googleusercontent.com".to_string()),
                client_secret: Some("test-secret".to_string()),
                ..Default::default()
            };
            let config = settings.to_provider_config(None).unwrap();
            assert_eq!(config.calendar_id, "primary");
        }

        #[test]
        fn request_timeout_from_config() {
            let config: ClientConfig = toml::from_str(
                "[google]\nclient_id = \"t.apps.googleusercontent.com\"\nclient_secret = \"s\"\ntimeout_secs = 5\n",
            )
            .unwrap();
            let provider = config.google_settings().to_provider_config(None).unwrap();
            assert_eq!(provider.timeout, std::time::Duration::from_secs(5));

            let zero = GoogleSettings {
                timeout_secs: Some(0),
                ..config.google_settings()
            };
            assert!(zero.to_provider_config(None).is_err());
        }

        #[test]
        fn config_toml_with_inline_credentials() {
            let toml_content = r#"
[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
calendar_id = "primary"
"#;
            let config: ClientConfig = toml::from_str(toml_content).unwrap();
            let google = config.google_settings();
            assert!(google.has_inline_credentials());

            let creds = google.resolve_credentials_with(no_env).unwrap();
            assert_eq!(creds.client_id, "toml-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "toml-secret");
        }

        #[test]
        fn missing_google_section_uses_defaults() {
            let config: ClientConfig = toml::from_str("[fix]\nmax_auth_attempts = 2\n").unwrap();
            assert!(config.google.is_none());
            assert!(!config.google_settings().has_inline_credentials());
        }
    }
}
