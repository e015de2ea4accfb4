//! Authentication commands.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use timehunt_providers::google::{GoogleProvider, OAuthCredentials};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Options for `timehunt auth google`.
#[derive(Debug, Default)]
pub struct GoogleAuthArgs {
    /// `--client-id`
    pub client_id: Option<String>,
    /// `--client-secret`
    pub client_secret: Option<String>,
    /// `--credentials-file`
    pub credentials_file: Option<PathBuf>,
    /// `--force`
    pub force: bool,
}

/// Run the Google authentication flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, then runs the OAuth 2.0 PKCE flow.
///
/// Credentials given on the command line are persisted to `config_path` so
/// later `list` and `fix` runs find them.
pub async fn google(
    args: GoogleAuthArgs,
    config: &ClientConfig,
    config_path: &Path,
    calendar_override: Option<&str>,
) -> ClientResult<()> {
    let settings = config.google_settings();
    let (credentials, source) = resolve_google_credentials(
        args.client_id,
        args.client_secret,
        args.credentials_file,
        &settings,
    )?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let provider_settings = GoogleSettings {
        client_id: Some(credentials.client_id.clone()),
        client_secret: Some(credentials.client_secret.clone()),
        ..settings
    };
    let provider_config = provider_settings
        .to_provider_config(calendar_override)
        .map_err(ClientError::Config)?;
    let provider = GoogleProvider::new(provider_config)?;

    if !provider.needs_reauth() && !args.force {
        remember(&credentials, source, config_path);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.authenticate().await?;
    remember(&credentials, source, config_path);

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!(
        "Tokens saved to {}.",
        provider.config().token_path.display()
    );
    println!();
    println!("You can now run `timehunt list <NAME>` and `timehunt fix`.");

    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`
    Cli,
    /// `config.toml` or the environment fallback
    Config,
}

fn remember(credentials: &OAuthCredentials, source: CredentialSource, config_path: &Path) {
    if source == CredentialSource::Config {
        return;
    }
    match persist_credentials(config_path, credentials) {
        Ok(()) => println!("Credentials saved to {}", config_path.display()),
        Err(e) => warn!("could not save credentials to {}: {}", config_path.display(), e),
    }
}

/// Writes credentials into the `[google]` table of `config_path`.
///
/// Everything else in the file, comments included, is kept. A missing
/// `calendar_id` is set to `primary`. The file holds the client secret in
/// plain text, so it is replaced atomically and left readable by the owner
/// only.
fn persist_credentials(config_path: &Path, credentials: &OAuthCredentials) -> Result<(), String> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path).map_err(|e| e.to_string())?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("could not parse config.toml for writing: {}", e))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| "[google] is not a table".to_string())?;
    google["client_id"] = toml_edit::value(credentials.client_id.as_str());
    google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());
    if !google.contains_key("calendar_id") {
        google["calendar_id"] = toml_edit::value("primary");
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("could not create {}: {}", parent.display(), e))?;
    }

    let temp_path = config_path.with_extension("toml.tmp");
    std::fs::write(&temp_path, doc.to_string())
        .map_err(|e| format!("could not write {}: {}", temp_path.display(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(format!("could not restrict permissions of {}: {}", temp_path.display(), e));
        }
    }

    std::fs::rename(&temp_path, config_path)
        .map_err(|e| format!("could not replace {}: {}", config_path.display(), e))?;
    info!("credentials saved to {}", config_path.display());
    Ok(())
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret` (or their env vars)
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section, with secret resolution
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    settings: &GoogleSettings,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Cli));
    }

    if settings.has_inline_credentials() {
        let creds = settings.resolve_credentials().map_err(|e| {
            ClientError::Config(format!(
                "failed to resolve Google credentials from config: {}",
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Config));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}
