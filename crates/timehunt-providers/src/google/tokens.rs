//! OAuth token cache.
//!
//! Tokens live in a single JSON file, written atomically (temp file plus
//! rename) with owner-only permissions. A missing or unreadable cache is not
//! an error: it simply means the next API call will ask for authorization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Information about an OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Tokens without an expiry never expire.
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Returns true if the token has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Updates the access token after a refresh.
    ///
    /// Google only sometimes rotates the refresh token; a `None` keeps the
    /// current one.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expiry_from(expires_in_secs);
        self.last_refresh = Utc::now();
    }
}

/// Persisted token storage with file-based backend.
#[derive(Debug)]
pub struct TokenStorage {
    /// Path to the token file.
    path: PathBuf,

    /// In-memory cache of the current tokens.
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates a new token storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Reads a token cache file.
    ///
    /// Yields `None` when the file is missing, unreadable or malformed.
    pub fn read_cached(path: &Path) -> Option<TokenInfo> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("no usable token file at {:?}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!("ignoring malformed token file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns true if tokens were loaded.
    pub fn load(&self) -> bool {
        let tokens = Self::read_cached(&self.path);
        let loaded = tokens.is_some();
        if loaded {
            info!("loaded tokens from {:?}", self.path);
        }
        *self.write() = tokens;
        loaded
    }

    /// Saves the current tokens to disk.
    pub fn save(&self) -> ProviderResult<()> {
        let tokens = self.read();
        let tokens = tokens
            .as_ref()
            .ok_or_else(|| ProviderError::internal("no tokens to save"))?;
        self.write_file(tokens)
    }

    fn write_file(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
                    .with_source(e)
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
                .with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            if let Err(e) = fs::set_permissions(&temp_path, perms) {
                warn!("failed to restrict token file permissions: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
                .with_source(e)
        })?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Sets new tokens and saves them to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.write_file(&tokens)?;
        *self.write() = Some(tokens);
        Ok(())
    }

    /// Updates the access token and saves to disk.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        let mut tokens = self
            .get()
            .ok_or_else(|| ProviderError::authentication("no tokens to update"))?;
        tokens.update_access_token(access_token, refresh_token, expires_in_secs);
        self.set(tokens)
    }

    /// Clears the stored tokens (both in memory and on disk).
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
                    .with_source(e)
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if re-authorization is needed because the stored
    /// tokens are missing or lack one of `required_scopes`.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.read()
            .as_ref()
            .is_none_or(|tokens| !tokens.has_scopes(required_scopes))
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn token_path(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join("google-tokens.json")
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        );

        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token, Some("refresh-token".to_string()));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn token_info_expired() {
        let mut token = TokenInfo::new("access", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        token.expires_at = None;
        assert!(!token.is_expired());
    }

    #[test]
    fn token_info_short_lifetime_is_already_expired() {
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn token_info_scope_check() {
        let token = TokenInfo::new(
            "access",
            None,
            None,
            vec!["scope1".to_string(), "scope2".to_string()],
        );

        assert!(token.has_scopes(&["scope1".to_string()]));
        assert!(token.has_scopes(&["scope1".to_string(), "scope2".to_string()]));
        assert!(!token.has_scopes(&["scope3".to_string()]));
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut token = TokenInfo::new("old", Some("refresh-1".to_string()), Some(10), vec![]);

        token.update_access_token("new", None, Some(3600));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!token.is_expired());

        token.update_access_token("newer", Some("refresh-2".to_string()), Some(3600));
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[test]
    fn token_storage_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = token_path(&dir);
        let storage = TokenStorage::new(path.clone());

        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        );

        storage.set(token.clone()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let storage2 = TokenStorage::new(path.clone());
        assert!(storage2.load());
        assert_eq!(storage2.get(), Some(token));
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = token_path(&dir);
        TokenStorage::new(path.clone())
            .set(TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn read_cached_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(TokenStorage::read_cached(&token_path(&dir)).is_none());
    }

    #[test]
    fn read_cached_malformed_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(TokenStorage::read_cached(&path).is_none());

        fs::write(&path, r#"{"refresh_token": "only"}"#).unwrap();
        assert!(TokenStorage::read_cached(&path).is_none());

        let storage = TokenStorage::new(path);
        assert!(!storage.load());
        assert!(storage.get().is_none());
    }

    #[test]
    fn update_access_token_persists() {
        let dir = TempDir::new().unwrap();
        let path = token_path(&dir);
        let storage = TokenStorage::new(path.clone());

        assert!(storage.update_access_token("x", None, None).is_err());

        storage
            .set(TokenInfo::new("old", Some("refresh".to_string()), Some(3600), vec![]))
            .unwrap();
        storage.update_access_token("new", None, Some(3600)).unwrap();

        let cached = TokenStorage::read_cached(&path).unwrap();
        assert_eq!(cached.access_token, "new");
        assert_eq!(cached.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn token_storage_clear() {
        let dir = TempDir::new().unwrap();
        let path = token_path(&dir);
        let storage = TokenStorage::new(path.clone());

        storage.set(TokenInfo::new("access", None, None, vec![])).unwrap();
        assert!(path.exists());

        storage.clear().unwrap();
        assert!(!path.exists());
        assert!(storage.get().is_none());
    }

    #[test]
    fn token_storage_needs_reauth() {
        let dir = TempDir::new().unwrap();
        let storage = TokenStorage::new(token_path(&dir));

        assert!(storage.needs_reauth(&["scope1".to_string()]));

        let token = TokenInfo::new("access", None, None, vec!["scope1".to_string()]);
        storage.set(token).unwrap();
        assert!(!storage.needs_reauth(&["scope1".to_string()]));
        assert!(storage.needs_reauth(&["scope2".to_string()]));
    }
}
