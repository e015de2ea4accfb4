//! Client error types.

use std::fmt;

use timehunt_core::{DisplayConfigError, RangeParseError};

use crate::commands::fix::FixError;
use crate::retry::ReauthError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error.
    Provider(String),
    /// IO error.
    Io(std::io::Error),
    /// Malformed range expression.
    Parse(RangeParseError),
    /// Credentials were rejected after every allowed re-authorization.
    AuthRequired(String),
    /// The confirmation prompt could not be answered.
    Prompt(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Parse(err) => write!(f, "invalid range: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Prompt(err) => write!(f, "no answer to confirmation: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) | Self::Prompt(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<RangeParseError> for ClientError {
    fn from(err: RangeParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<DisplayConfigError> for ClientError {
    fn from(err: DisplayConfigError) -> Self {
        Self::Config(format!("[display] {}", err))
    }
}

impl From<timehunt_providers::ProviderError> for ClientError {
    fn from(err: timehunt_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<ReauthError> for ClientError {
    fn from(err: ReauthError) -> Self {
        match err {
            ReauthError::Fatal(err) => err.into(),
            exhausted @ ReauthError::Exhausted { .. } => Self::AuthRequired(exhausted.to_string()),
        }
    }
}

impl From<FixError> for ClientError {
    fn from(err: FixError) -> Self {
        match err {
            FixError::Parse(err) => Self::Parse(err),
            FixError::Provider(err) => err.into(),
            exhausted @ FixError::AuthorizationExhausted { .. } => {
                Self::AuthRequired(exhausted.to_string())
            }
            FixError::Prompt(err) => Self::Prompt(err),
            FixError::Io(err) => Self::Io(err),
        }
    }
}
