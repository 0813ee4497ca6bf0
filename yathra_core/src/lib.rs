#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod generation;
pub mod transcript;

pub use generation::{BlockThreshold, GenerationConfig, HarmCategory, SafetySetting};
pub use transcript::{SeedPair, Transcript};

/// Reply sent in place of a model answer when the exchange fails.
pub const DEFAULT_APOLOGY: &str =
    "Sorry, I'm having trouble processing your request. Please try again later.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One utterance in a dialogue. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Everything the model needs for one exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeRequest<'a> {
    /// Full ordered context, ending with the newest user turn.
    pub turns: &'a [Turn],
    pub generation: &'a GenerationConfig,
    pub safety: &'a [SafetySetting],
}

#[derive(Debug, Clone)]
pub struct ExchangeReply {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Ways an exchange with the model can fail.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service error (status {status:?}): {message}")]
    Service { status: Option<u16>, message: String },

    #[error("reply blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

impl ExchangeError {
    /// Whether repeating the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Service { status, .. } => {
                matches!(status, Some(429 | 500 | 502 | 503 | 504) | None)
            }
            Self::SafetyBlocked(_) | Self::EmptyReply | Self::Timeout(_) | Self::Configuration(_) => {
                false
            }
        }
    }
}

/// The external model's turn-taking contract: context in, reply or failure out.
#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    async fn exchange(&self, request: ExchangeRequest<'_>) -> Result<ExchangeReply, ExchangeError>;
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ExchangeProvider + ?Sized> ExchangeProvider for std::sync::Arc<T> {
    async fn exchange(&self, request: ExchangeRequest<'_>) -> Result<ExchangeReply, ExchangeError> {
        (**self).exchange(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::assistant("hi")).unwrap_or_default();
        assert_eq!(json, r#"{"role":"assistant","text":"hi"}"#);
    }

    #[test]
    fn safety_block_is_not_retryable() {
        assert!(!ExchangeError::SafetyBlocked("HARASSMENT".into()).is_retryable());
        assert!(!ExchangeError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ExchangeError::Network("reset".into()).is_retryable());
    }

    #[test]
    fn service_errors_retry_only_on_transient_status() {
        let transient = ExchangeError::Service {
            status: Some(503),
            message: "overloaded".into(),
        };
        let permanent = ExchangeError::Service {
            status: Some(400),
            message: "bad request".into(),
        };
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
    }
}
