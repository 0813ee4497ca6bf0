//! Conversation manager for multi-turn dialogue.
//!
//! The `ConversationManager` is the entry point for every user turn: it
//! validates input, serializes turns per identity, builds the context sent
//! to the model and records the reply.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use yathra_core::{
    DEFAULT_APOLOGY, ExchangeError, ExchangeProvider, ExchangeReply, ExchangeRequest,
    GenerationConfig, SafetySetting, Transcript, Turn, Usage,
};
use yathra_session::SessionStore;

/// Configuration for conversation management.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Sampling and length limits sent with every exchange
    pub generation: GenerationConfig,
    /// Content-safety policy sent with every exchange
    pub safety: Vec<SafetySetting>,
    /// Upper bound on one exchange, provider retries included
    pub exchange_timeout: Duration,
    /// Reply returned when the model cannot be reached
    pub apology: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            safety: SafetySetting::default_policy(),
            exchange_timeout: Duration::from_secs(30),
            apology: DEFAULT_APOLOGY.to_string(),
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub const fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_apology(mut self, apology: String) -> Self {
        self.apology = apology;
        self
    }
}

/// Errors that can occur during conversation management.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Never returned by [`ConversationManager::handle_turn`]; used to
    /// classify upstream failures that were answered with the apology.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] ExchangeError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result of processing a conversation turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Model reply, or the apology when the exchange failed
    pub response: String,
    /// Token usage reported by the model
    pub usage: Option<Usage>,
    /// 1-based count of user turns in the transcript, this one included
    pub turn_number: usize,
    /// Whether the exchange failed and `response` is the apology
    pub degraded: bool,
}

/// Multi-turn conversation manager shared by all request handlers.
pub struct ConversationManager<P = Arc<dyn ExchangeProvider>>
where
    P: Send + Sync,
{
    provider: P,
    store: Arc<SessionStore>,
    config: ConversationConfig,
}

impl<P> ConversationManager<P>
where
    P: ExchangeProvider + Send + Sync,
{
    pub fn new(provider: P, store: Arc<SessionStore>, config: ConversationConfig) -> Self {
        info!(
            "Creating conversation manager: provider={}, timeout={:?}",
            provider.name(),
            config.exchange_timeout
        );
        Self {
            provider,
            store,
            config,
        }
    }

    /// Process a single conversation turn for `identity`.
    ///
    /// The identity's transcript stays locked from the user append to the
    /// assistant append, so concurrent turns for one identity never
    /// interleave. An upstream failure leaves the user turn in place and
    /// returns the apology instead of an error.
    pub async fn handle_turn(
        &self,
        identity: &str,
        input: &str,
    ) -> Result<TurnResult, ConversationError> {
        if input.trim().is_empty() {
            return Err(ConversationError::InvalidInput("user input is empty"));
        }
        if identity.is_empty() {
            return Err(ConversationError::Internal("caller identity is empty".into()));
        }

        let handle = self.store.get_or_init(identity).await;
        let mut transcript = handle.lock().await;

        self.record(identity, &mut transcript, Turn::user(input)).await;
        let turn_number = transcript.user_turns();
        info!("Processing turn {turn_number} for {identity}");

        match self.exchange(&transcript).await {
            Ok(reply) => {
                let turn = Turn::assistant(reply.text.clone());
                self.record(identity, &mut transcript, turn).await;
                if let Some(usage) = reply.usage {
                    debug!(
                        "Tokens: {} prompt + {} completion = {} total",
                        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                    );
                }
                debug!("Turn {turn_number} completed successfully");

                Ok(TurnResult {
                    response: reply.text,
                    usage: reply.usage,
                    turn_number,
                    degraded: false,
                })
            }
            Err(e) => {
                let classified = ConversationError::UpstreamUnavailable(e);
                warn!("Turn {turn_number} for {identity} failed: {classified}");

                Ok(TurnResult {
                    response: self.config.apology.clone(),
                    usage: None,
                    turn_number,
                    degraded: true,
                })
            }
        }
    }

    /// Forget the identity's transcript. Returns whether one existed.
    pub async fn reset(&self, identity: &str) -> bool {
        self.store.reset(identity).await
    }

    /// Snapshot of the identity's transcript.
    pub async fn transcript(&self, identity: &str) -> Option<Transcript> {
        self.store.transcript(identity).await
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &ConversationConfig {
        &self.config
    }

    async fn record(&self, identity: &str, transcript: &mut Transcript, turn: Turn) {
        let trimmed = self.store.record(identity, transcript, turn).await;
        if trimmed > 0 {
            debug!("Trimmed {trimmed} old turns for {identity}");
        }
    }

    async fn exchange(&self, transcript: &Transcript) -> Result<ExchangeReply, ExchangeError> {
        let request = ExchangeRequest {
            turns: transcript.turns(),
            generation: &self.config.generation,
            safety: &self.config.safety,
        };

        let timeout = self.config.exchange_timeout;
        let reply = tokio::time::timeout(timeout, self.provider.exchange(request))
            .await
            .map_err(|_| ExchangeError::Timeout(timeout))??;

        if reply.text.trim().is_empty() {
            return Err(ExchangeError::EmptyReply);
        }
        Ok(reply)
    }
}
