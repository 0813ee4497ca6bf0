//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input; dispatch
//! happens in `main` without trait objects.

use std::sync::Arc;
use tracing::info;
use yathra_config::Config;
use yathra_conversation::{ConversationConfig, ConversationManager};
use yathra_core::ExchangeProvider;
use yathra_providers::GeminiProvider;
use yathra_session::{HistoryConfig, SessionStore, StoreConfig};

mod chat;
mod info;
mod init;
mod serve;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// Each strategy names its own input type, so arguments are passed without
/// boxing or runtime casting.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Session retention limits from the `sessions` section.
fn store_config(config: &Config) -> StoreConfig {
    StoreConfig {
        max_sessions: config.sessions.max_sessions(),
        idle_ttl: config.sessions.idle_ttl(),
        history: HistoryConfig {
            max_turns: config.sessions.max_turns(),
            max_chars: config.sessions.max_chars(),
        },
    }
}

fn conversation_config(config: &Config) -> ConversationConfig {
    ConversationConfig {
        generation: config.model.generation.clone(),
        safety: config.model.safety.clone(),
        exchange_timeout: config.model.timeout(),
        apology: config.assistant.apology.clone(),
    }
}

/// Wire provider, session store and conversation manager from `config`.
///
/// Fails before anything is served when no API key is configured.
pub fn build_manager(config: &Config) -> anyhow::Result<Arc<ConversationManager>> {
    let api_key = config.require_api_key()?;

    let mut provider = GeminiProvider::new(api_key, config.model.name.clone())
        .with_retry_delays(config.model.retry_delays());
    if let Some(base_url) = &config.providers.gemini.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let provider: Arc<dyn ExchangeProvider> = Arc::new(provider);

    let store_config = store_config(config);
    info!(
        "Session limits: max_sessions={:?}, idle_ttl={:?}, max_turns={:?}",
        store_config.max_sessions, store_config.idle_ttl, store_config.history.max_turns
    );
    let store = Arc::new(SessionStore::new(config.assistant.seed(), store_config));

    Ok(Arc::new(ConversationManager::new(
        provider,
        store,
        conversation_config(config),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limits_disable_retention() {
        let mut config = Config::default();
        config.sessions.max_sessions = 0;
        config.sessions.idle_ttl_secs = 0;
        config.sessions.max_turns = 0;

        let store = store_config(&config);
        assert_eq!(store.max_sessions, None);
        assert_eq!(store.idle_ttl, None);
        assert_eq!(store.history, HistoryConfig::unbounded());
    }

    #[test]
    fn test_build_manager_requires_api_key() {
        let config = Config::default();
        assert!(build_manager(&config).is_err());
    }

    #[test]
    fn test_conversation_config_uses_assistant_apology() {
        let mut config = Config::default();
        config.assistant.apology = "Try again soon.".to_string();
        assert_eq!(conversation_config(&config).apology, "Try again soon.");
    }
}
