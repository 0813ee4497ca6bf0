use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use yathra_core::transcript::{DEFAULT_GREETING, DEFAULT_PERSONA};
use yathra_core::{DEFAULT_APOLOGY, GenerationConfig, SafetySetting, SeedPair};

const CONFIG_DIR: &str = "yathra";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    #[serde(default = "ServerConfig::default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: Self::default_static_dir(),
        }
    }
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        3000
    }

    fn default_static_dir() -> PathBuf {
        PathBuf::from("public")
    }
}

/// Persona, greeting and apology texts.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "AssistantConfig::default_persona")]
    pub persona: String,
    #[serde(default = "AssistantConfig::default_greeting")]
    pub greeting: String,
    #[serde(default = "AssistantConfig::default_apology")]
    pub apology: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: Self::default_persona(),
            greeting: Self::default_greeting(),
            apology: Self::default_apology(),
        }
    }
}

impl AssistantConfig {
    fn default_persona() -> String {
        DEFAULT_PERSONA.to_string()
    }

    fn default_greeting() -> String {
        DEFAULT_GREETING.to_string()
    }

    fn default_apology() -> String {
        DEFAULT_APOLOGY.to_string()
    }

    #[must_use]
    pub fn seed(&self) -> SeedPair {
        SeedPair::new(self.persona.clone(), self.greeting.clone())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "ModelConfig::default_name")]
    pub name: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default = "SafetySetting::default_policy")]
    pub safety: Vec<SafetySetting>,
    #[serde(default = "ModelConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "ModelConfig::default_retry_delays_secs")]
    pub retry_delays_secs: Vec<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            generation: GenerationConfig::default(),
            safety: SafetySetting::default_policy(),
            timeout_secs: Self::default_timeout_secs(),
            retry_delays_secs: Self::default_retry_delays_secs(),
        }
    }
}

impl ModelConfig {
    fn default_name() -> String {
        "gemini-2.0-flash".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    fn default_retry_delays_secs() -> Vec<u64> {
        vec![1, 2]
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Retention limits. A value of 0 disables the corresponding limit.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionsConfig {
    #[serde(default = "SessionsConfig::default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "SessionsConfig::default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "SessionsConfig::default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub max_chars: usize,
    #[serde(default = "SessionsConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: Self::default_max_sessions(),
            idle_ttl_secs: Self::default_idle_ttl_secs(),
            max_turns: Self::default_max_turns(),
            max_chars: 0,
            sweep_interval_secs: Self::default_sweep_interval_secs(),
        }
    }
}

impl SessionsConfig {
    const fn default_max_sessions() -> usize {
        10_000
    }

    const fn default_idle_ttl_secs() -> u64 {
        3600
    }

    const fn default_max_turns() -> usize {
        200
    }

    const fn default_sweep_interval_secs() -> u64 {
        60
    }

    #[must_use]
    pub const fn max_sessions(&self) -> Option<usize> {
        nonzero(self.max_sessions)
    }

    #[must_use]
    pub const fn idle_ttl(&self) -> Option<Duration> {
        if self.idle_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_ttl_secs))
        }
    }

    #[must_use]
    pub const fn max_turns(&self) -> Option<usize> {
        nonzero(self.max_turns)
    }

    #[must_use]
    pub const fn max_chars(&self) -> Option<usize> {
        nonzero(self.max_chars)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(if self.sweep_interval_secs == 0 {
            Self::default_sweep_interval_secs()
        } else {
            self.sweep_interval_secs
        })
    }
}

const fn nonzero(value: usize) -> Option<usize> {
    if value == 0 { None } else { Some(value) }
}

impl Config {
    /// Defaults, then `~/yathra/config.json` if present, then `.env` and
    /// process environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;

        if dotenv::dotenv().is_ok() {
            debug!("Loaded .env file");
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {e}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `API_KEY`/`GEMINI_API_KEY` and `PORT` overrides.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY")
            .or_else(|| lookup("GEMINI_API_KEY"))
            .filter(|k| !k.trim().is_empty())
        {
            self.providers.gemini.api_key = key;
        }

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }

    /// Fail unless an API key is configured.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        let key = self.providers.gemini.api_key.trim();
        if key.is_empty() {
            anyhow::bail!(
                "API key is missing. Set API_KEY in the environment or .env file, \
                 or add it to {}.",
                Self::config_path()
                    .map_or_else(|_| CONFIG_FILE.to_string(), |p| p.display().to_string())
            );
        }
        Ok(key)
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR)
            .join(CONFIG_FILE))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR);

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);
        Self::write_template(&config_path)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your Gemini API key (or export API_KEY)");
        println!("   2. Put the landing page under server.static_dir");
        println!("   3. Run 'yathra serve' to start the chat API");
        println!();
        println!("🔧 Configuration options:");
        println!("   - model.name: Gemini model to use (gemini-2.0-flash, gemini-1.5-pro, etc.)");
        println!("   - sessions.idle_ttl_secs: Forget a visitor after this much silence (0 = never)");
        println!("   - sessions.max_turns: Turns kept per visitor, seed included (0 = unlimited)");
        println!();
        Ok(())
    }

    /// Write the default template, refusing to overwrite an existing file.
    pub fn write_template(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                path.display()
            );
        }

        let mut template = Self::default();
        template.providers.gemini.api_key = "your-gemini-api-key-here".to_string();
        std::fs::write(path, serde_json::to_string_pretty(&template)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let config = Config::load_from(&dir.path().join("absent.json"));

        let Ok(config) = config else {
            panic!("defaults expected");
        };
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.model.generation.max_output_tokens, 1000);
        assert_eq!(config.model.safety, SafetySetting::default_policy());
        assert_eq!(config.assistant.seed(), SeedPair::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "server": { "port": 8080 }, "sessions": { "idle_ttl_secs": 0 } }"#,
        )
        .unwrap_or_else(|e| panic!("write: {e}"));

        let config = Config::load_from(&path).unwrap_or_else(|e| panic!("load: {e}"));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.sessions.idle_ttl(), None);
        assert_eq!(config.sessions.max_turns(), Some(200));
        assert_eq!(config.sessions.max_chars(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap_or_else(|e| panic!("write: {e}"));

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = Config::default();
        config.providers.gemini.api_key = "from-file".into();

        config.apply_env(env(&[("API_KEY", "from-env"), ("PORT", "4000")]));

        assert_eq!(config.providers.gemini.api_key, "from-env");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn gemini_api_key_is_a_fallback_and_bad_port_is_ignored() {
        let mut config = Config::default();

        config.apply_env(env(&[("GEMINI_API_KEY", "fallback"), ("PORT", "not-a-port")]));

        assert_eq!(config.providers.gemini.api_key, "fallback");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = Config::default();
        assert!(config.require_api_key().is_err());

        let mut config = Config::default();
        config.apply_env(env(&[("API_KEY", "secret")]));
        assert_eq!(config.require_api_key().ok(), Some("secret"));
    }

    #[test]
    fn template_round_trips_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("config.json");

        assert!(Config::write_template(&path).is_ok());
        let loaded = Config::load_from(&path).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(loaded.providers.gemini.api_key, "your-gemini-api-key-here");
        assert_eq!(loaded.sessions.max_sessions(), Some(10_000));

        assert!(Config::write_template(&path).is_err());
    }
}
