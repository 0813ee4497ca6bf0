use yathra_config::Config;

/// Strategy for displaying configuration information.
///
/// Prints the effective configuration with the API key masked.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== yathra Configuration ===\n");

        println!("API Key:");
        println!("  Gemini: {}", mask_key(&config.providers.gemini.api_key));
        if let Some(ref base_url) = config.providers.gemini.base_url {
            println!("  Base URL: {base_url}");
        }
        println!();

        println!("Server:");
        println!("  Listen: {}:{}", config.server.host, config.server.port);
        println!("  Static Dir: {}", config.server.static_dir.display());
        println!();

        println!("Model:");
        println!("  Name: {}", config.model.name);
        let generation = &config.model.generation;
        println!("  Max Output Tokens: {}", generation.max_output_tokens);
        println!("  Temperature: {}", generation.temperature);
        println!("  Top P: {}", generation.top_p);
        println!("  Top K: {}", generation.top_k);
        println!("  Timeout: {}s", config.model.timeout_secs);
        for setting in &config.model.safety {
            println!("  Safety: {:?} >= {:?}", setting.category, setting.threshold);
        }
        println!();

        println!("Assistant:");
        println!("  Persona: {}", truncate(&config.assistant.persona, 60));
        println!("  Greeting: {}", truncate(&config.assistant.greeting, 60));
        println!();

        println!("Sessions:");
        println!("  Max Sessions: {}", limit(config.sessions.max_sessions()));
        println!(
            "  Idle TTL: {}",
            config
                .sessions
                .idle_ttl()
                .map_or_else(|| "disabled".to_string(), |d| format!("{}s", d.as_secs()))
        );
        println!("  Max Turns: {}", limit(config.sessions.max_turns()));
        println!("  Max Chars: {}", limit(config.sessions.max_chars()));

        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else if key.len() > 8 && key.is_ascii() {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    } else {
        "***".to_string()
    }
}

fn limit(value: Option<usize>) -> String {
    value.map_or_else(|| "unlimited".to_string(), |v| v.to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    }
}
