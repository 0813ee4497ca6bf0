//! Terminal conversation against the same manager the HTTP server uses.

use std::io::Write;
use tracing::{debug, info};
use yathra_config::Config;
use yathra_core::Transcript;

use super::build_manager;

/// Identity used for terminal conversations.
const CLI_IDENTITY: &str = "cli:local";

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
}

/// Strategy for executing the Chat command.
///
/// With `--message` a single turn is printed; otherwise a read-eval loop
/// keeps the conversation going until `exit`.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let manager = build_manager(&config)?;

        if let Some(msg) = input.message {
            let result = manager.handle_turn(CLI_IDENTITY, &msg).await?;
            println!("{}", result.response);
            info!("Turn {} completed.", result.turn_number);
            return Ok(());
        }

        println!("{}", config.assistant.greeting);
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();

            if matches!(line, "exit" | "quit" | "q") {
                break;
            }
            if line.is_empty() {
                continue;
            }

            match manager.handle_turn(CLI_IDENTITY, line).await {
                Ok(result) => {
                    println!("\n{}\n", result.response);
                    if let Some(usage) = result.usage {
                        debug!(
                            "Tokens: {} prompt + {} completion = {} total",
                            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                        );
                    }
                }
                Err(e) => eprintln!("Error: {e}"),
            }
        }

        let turns = manager
            .transcript(CLI_IDENTITY)
            .await
            .as_ref()
            .map_or(0, Transcript::user_turns);
        println!("\nSession ended. Total turns: {turns}");
        Ok(())
    }
}
