//! Sliding window over stored transcripts.
//!
//! The window trims the oldest dialogue turns once a transcript grows past
//! its limits. The seed pair is never trimmed.

use yathra_core::{Role, Transcript, Turn};

/// Limits applied to every stored transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum turns kept, seed pair included. `None` keeps everything.
    pub max_turns: Option<usize>,
    /// Maximum characters kept (approximate token limit). `None` disables.
    pub max_chars: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: Some(200),
            max_chars: None,
        }
    }
}

impl HistoryConfig {
    /// No trimming at all.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_turns: None,
            max_chars: None,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }
}

/// Applies [`HistoryConfig`] to transcripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryWindow {
    config: HistoryConfig,
}

impl HistoryWindow {
    /// Smallest useful window: seed pair plus one user/assistant pair.
    const MIN_TURNS: usize = Transcript::SEED_LEN + 2;

    #[must_use]
    pub const fn with_config(config: HistoryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Trim `transcript` in place, returning how many turns were dropped.
    ///
    /// Cuts only land right before a user turn, so a user turn is never
    /// separated from the reply that follows it, even when a failed
    /// exchange left a user turn without one. The newest user turn and
    /// anything after it always survive, whatever their size.
    pub fn apply(&self, transcript: &mut Transcript) -> usize {
        let mut dropped = 0;

        if let Some(max_turns) = self.config.max_turns {
            let keep = max_turns.max(Self::MIN_TURNS) - Transcript::SEED_LEN;
            let dialogue = transcript.dialogue();
            let needed = dialogue.len().saturating_sub(keep);
            if needed > 0 {
                let cut = cut_points(dialogue)
                    .find(|&cut| cut >= needed)
                    .or_else(|| cut_points(dialogue).last());
                if let Some(cut) = cut {
                    transcript.drop_oldest(cut);
                    dropped += cut;
                }
            }
        }

        if let Some(max_chars) = self.config.max_chars {
            while transcript.total_chars() > max_chars {
                let Some(cut) = cut_points(transcript.dialogue()).next() else {
                    break;
                };
                transcript.drop_oldest(cut);
                dropped += cut;
            }
        }

        dropped
    }
}

/// Dialogue offsets where a cut keeps exchanges whole: every user turn
/// except one at the very front.
fn cut_points(dialogue: &[Turn]) -> impl Iterator<Item = usize> + '_ {
    dialogue
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, turn)| turn.role() == Role::User)
        .map(|(i, _)| i)
}
