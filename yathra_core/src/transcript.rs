//! Per-identity dialogue transcripts.
//!
//! A transcript always starts with the seed pair (persona priming turn,
//! then the assistant greeting) and only ever grows by appending.

use chrono::{DateTime, Utc};

use crate::{Role, Turn};

pub const DEFAULT_PERSONA: &str = "You are Yathra, an AI travel guide. Help users with trip planning, \
itineraries, accommodations, food recommendations, and travel tips.";

pub const DEFAULT_GREETING: &str =
    "Hello! I'm Yathra, your friendly AI travel guide. Where are you planning to travel?";

/// The fixed persona/greeting pair inserted once per new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPair {
    pub persona: String,
    pub greeting: String,
}

impl SeedPair {
    #[must_use]
    pub fn new(persona: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            greeting: greeting.into(),
        }
    }

    #[must_use]
    pub fn turns(&self) -> [Turn; 2] {
        [
            Turn::system(self.persona.clone()),
            Turn::assistant(self.greeting.clone()),
        ]
    }
}

impl Default for SeedPair {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA, DEFAULT_GREETING)
    }
}

/// Ordered history of turns owned by one identity.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Number of leading turns that make up the seed pair.
    pub const SEED_LEN: usize = 2;

    #[must_use]
    pub fn seeded(seed: &SeedPair) -> Self {
        let now = Utc::now();
        Self {
            turns: seed.turns().to_vec(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns appended after the seed pair.
    #[must_use]
    pub fn dialogue(&self) -> &[Turn] {
        self.turns.get(Self::SEED_LEN..).unwrap_or_default()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Count of completed user turns, i.e. the current turn number.
    #[must_use]
    pub fn user_turns(&self) -> usize {
        self.dialogue()
            .iter()
            .filter(|t| t.role() == Role::User)
            .count()
    }

    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.turns.iter().map(|t| t.text().len()).sum()
    }

    /// Drop `count` turns right after the seed pair.
    pub fn drop_oldest(&mut self, count: usize) {
        let end = (Self::SEED_LEN + count).min(self.turns.len());
        if end > Self::SEED_LEN {
            self.turns.drain(Self::SEED_LEN..end);
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_transcript_starts_with_persona_then_greeting() {
        let transcript = Transcript::seeded(&SeedPair::default());

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.turns()[0].role(), Role::System);
        assert_eq!(transcript.turns()[0].text(), DEFAULT_PERSONA);
        assert_eq!(transcript.turns()[1].role(), Role::Assistant);
        assert_eq!(transcript.turns()[1].text(), DEFAULT_GREETING);
        assert!(transcript.dialogue().is_empty());
    }

    #[test]
    fn drop_oldest_keeps_seed_pair() {
        let mut transcript = Transcript::seeded(&SeedPair::new("persona", "greeting"));
        for i in 0..3 {
            transcript.push(Turn::user(format!("q{i}")));
            transcript.push(Turn::assistant(format!("a{i}")));
        }

        transcript.drop_oldest(2);

        assert_eq!(transcript.len(), 6);
        assert_eq!(transcript.turns()[0].text(), "persona");
        assert_eq!(transcript.turns()[1].text(), "greeting");
        assert_eq!(transcript.turns()[2].text(), "q1");
        assert_eq!(transcript.user_turns(), 2);
    }

    #[test]
    fn drop_oldest_past_end_leaves_only_seed() {
        let mut transcript = Transcript::seeded(&SeedPair::default());
        transcript.push(Turn::user("only"));

        transcript.drop_oldest(10);

        assert_eq!(transcript.len(), Transcript::SEED_LEN);
    }
}
