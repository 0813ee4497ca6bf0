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

//! Multi-turn conversation support on top of the in-memory session store.
//!
//! # Turn flow
//! 1. Reject blank input with `InvalidInput`
//! 2. Get or create the identity's seeded transcript and lock it
//! 3. Append the user turn
//! 4. Send the whole transcript to the model, bounded by a timeout
//! 5. Append the reply and return it, or return the apology on failure

mod manager;

pub use manager::{ConversationConfig, ConversationError, ConversationManager, TurnResult};
pub use yathra_core::DEFAULT_APOLOGY;
