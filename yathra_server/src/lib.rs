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

//! HTTP surface of the chat assistant.
//!
//! - `POST /chat` with `{"userInput": "..."}` answers `{"response": "..."}`
//! - `DELETE /chat` forgets the caller's conversation
//! - `GET /health` reports liveness and the number of live sessions
//! - everything else is served from the static directory (`GET /` is the
//!   landing page)

mod error;
mod handlers;
mod server;
mod state;

pub use error::ApiError;
pub use handlers::{ChatRequest, ChatResponse};
pub use server::{build_router, run_server, spawn_session_sweeper};
pub use state::AppState;
