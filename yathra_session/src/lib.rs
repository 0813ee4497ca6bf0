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

//! Process-scoped, in-memory conversation state.
//!
//! The store maps an opaque identity string to that identity's transcript.
//! It is created at startup, swept for idle identities while the process
//! runs, and dropped (or cleared) on shutdown. Nothing is persisted.
//!
//! `append` on an identity that was never initialized fails with
//! [`SessionError::UnknownIdentity`]; call [`SessionStore::get_or_init`]
//! first.

mod error;
mod history;
mod store;

pub use error::SessionError;
pub use history::{HistoryConfig, HistoryWindow};
pub use store::{SessionHandle, SessionStore, StoreConfig};
