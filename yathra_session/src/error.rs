use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session for identity: {0}")]
    UnknownIdentity(String),
}
