use thiserror::Error;

#[derive(Error, Debug)]
pub enum XgError {
    #[error("login to {gateway} failed: {reason}")]
    LoginFailed { gateway: String, reason: String },

    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("malformed gateway response: {0}")]
    Protocol(String),

    #[error("session to {0} is closed")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, XgError>;
