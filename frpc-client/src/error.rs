use frpc_core::{CodecError, Fault};
use frpc_transport::TransportError;
use thiserror::Error;

/// A proxy could not be constructed from its options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FastRPC is not supported")]
    BinaryNotSupported,

    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid http proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("invalid {name} timeout: {value}")]
    InvalidTimeout { name: &'static str, value: f64 },

    #[error("max_clients must be between 1 and {max}, got {value}")]
    InvalidMaxClients { value: usize, max: usize },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },
}

/// A call was made with arguments the dispatcher does not accept.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),

    #[error("keyword argument 'quiet' must be a bool, got {0}")]
    InvalidQuiet(&'static str),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// The server answered with a fault
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body could not be encoded, or the response could not be decoded
    #[error("codec error: {0}")]
    Codec(CodecError),
}

impl Error {
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::Fault(_))
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Connection, timeout, HTTP status or malformed-body failures
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Codec(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
