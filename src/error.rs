//! Error taxonomy for the JSON-RPC envelope.
//!
//! Two layers:
//!
//! - [`RpcError`] is the wire object written into a response's `error` member.
//! - [`ServiceError`] is what services and middleware raise. It is mapped onto an
//!   [`RpcError`] at the dispatch boundary via [`ServiceError::into_rpc_error`].

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A JSON-RPC error code.
///
/// Kept open (a transparent `i32`) so services can raise application codes of
/// their own through [`RpcError::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// Body is not valid JSON (or not an envelope object).
    pub const PARSE: Self = Self(-32700);
    /// The envelope is structurally invalid (bad `id`).
    pub const INVALID_REQUEST: Self = Self(-32600);
    /// Unknown namespace or method.
    pub const METHOD_NOT_FOUND: Self = Self(-32601);
    /// Positional argument binding failed.
    pub const INVALID_PARAMS: Self = Self(-32602);
    /// A panic was recovered while serving the call.
    pub const INTERNAL: Self = Self(-32603);
    /// Any application error without a more specific mapping.
    pub const SERVER: Self = Self(-32000);
    /// Raised from [`ServiceError::Token`].
    pub const AUTHORIZATION: Self = Self(401);
    /// Raised from [`ServiceError::Forbidden`].
    pub const FORBIDDEN: Self = Self(403);

    /// The raw integer code.
    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error with no `data` member.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` member.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PARSE, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_REQUEST, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SERVER, message)
    }
}

/// Error raised by a registered method or a middleware handler.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A fully formed wire error, passed through verbatim.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// Missing or invalid credentials. Maps to code 401.
    #[error("{0}")]
    Token(String),
    /// Authenticated but not allowed. Maps to code 403.
    #[error("{0}")]
    Forbidden(String),
    /// Anything else. Maps to code -32000 with the error's display text.
    #[error("{0}")]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ServiceError {
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Wrap an arbitrary error (or message) as a server error.
    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Map this error onto the wire taxonomy.
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            ServiceError::Rpc(e) => e,
            ServiceError::Token(msg) => RpcError::new(ErrorCode::AUTHORIZATION, msg),
            ServiceError::Forbidden(msg) => RpcError::new(ErrorCode::FORBIDDEN, msg),
            ServiceError::Other(e) => RpcError::server(e.to_string()),
        }
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        ServiceError::Other(message.into())
    }
}

impl From<&str> for ServiceError {
    fn from(message: &str) -> Self {
        ServiceError::Other(message.into())
    }
}

impl From<Box<dyn StdError + Send + Sync>> for ServiceError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        ServiceError::Other(err)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Other(Box::new(err))
    }
}

impl From<ServiceError> for RpcError {
    fn from(err: ServiceError) -> Self {
        err.into_rpc_error()
    }
}
