//! Server configuration.
//!
//! [`ServerOptions`] deserializes with defaults for every field, so a host can
//! embed it in its own config file and set only what it needs:
//!
//! ```ignore
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     rpc: ServerOptions,
//! }
//! ```

use serde::Deserialize;

use crate::naming::NamingConvention;

/// Default request body limit: 5 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for a JSON-RPC POST body.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/json-rpc",
    "application/jsonrequest",
];

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// How namespace and method names are folded.
    pub naming: NamingConvention,
    /// Largest accepted body, in bytes.
    pub max_body_bytes: usize,
    /// Reject bodies whose content type is not a JSON type.
    pub require_json_content_type: bool,
    /// Header carrying the caller's request id, used in the dispatch log.
    pub request_id_header: String,
    /// Put the panic backtrace into the Internal error's `data` member.
    pub expose_backtrace: bool,
    /// Route the HTTP host mounts the endpoint on.
    pub path: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            naming: NamingConvention::Snake,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            require_json_content_type: true,
            request_id_header: "request-id".to_string(),
            expose_backtrace: false,
            path: "/".to_string(),
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_require_json_content_type(mut self, require: bool) -> Self {
        self.require_json_content_type = require;
        self
    }

    pub fn with_request_id_header(mut self, header: impl Into<String>) -> Self {
        self.request_id_header = header.into();
        self
    }

    pub fn with_expose_backtrace(mut self, expose: bool) -> Self {
        self.expose_backtrace = expose;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}
