//! The JSON-RPC 2.0 envelope.
//!
//! One type, [`RpcMessage`], is used for both directions. The fields present
//! decide whether it is a request, a success response or an error response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{RpcError, ServiceError};
use crate::naming::METHOD_SEPARATOR;

/// Protocol version stamped on every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request or response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    /// `None` when the member is absent. A present `null` is `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcMessage {
    /// Build a request envelope.
    pub fn request(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: method.into(),
            params: Some(params),
            ..Self::default()
        }
    }

    /// An id is valid when present and not an object or array. A `null` id
    /// is accepted and echoed back.
    pub fn has_valid_id(&self) -> bool {
        matches!(
            self.id,
            Some(Value::Null | Value::Number(_) | Value::String(_) | Value::Bool(_))
        )
    }

    /// Split `method` at the first separator into `(namespace, method)`.
    pub fn split_method(&self) -> Result<(&str, &str), RpcError> {
        self.method
            .split_once(METHOD_SEPARATOR)
            .ok_or_else(|| RpcError::method_not_found("wrong method"))
    }

    /// Record `err` as the response error, mapped through the service error
    /// taxonomy.
    pub fn set_error(&mut self, err: impl Into<ServiceError>) -> &mut Self {
        self.error = Some(err.into().into_rpc_error());
        self
    }

    /// Shape the message for output. A missing id becomes `1`, the version is
    /// stamped, and the request-only members are cleared.
    pub fn finish(&mut self) -> &mut Self {
        if self.id.is_none() {
            self.id = Some(Value::from(1));
        }
        self.jsonrpc = Some(JSONRPC_VERSION.to_string());
        self.method.clear();
        self.params = None;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
