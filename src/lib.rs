//! namespaced_rpc: JSON-RPC 2.0 over HTTP with namespaced services.
//!
//! Services are registered under a namespace and called as
//! `"namespace.method"` with positional `params`. Arguments are bound from
//! JSON into the method's declared Rust types, and the return value (or
//! error) is written back in a single response envelope.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use namespaced_rpc::{rpc_service, Server, ServiceError};
//!
//! #[derive(Default)]
//! pub struct Calculator;
//!
//! #[rpc_service]
//! impl Calculator {
//!     pub fn add(&self, a: i64, b: i64) -> i64 {
//!         a + b
//!     }
//!
//!     pub fn div(&self, a: f64, b: f64) -> Result<f64, ServiceError> {
//!         if b == 0.0 {
//!             return Err("division by zero".into());
//!         }
//!         Ok(a / b)
//!     }
//! }
//!
//! let mut server = Server::default();
//! server.register(Calculator);
//!
//! // {"jsonrpc":"2.0","id":1,"method":"calculator.add","params":[2,3]}
//! // -> {"id":1,"jsonrpc":"2.0","result":5}
//! namespaced_rpc::http::serve(Arc::new(server), "0.0.0.0:3000").await?;
//! ```

extern crate self as namespaced_rpc;

mod binder;
mod context;
mod envelope;
mod error;
mod exchange;
mod middleware;
mod naming;
mod options;
mod plan;
mod recovery;
mod registry;
mod server;

#[cfg(feature = "http")]
pub mod http;

pub use binder::{BindError, PositionalArgs};
pub use context::RequestContext;
pub use envelope::{RpcMessage, JSONRPC_VERSION};
pub use error::{ErrorCode, RpcError, ServiceError};
pub use exchange::{Exchange, JSON_CONTENT_TYPE};
pub use middleware::{MiddlewareChain, MiddlewareFn, Pattern, Scope};
pub use naming::{snake_case, NamingConvention, METHOD_SEPARATOR};
pub use options::{ServerOptions, ACCEPTED_CONTENT_TYPES, DEFAULT_MAX_BODY_BYTES};
pub use plan::{CallablePlan, Handler, IntoOutcome, Json, Plain, WithContext};
pub use recovery::{guard, Crashed};
pub use registry::{
    Registry, RegistryError, RpcApp, RpcService, ServiceDef, ServiceEntry, RESERVED_METHODS,
};
pub use server::{Server, DISPATCH_TARGET};

pub use namespaced_rpc_macros::{rpc_service, RpcApp};
