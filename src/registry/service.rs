//! Service sources: annotated impl blocks and explicit definitions.
//!
//! ## Annotated impl block
//!
//! ```ignore
//! pub struct Accounts { /* ... */ }
//!
//! #[rpc_service]
//! impl Accounts {
//!     pub fn get(&self, id: u64) -> Result<Json<Account>, ServiceError> { /* ... */ }
//!
//!     // Reserved hooks, never exposed.
//!     fn rpc_namespace(&self) -> &'static str { "acct" }
//!     fn excluded_methods(&self) -> Vec<String> { vec!["internal_only".into()] }
//!     fn constructor(&mut self) { /* one-time init */ }
//! }
//! ```
//!
//! ## Explicit definition
//!
//! ```ignore
//! let calc = ServiceDef::new("calc")
//!     .method("add", |a: i64, b: i64| a + b)
//!     .method("div", |a: f64, b: f64| -> Result<f64, ServiceError> {
//!         if b == 0.0 { Err("division by zero".into()) } else { Ok(a / b) }
//!     });
//! server.register_def(calc);
//! ```

use std::sync::Arc;

use crate::plan::{CallablePlan, Handler};

/// Hook names that are never exposed as methods.
pub const RESERVED_METHODS: &[&str] = &["constructor", "excluded_methods", "rpc_namespace"];

/// A type whose methods can be registered under a namespace.
///
/// Implemented by `#[rpc_service]`. Each optional hook has a default that
/// leaves the behavior unchanged.
pub trait RpcService: Send + Sync + 'static {
    /// Type name used to derive the namespace when no other name is given.
    const TYPE_NAME: &'static str;

    /// Namespace the service reports for itself.
    fn namespace(&self) -> Option<String> {
        None
    }

    /// Additional method names to hide.
    fn excluded(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-time initialization, run before the methods are scanned.
    fn initialize(&mut self) {}

    /// One plan per exposed method, each bound to `service`.
    fn methods(service: &Arc<Self>) -> Vec<CallablePlan>
    where
        Self: Sized;
}

/// A service assembled from closures.
#[derive(Debug, Clone)]
pub struct ServiceDef {
    name: String,
    plans: Vec<CallablePlan>,
    excluded: Vec<String>,
}

impl ServiceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plans: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Add a method.
    pub fn method<H, M>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<M>,
    {
        self.plans.push(CallablePlan::analyze(name, handler));
        self
    }

    /// Hide methods by name.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plans(&self) -> &[CallablePlan] {
        &self.plans
    }

    pub(crate) fn into_parts(self) -> (String, Vec<CallablePlan>, Vec<String>) {
        (self.name, self.plans, self.excluded)
    }
}
