//! Context passed to middleware and to methods that ask for it.
//!
//! A method opts in by declaring `&RequestContext` as its first parameter.
//! The context carries the inbound request headers, the resolved method
//! string, and a typed extension map that middleware can use to hand values
//! (an authenticated user, a tenant id, ...) to the method it guards.
//!
//! ## Example
//!
//! ```ignore
//! #[rpc_service]
//! impl Accounts {
//!     pub fn whoami(&self, ctx: &RequestContext) -> Result<String, ServiceError> {
//!         let user = ctx.get::<User>().ok_or_else(|| ServiceError::token("not signed in"))?;
//!         Ok(user.name.clone())
//!     }
//! }
//! ```

use http::{Extensions, HeaderMap};

/// Request-scoped context for a single JSON-RPC call.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Normalized `namespace.method` once resolved; empty before.
    method: String,
    /// Value of the configured request-id header, if the client sent one.
    request_id: Option<String>,
    /// Inbound HTTP headers.
    headers: HeaderMap,
    /// Typed values attached by the host or by middleware.
    extensions: Extensions,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from inbound request headers and host extensions.
    pub fn from_request(
        headers: HeaderMap,
        extensions: Extensions,
        request_id_header: &str,
    ) -> Self {
        let request_id = headers
            .get(request_id_header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            method: String::new(),
            request_id,
            headers,
            extensions,
        }
    }

    /// The resolved `namespace.method` string.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    /// Request id taken from the configured header.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Attach a typed value, replacing any previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    /// Get a previously attached value.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}
