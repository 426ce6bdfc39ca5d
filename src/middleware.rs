//! Before-middleware with include/exclude scoping.
//!
//! Each middleware has a [`Scope`]. For a resolved `namespace.method` path:
//!
//! - a scope with no patterns at all fires for every method;
//! - otherwise it fires only when an include pattern matches and no exclude
//!   pattern does.
//!
//! Excludes narrow includes. A scope holding excludes alone never fires; use
//! `Scope::include(["^.*$"]).exclude(..)` for "every method except".
//!
//! A pattern matches when it equals the path, equals the path's normalized
//! form, or (if it compiles) the regex matches the path.
//!
//! ## Example
//!
//! ```ignore
//! server.add_before_middleware(
//!     Scope::include(["^.*$"]).exclude(["auth\\..*"]),
//!     |ctx, _method, exchange| {
//!         if ctx.header("authorization").is_none() {
//!             exchange.abort_with_status(StatusCode::UNAUTHORIZED);
//!             return Err(ServiceError::token("missing token"));
//!         }
//!         Ok(())
//!     },
//! );
//! ```

use std::fmt;

use regex::Regex;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::error::ServiceError;
use crate::exchange::Exchange;
use crate::naming::NamingConvention;

const MIDDLEWARE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::middleware");

/// Middleware callable. Receives the context, the resolved method path and the
/// exchange. Returning an error aborts the request.
pub type MiddlewareFn =
    dyn Fn(&mut RequestContext, &str, &mut Exchange) -> Result<(), ServiceError> + Send + Sync;

/// Which methods a middleware applies to.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Scope {
    /// Fire for every method.
    pub fn all() -> Self {
        Self::default()
    }

    /// Fire only for methods matching one of `patterns`.
    pub fn include<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: patterns.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    /// Never fire for methods matching one of `patterns`.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn is_all(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// A compiled method pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    normalized: String,
    regex: Option<Regex>,
}

impl Pattern {
    /// Compile `raw`. Regex compilation failure is logged and leaves only the
    /// literal comparisons active.
    pub fn compile(raw: &str, naming: NamingConvention) -> Self {
        let regex = match Regex::new(raw) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!(target: MIDDLEWARE_TARGET, pattern = raw, error = %err, "pattern is not a valid regex, matching literally");
                None
            }
        };
        Self {
            raw: raw.to_string(),
            normalized: naming.apply_path(raw),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this pattern selects `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.raw == path
            || self.normalized == path
            || self.regex.as_ref().is_some_and(|re| re.is_match(path))
    }
}

/// A [`Scope`] with its patterns compiled.
#[derive(Debug, Clone)]
struct CompiledScope {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl CompiledScope {
    fn new(scope: Scope, naming: NamingConvention) -> Self {
        let compile = |patterns: Vec<String>| {
            patterns
                .iter()
                .map(|p| Pattern::compile(p, naming))
                .collect::<Vec<_>>()
        };
        Self {
            include: compile(scope.include),
            exclude: compile(scope.exclude),
        }
    }

    fn applies_to(&self, path: &str) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }
        self.include.iter().any(|p| p.matches(path))
            && !self.exclude.iter().any(|p| p.matches(path))
    }
}

struct Middleware {
    scope: CompiledScope,
    handler: Box<MiddlewareFn>,
}

/// Ordered list of before-middleware.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: Vec<Middleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Its patterns are compiled now, using `naming` for
    /// the normalized comparison.
    pub fn add<F>(&mut self, scope: Scope, naming: NamingConvention, handler: F)
    where
        F: Fn(&mut RequestContext, &str, &mut Exchange) -> Result<(), ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.entries.push(Middleware {
            scope: CompiledScope::new(scope, naming),
            handler: Box::new(handler),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every applicable middleware in registration order. Stops at the
    /// first error.
    pub fn run(
        &self,
        ctx: &mut RequestContext,
        method: &str,
        exchange: &mut Exchange,
    ) -> Result<(), ServiceError> {
        for (index, mw) in self.entries.iter().enumerate() {
            if !mw.scope.applies_to(method) {
                continue;
            }
            debug!(target: MIDDLEWARE_TARGET, index, method, "running middleware");
            (mw.handler)(ctx, method, exchange)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.entries.len())
            .finish()
    }
}
