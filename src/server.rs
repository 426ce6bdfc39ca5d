//! The dispatcher.
//!
//! [`Server`] owns the registry, the middleware chain and the options. A
//! request goes through these stages, in order:
//!
//! 1. health probe (`GET`, empty body, no query): answered `200` and empty;
//! 2. stopped servers answer `503`;
//! 3. transport validation: `405`, `413` or `415` in plain text;
//! 4. envelope decode (`-32700`), id check (`-32600`), method split and
//!    lookup (`-32601`);
//! 5. middleware, then bind and invoke, all inside the panic guard;
//! 6. the envelope is written once, with status `200`, unless middleware
//!    already wrote a response.
//!
//! Dispatch is synchronous and takes `&self`, so one `Server` behind an `Arc`
//! serves any number of concurrent requests.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::request::Parts;
use http::{Method, Request, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::context::RequestContext;
use crate::envelope::RpcMessage;
use crate::error::{RpcError, ServiceError};
use crate::exchange::{Exchange, JSON_CONTENT_TYPE};
use crate::middleware::{MiddlewareChain, Scope};
use crate::naming::METHOD_SEPARATOR;
use crate::options::{ServerOptions, ACCEPTED_CONTENT_TYPES};
use crate::plan::is_empty_result;
use crate::recovery::{self, Crashed};
use crate::registry::{Registration, Registry, RegistryError, RpcApp, RpcService, ServiceDef};

/// Tracing target for request dispatch.
pub const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A JSON-RPC 2.0 server.
#[derive(Debug)]
pub struct Server {
    options: ServerOptions,
    registry: Registry,
    middleware: MiddlewareChain,
    running: AtomicBool,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerOptions::default())
    }
}

impl Server {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            registry: Registry::new(options.naming),
            middleware: MiddlewareChain::new(),
            running: AtomicBool::new(true),
            options,
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `service` under its own or its type-derived namespace.
    ///
    /// # Panics
    ///
    /// On a duplicate or invalid namespace. Use [`Server::try_register`] to
    /// handle that as an error.
    pub fn register<S: RpcService>(&mut self, service: S) {
        if let Err(err) = self.try_register(service) {
            panic!("{err}");
        }
    }

    /// Register `service` under `name`.
    ///
    /// # Panics
    ///
    /// On a duplicate or invalid namespace.
    pub fn register_named<S: RpcService>(&mut self, service: S, name: &str) {
        if let Err(err) = self.try_register_named(service, name) {
            panic!("{err}");
        }
    }

    pub fn try_register<S: RpcService>(&mut self, service: S) -> Result<(), RegistryError> {
        self.register_service(service, None)
    }

    pub fn try_register_named<S: RpcService>(
        &mut self,
        service: S,
        name: &str,
    ) -> Result<(), RegistryError> {
        self.register_service(service, Some(name))
    }

    /// Register a closure-based service.
    ///
    /// # Panics
    ///
    /// On a duplicate or invalid namespace.
    pub fn register_def(&mut self, def: ServiceDef) {
        if let Err(err) = self.try_register_def(def) {
            panic!("{err}");
        }
    }

    pub fn try_register_def(&mut self, def: ServiceDef) -> Result<(), RegistryError> {
        let (name, plans, excluded) = def.into_parts();
        self.registry
            .add(Registration {
                name,
                type_name: "ServiceDef",
                instance: None,
                plans,
                excluded,
            })
            .map(|_| ())
    }

    /// Install the app's global excludes, if it has any, then register its
    /// services.
    ///
    /// # Panics
    ///
    /// On a duplicate or invalid namespace.
    pub fn register_app<A: RpcApp>(&mut self, app: A) {
        if let Err(err) = self.try_register_app(app) {
            panic!("{err}");
        }
    }

    pub fn try_register_app<A: RpcApp>(&mut self, app: A) -> Result<(), RegistryError> {
        // An app without excludes leaves the installed list alone.
        let excludes = app.excluded_methods();
        if !excludes.is_empty() {
            self.registry.set_global_excludes(excludes);
        }
        app.register_services(self)
    }

    fn register_service<S: RpcService>(
        &mut self,
        mut service: S,
        explicit: Option<&str>,
    ) -> Result<(), RegistryError> {
        let name = explicit
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| service.namespace())
            .unwrap_or_else(|| S::TYPE_NAME.to_string());

        service.initialize();
        let excluded = service.excluded();
        let service = Arc::new(service);
        let plans = S::methods(&service);
        let instance: Arc<dyn Any + Send + Sync> = service;

        self.registry
            .add(Registration {
                name,
                type_name: S::TYPE_NAME,
                instance: Some(instance),
                plans,
                excluded,
            })
            .map(|_| ())
    }

    /// Append a before-middleware. Patterns are compiled now.
    pub fn add_before_middleware<F>(&mut self, scope: Scope, handler: F)
    where
        F: Fn(&mut RequestContext, &str, &mut Exchange) -> Result<(), ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.middleware.add(scope, self.options.naming, handler);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Refuse all further requests with `503`.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(target: DISPATCH_TARGET, "RPC server shutting down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Serve one HTTP request end to end.
    pub fn serve(&self, request: Request<Bytes>) -> Response<Bytes> {
        let (mut parts, body) = request.into_parts();

        if is_health_probe(&parts, &body) {
            return Response::new(Bytes::new());
        }
        if !self.is_running() {
            return plain_response(StatusCode::SERVICE_UNAVAILABLE, "server is stopped");
        }
        if let Err((status, message)) = self.validate(&parts, body.len()) {
            debug!(target: DISPATCH_TARGET, %status, %message, "request rejected");
            return plain_response(status, &message);
        }

        let ctx = RequestContext::from_request(
            parts.headers.clone(),
            std::mem::take(&mut parts.extensions),
            &self.options.request_id_header,
        );
        let request_id = ctx.request_id().map(str::to_string);

        let mut exchange = Exchange::new(parts);
        exchange
            .headers_mut()
            .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        let message = self.handle(ctx, &mut exchange, &body);
        match serde_json::to_vec(&message) {
            Ok(encoded) => {
                exchange.write(StatusCode::OK, Some(JSON_CONTENT_TYPE), Bytes::from(encoded));
            }
            Err(err) => {
                exchange.abort_with_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    TEXT_CONTENT_TYPE,
                    err.to_string(),
                );
            }
        }

        debug!(
            target: DISPATCH_TARGET,
            request_id = request_id.as_deref().unwrap_or("-"),
            response = %serde_json::to_string(&message).unwrap_or_default(),
            "request served"
        );
        exchange.into_response()
    }

    /// Run the protocol over an already validated body and return the
    /// finished response envelope.
    ///
    /// Middleware may write to `exchange` directly. The caller decides
    /// whether the envelope still needs writing via
    /// [`Exchange::status_written`].
    pub fn handle(&self, mut ctx: RequestContext, exchange: &mut Exchange, body: &[u8]) -> RpcMessage {
        let mut message = RpcMessage::default();
        if let Err(err) = self.dispatch(&mut ctx, exchange, body, &mut message) {
            message.set_error(err);
        }
        message.finish();
        message
    }

    fn dispatch(
        &self,
        ctx: &mut RequestContext,
        exchange: &mut Exchange,
        body: &[u8],
        message: &mut RpcMessage,
    ) -> Result<(), ServiceError> {
        *message = serde_json::from_slice(body).map_err(|err| RpcError::parse(err.to_string()))?;

        if !message.has_valid_id() {
            return Err(RpcError::invalid_request("id is invalid").into());
        }

        let naming = self.options.naming;
        let (namespace, method) = {
            let (namespace, method) = message.split_method()?;
            (naming.apply(namespace), naming.apply(method))
        };
        message.method = format!("{namespace}{METHOD_SEPARATOR}{method}");
        ctx.set_method(&message.method);

        let plan = self.registry.resolve(&namespace, &method)?;
        let params = message.params.take();
        let path = message.method.as_str();

        let outcome = recovery::guard(|| -> Result<Option<Value>, ServiceError> {
            self.middleware.run(ctx, path, exchange)?;
            Ok(plan.call(ctx, params)?)
        });

        match outcome {
            Ok(Ok(Some(value))) if !is_empty_result(&value) => {
                message.result = Some(value);
                Ok(())
            }
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(crashed) => Err(self.crash_error(plan.method_name(), crashed).into()),
        }
    }

    fn crash_error(&self, method: &str, crashed: Crashed) -> RpcError {
        let message = format!("RPC method {method} handler crashed: {}", crashed.message);
        error!(target: DISPATCH_TARGET, "{message}\n{}", crashed.backtrace);

        let err = RpcError::internal(message);
        if self.options.expose_backtrace {
            err.with_data(Value::String(crashed.backtrace))
        } else {
            err
        }
    }

    fn validate(&self, parts: &Parts, body_len: usize) -> Result<(), (StatusCode, String)> {
        if parts.method == Method::PUT || parts.method == Method::DELETE {
            return Err((StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string()));
        }

        let declared_len = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let len = declared_len.max(body_len);
        let limit = self.options.max_body_bytes;
        if len > limit {
            return Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("content length too large ({len}>{limit})"),
            ));
        }

        if parts.method == Method::OPTIONS || !self.options.require_json_content_type {
            return Ok(());
        }
        let media_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if ACCEPTED_CONTENT_TYPES.contains(&media_type.as_str()) {
            Ok(())
        } else {
            Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "invalid content type, only {} is supported",
                    ACCEPTED_CONTENT_TYPES[0]
                ),
            ))
        }
    }
}

fn is_health_probe(parts: &Parts, body: &Bytes) -> bool {
    parts.method == Method::GET
        && body.is_empty()
        && parts.uri.query().map_or(true, str::is_empty)
}

fn plain_response(status: StatusCode, message: &str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(format!("{message}\n")));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
