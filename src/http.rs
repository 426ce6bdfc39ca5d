//! HTTP host for a [`Server`], built on axum. Requires the `http` feature.
//!
//! The router answers every HTTP method on [`ServerOptions::path`] and hands
//! the buffered request to [`Server::serve`], which does its own method,
//! size and content-type validation.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use namespaced_rpc::{http, Server};
//!
//! let mut server = Server::default();
//! server.register(Calculator::default());
//! let server = Arc::new(server);
//!
//! // Compose with other axum routes
//! let app = http::router(server.clone());
//!
//! // Or serve directly
//! http::serve(server, "0.0.0.0:3000").await?;
//! ```
//!
//! [`ServerOptions::path`]: crate::ServerOptions::path

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tracing::debug;

use crate::server::{Server, DISPATCH_TARGET};

/// Build an axum `Router` that serves JSON-RPC on the configured path.
pub fn router(server: Arc<Server>) -> Router {
    let path = server.options().path.clone();
    // One byte over the limit lets `Server::serve` report 413 itself.
    let limit = server.options().max_body_bytes.saturating_add(1);
    Router::new()
        .route(&path, any(rpc_handler))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(server)
}

/// Serve over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(server: Arc<Server>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    debug!(target: DISPATCH_TARGET, addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await
}

/// Buffer the body, then dispatch synchronously.
async fn rpc_handler(
    State(server): State<Arc<Server>>,
    parts: Parts,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(err))) => {
            debug!(target: DISPATCH_TARGET, error = %err, "request body over the limit");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large\n").into_response();
        }
        Err(rejection) => {
            debug!(target: DISPATCH_TARGET, error = %rejection, "failed to read request body");
            return (StatusCode::BAD_REQUEST, "failed to read request body\n").into_response();
        }
    };

    let response = server.serve(axum::http::Request::from_parts(parts, bytes));
    response.map(Body::from).into_response()
}
