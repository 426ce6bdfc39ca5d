//! A calculator service over HTTP.
//!
//! ```text
//! RUST_LOG=namespaced_rpc=debug cargo run --example calculator
//!
//! curl -s localhost:3000/rpc -H 'content-type: application/json' \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"calculator.add","params":[2,3]}'
//! ```

use std::sync::Arc;

use http::StatusCode;
use namespaced_rpc::{rpc_service, RequestContext, Scope, Server, ServerOptions, ServiceError};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
pub struct Calculator;

#[rpc_service]
impl Calculator {
    pub fn add(&self, a: f64, b: f64) -> f64 {
        a + b
    }

    pub fn sub(&self, a: f64, b: f64) -> f64 {
        a - b
    }

    pub fn div(&self, a: f64, b: f64) -> Result<f64, ServiceError> {
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(a / b)
    }

    pub fn whoami(&self, ctx: &RequestContext) -> Option<String> {
        ctx.get::<Caller>().map(|caller| caller.0.clone())
    }
}

#[derive(Clone)]
struct Caller(String);

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut server = Server::new(ServerOptions::default().with_path("/rpc"));
    server.register(Calculator);

    // `calculator.whoami` needs a caller; everything else is open.
    server.add_before_middleware(Scope::include(["calculator.whoami"]), |ctx, _method, exchange| {
        match ctx.header("x-caller").map(str::to_string) {
            Some(caller) => {
                ctx.insert(Caller(caller));
                Ok(())
            }
            None => {
                exchange.abort_with_status(StatusCode::UNAUTHORIZED);
                Err(ServiceError::token("missing x-caller"))
            }
        }
    });

    let addr = std::env::var("RPC_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    tracing::info!(%addr, "calculator listening");
    namespaced_rpc::http::serve(Arc::new(server), &addr).await
}
