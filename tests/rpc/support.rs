//! Test services and request helpers.

#![allow(dead_code)]

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use namespaced_rpc::{
    rpc_service, ErrorCode, Json, RequestContext, RpcApp, RpcError, Server, ServiceError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Authenticated caller, attached by middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct User(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

// ============================================================================
// Calculator: exercises every return shape
// ============================================================================

#[derive(Default)]
pub struct Calculator;

#[rpc_service]
impl Calculator {
    pub fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    pub fn div(&self, a: f64, b: f64) -> Result<f64, ServiceError> {
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(a / b)
    }

    pub fn zero(&self) -> i64 {
        0
    }

    pub fn empty_list(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn greet(&self, name: String, suffix: Option<String>) -> String {
        format!("hello {name}{}", suffix.unwrap_or_default())
    }

    pub fn point(&self, x: i32, y: i32) -> Json<Point> {
        Json(Point { x, y })
    }

    pub fn origin(&self) -> Point {
        Point { x: 0, y: 0 }
    }

    pub fn ping(&self) {}

    pub fn crash(&self) -> u8 {
        panic!("calculator exploded")
    }

    pub fn whoami(&self, ctx: &RequestContext) -> Result<String, ServiceError> {
        ctx.get::<User>()
            .map(|user| user.0.clone())
            .ok_or_else(|| ServiceError::token("not signed in"))
    }

    pub fn method_name(&self, ctx: &RequestContext) -> String {
        ctx.method().to_string()
    }

    pub fn deny(&self) -> Result<(), ServiceError> {
        Err(ServiceError::forbidden("denied"))
    }

    pub fn custom(&self) -> Result<(), RpcError> {
        Err(RpcError::new(ErrorCode(-1), "custom failure").with_data(json!({ "retry": false })))
    }

    // Never exposed.

    #[allow(dead_code)]
    fn private_helper(&self) -> u8 {
        1
    }

    pub fn reset(&mut self) {}

    pub async fn later(&self) -> u8 {
        1
    }

    pub fn generic<T: Default>(&self) -> u8 {
        1
    }

    pub fn borrowed(&self, s: &str) -> usize {
        s.len()
    }

    pub fn label(&self) -> &str {
        "calc"
    }

    pub fn pair(&self) -> (i32, i32) {
        (1, 2)
    }

    #[rpc(skip)]
    pub fn skipped(&self) -> u8 {
        1
    }
}

// ============================================================================
// UserService: registration hooks
// ============================================================================

#[derive(Default)]
pub struct UserService {
    init_count: usize,
}

#[rpc_service]
impl UserService {
    #[allow(non_snake_case)]
    pub fn GetName(&self) -> &'static str {
        "ada"
    }

    pub fn init_count(&self) -> usize {
        self.init_count
    }

    pub fn secret(&self) -> &'static str {
        "hunter2"
    }

    #[rpc(name = "lookup")]
    pub fn find_by_email(&self, email: String) -> String {
        email.split('@').next().unwrap_or_default().to_string()
    }

    fn excluded_methods(&self) -> Vec<&'static str> {
        vec!["secret"]
    }

    fn constructor(&mut self) {
        self.init_count += 1;
    }
}

// ============================================================================
// Accounts: names itself
// ============================================================================

#[derive(Default)]
pub struct Accounts;

#[rpc_service]
impl Accounts {
    pub fn balance(&self, account: String) -> Result<u64, ServiceError> {
        match account.as_str() {
            "alice" => Ok(100),
            _ => Err(ServiceError::forbidden("not your account")),
        }
    }

    fn rpc_namespace(&self) -> &'static str {
        "acct"
    }
}

// ============================================================================
// Hollow: nothing to expose
// ============================================================================

pub struct Hollow;

#[rpc_service]
impl Hollow {
    #[allow(dead_code)]
    fn hidden(&self) -> u8 {
        1
    }
}

// ============================================================================
// App container
// ============================================================================

#[derive(RpcApp)]
#[rpc_app(exclude("ping"))]
pub struct App {
    #[rpc]
    pub calc: Calculator,
    #[rpc(name = "ledger")]
    pub accounts: Accounts,
    pub label: String,
}

// ============================================================================
// Helpers
// ============================================================================

pub fn server() -> Server {
    let mut server = Server::default();
    server.register(Calculator);
    server
}

pub fn post(body: impl Into<Bytes>) -> Request<Bytes> {
    Request::post("/")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

pub fn body_json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

/// Send a raw envelope and decode the response envelope.
pub fn send(server: &Server, envelope: Value) -> Value {
    body_json(&server.serve(post(envelope.to_string())))
}

/// Call `method` with `params` and id 1.
pub fn call(server: &Server, method: &str, params: Value) -> Value {
    send(
        server,
        json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params }),
    )
}

/// A container without excludes.
#[derive(RpcApp)]
pub struct Directory {
    #[rpc]
    pub users: UserService,
}
