//! End-to-end dispatch through `Server::serve`.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::StatusCode;
use namespaced_rpc::{ErrorCode, JSON_CONTENT_TYPE};
use rstest::rstest;
use serde_json::{json, Value};

use crate::support::{body_json, call, post, send, server};

#[test]
fn round_trip() {
    let response = server().serve(post(
        json!({ "jsonrpc": "2.0", "id": 1, "method": "calculator.add", "params": [2, 3] })
            .to_string(),
    ));

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
    assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_json(&response), json!({ "jsonrpc": "2.0", "id": 1, "result": 5 }));
}

#[rstest]
#[case::number(json!(42))]
#[case::string(json!("req-7"))]
#[case::boolean(json!(true))]
fn scalar_ids_are_echoed(#[case] id: Value) {
    let body = send(
        &server(),
        json!({ "jsonrpc": "2.0", "id": id, "method": "calculator.add", "params": [1, 1] }),
    );
    assert_eq!(body["id"], id);
    assert_eq!(body["result"], json!(2));
}

#[rstest]
#[case::object(json!({ "id": { "a": 1 }, "method": "calculator.add", "params": [1, 1] }))]
#[case::array(json!({ "id": [1], "method": "calculator.add", "params": [1, 1] }))]
#[case::missing(json!({ "method": "calculator.add", "params": [1, 1] }))]
fn invalid_ids_are_rejected(#[case] envelope: Value) {
    let body = send(&server(), envelope);
    assert_eq!(body["error"]["code"], json!(ErrorCode::INVALID_REQUEST.code()));
    assert!(body.get("result").is_none());
}

#[test]
fn null_id_is_accepted_and_echoed() {
    let body = send(
        &server(),
        json!({ "id": null, "method": "calculator.add", "params": [1, 2] }),
    );
    assert_eq!(body["result"], json!(3));
    assert!(body.as_object().unwrap().contains_key("id"));
    assert_eq!(body["id"], Value::Null);
}

#[rstest]
#[case::unknown_namespace("nope.add", "no namespace")]
#[case::unknown_method("calculator.nope", "no method")]
#[case::no_separator("calculator", "wrong method")]
#[case::empty_method("", "wrong method")]
fn method_not_found(#[case] method: &str, #[case] message: &str) {
    let body = call(&server(), method, json!([]));
    assert_eq!(body["error"]["code"], json!(-32601));
    assert_eq!(body["error"]["message"], json!(message));
}

#[test]
fn undecodable_body_is_a_parse_error() {
    let response = server().serve(post(Bytes::from_static(b"{\"id\": 1, \"method\":")));
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(&response);
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["jsonrpc"], json!("2.0"));
    assert_eq!(body["error"]["code"], json!(-32700));
}

#[test]
fn non_object_body_is_a_parse_error() {
    let response = server().serve(post(Bytes::from_static(b"[1, 2, 3]")));
    assert_eq!(body_json(&response)["error"]["code"], json!(-32700));
}

#[test]
fn wire_names_are_normalized() {
    let s = server();
    assert_eq!(call(&s, "Calculator.Add", json!([2, 2]))["result"], json!(4));
    assert_eq!(
        call(&s, "calculator.MethodName", json!([]))["result"],
        json!("calculator.method_name")
    );
}

#[test]
fn response_never_carries_request_members() {
    let body = call(&server(), "calculator.add", json!([1, 2]));
    let object = body.as_object().unwrap();
    assert!(!object.contains_key("method"));
    assert!(!object.contains_key("params"));
}

// ============================================================================
// Parameter binding
// ============================================================================

#[rstest]
#[case::wrong_type(json!(["two", 3]))]
#[case::too_many(json!([1, 2, 3]))]
#[case::missing_required(json!([1]))]
#[case::object_params(json!({ "a": 1, "b": 2 }))]
fn bad_params_are_invalid_params(#[case] params: Value) {
    let body = call(&server(), "calculator.add", params);
    assert_eq!(body["error"]["code"], json!(ErrorCode::INVALID_PARAMS.code()));
}

#[test]
fn missing_optional_argument_binds_none() {
    let s = server();
    assert_eq!(call(&s, "calculator.greet", json!(["ada"]))["result"], json!("hello ada"));
    assert_eq!(
        call(&s, "calculator.greet", json!(["ada", "!"]))["result"],
        json!("hello ada!")
    );
}

#[test]
fn absent_or_null_params_mean_no_arguments() {
    let s = server();
    let body = send(&s, json!({ "id": 1, "method": "calculator.method_name" }));
    assert_eq!(body["result"], json!("calculator.method_name"));

    let body = send(&s, json!({ "id": 1, "method": "calculator.method_name", "params": null }));
    assert_eq!(body["result"], json!("calculator.method_name"));
}

#[test]
fn struct_results_serialize() {
    let body = call(&server(), "calculator.point", json!([3, -4]));
    assert_eq!(body["result"], json!({ "x": 3, "y": -4 }));
}

#[test]
fn bare_struct_returns_are_payloads() {
    let body = call(&server(), "calculator.origin", json!([]));
    assert_eq!(body["result"], json!({ "x": 0, "y": 0 }));
}

#[test]
fn tuple_returns_are_not_exposed() {
    let body = call(&server(), "calculator.pair", json!([]));
    assert_eq!(body["error"]["code"], json!(-32601));
    assert_eq!(body["error"]["message"], json!("no method"));
}

// ============================================================================
// Results and errors
// ============================================================================

#[rstest]
#[case::zero("calculator.zero")]
#[case::unit("calculator.ping")]
fn empty_results_are_omitted(#[case] method: &str) {
    let body = call(&server(), method, json!([]));
    assert_eq!(body, json!({ "jsonrpc": "2.0", "id": 1 }));
}

#[test]
fn empty_collections_are_still_results() {
    let body = call(&server(), "calculator.empty_list", json!([]));
    assert_eq!(body["result"], json!([]));
}

#[rstest]
#[case::other("calculator.div", json!([1, 0]), -32000, "division by zero")]
#[case::token("calculator.whoami", json!([]), 401, "not signed in")]
#[case::forbidden("calculator.deny", json!([]), 403, "denied")]
#[case::verbatim("calculator.custom", json!([]), -1, "custom failure")]
fn service_errors_map_to_codes(
    #[case] method: &str,
    #[case] params: Value,
    #[case] code: i32,
    #[case] message: &str,
) {
    let body = call(&server(), method, params);
    assert_eq!(body["error"]["code"], json!(code));
    assert_eq!(body["error"]["message"], json!(message));
    assert!(body.get("result").is_none());
}

#[test]
fn rpc_error_data_passes_through() {
    let body = call(&server(), "calculator.custom", json!([]));
    assert_eq!(body["error"]["data"], json!({ "retry": false }));
}

#[test]
fn panics_become_internal_errors() {
    let s = server();
    let body = call(&s, "calculator.crash", json!([]));
    assert_eq!(body["error"]["code"], json!(-32603));

    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("crash"), "{message}");
    assert!(message.contains("calculator exploded"), "{message}");

    // The server keeps serving after a crash.
    assert_eq!(call(&s, "calculator.add", json!([1, 2]))["result"], json!(3));
}

#[test]
fn concurrent_requests_share_one_server() {
    let s = Arc::new(server());
    std::thread::scope(|scope| {
        for i in 0..8_i64 {
            let s = Arc::clone(&s);
            scope.spawn(move || {
                let body = call(&s, "calculator.add", json!([i, 100]));
                assert_eq!(body["result"], json!(i + 100));
            });
        }
    });
}
