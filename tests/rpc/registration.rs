//! Service registration: naming, hooks, scanning rules and containers.

use namespaced_rpc::{
    NamingConvention, RegistryError, Server, ServerOptions, ServiceDef,
};
use serde_json::json;

use crate::support::{call, server, Accounts, App, Calculator, Directory, Hollow, UserService};

#[test]
fn scanning_exposes_only_callable_methods() {
    let server = server();
    let entry = server.registry().service("calculator").unwrap();
    assert_eq!(entry.type_name(), "Calculator");
    assert_eq!(
        entry.method_names(),
        vec![
            "add",
            "crash",
            "custom",
            "deny",
            "div",
            "empty_list",
            "greet",
            "method_name",
            "origin",
            "ping",
            "point",
            "whoami",
            "zero",
        ]
    );
}

#[test]
fn plans_describe_signatures() {
    let server = server();
    let entry = server.registry().service("calculator").unwrap();

    let add = entry.method("add").unwrap();
    assert_eq!(add.arg_types(), &["i64", "i64"]);
    assert_eq!(add.error_position(), None);
    assert!(!add.has_context());

    assert_eq!(entry.method("div").unwrap().error_position(), Some(1));
    assert_eq!(entry.method("deny").unwrap().error_position(), Some(0));

    let whoami = entry.method("whoami").unwrap();
    assert!(whoami.has_context());
    assert!(whoami.arg_types().is_empty());
    assert_eq!(whoami.error_position(), Some(1));
}

#[test]
fn type_name_is_snake_cased() {
    let mut server = Server::default();
    server.register(UserService::default());

    assert_eq!(server.registry().namespaces(), vec!["user_service"]);
    assert_eq!(call(&server, "user_service.get_name", json!([]))["result"], json!("ada"));
    assert_eq!(call(&server, "UserService.GetName", json!([]))["result"], json!("ada"));
}

#[test]
fn constructor_runs_once_before_scanning() {
    let mut server = Server::default();
    server.register(UserService::default());
    assert_eq!(call(&server, "user_service.init_count", json!([]))["result"], json!(1));

    let entry = server.registry().service("user_service").unwrap();
    let instance = entry.instance::<UserService>().unwrap();
    assert_eq!(instance.init_count(), 1);
}

#[test]
fn excluded_and_reserved_methods_are_hidden() {
    let mut server = Server::default();
    server.register(UserService::default());

    let body = call(&server, "user_service.secret", json!([]));
    assert_eq!(body["error"]["message"], json!("no method"));

    let entry = server.registry().service("user_service").unwrap();
    assert_eq!(entry.method_names(), vec!["get_name", "init_count", "lookup"]);
}

#[test]
fn renamed_method() {
    let mut server = Server::default();
    server.register(UserService::default());
    let body = call(&server, "user_service.lookup", json!(["ada@example.com"]));
    assert_eq!(body["result"], json!("ada"));
}

#[test]
fn service_supplies_its_namespace() {
    let mut server = Server::default();
    server.register(Accounts);

    assert_eq!(server.registry().namespaces(), vec!["acct"]);
    assert_eq!(call(&server, "acct.balance", json!(["alice"]))["result"], json!(100));
    assert_eq!(call(&server, "acct.balance", json!(["bob"]))["error"]["code"], json!(403));
}

#[test]
fn explicit_name_wins() {
    let mut server = Server::default();
    server.register_named(Accounts, "Billing");
    assert_eq!(server.registry().namespaces(), vec!["billing"]);
}

#[test]
#[should_panic(expected = "namespace [calculator] exists")]
fn duplicate_namespace_panics() {
    let mut server = server();
    server.register(Calculator);
}

#[test]
fn try_register_reports_duplicates() {
    let mut server = server();
    let err = server.try_register(Calculator).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateNamespace("calculator".into()));

    let err = server
        .try_register_def(ServiceDef::new("Calculator").method("noop", || "x"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateNamespace(_)));
}

#[test]
fn services_without_methods_are_not_registered() {
    let mut server = Server::default();
    server.register(Hollow);
    assert!(server.registry().is_empty());

    // A later service may take the name.
    server.register_def(ServiceDef::new("hollow").method("ping", || "pong"));
    assert_eq!(server.registry().namespaces(), vec!["hollow"]);
}

#[test]
fn verbatim_naming_keeps_declared_names() {
    let mut server = Server::new(ServerOptions::default().with_naming(NamingConvention::Verbatim));
    server.register(UserService::default());

    assert_eq!(server.registry().namespaces(), vec!["UserService"]);
    assert_eq!(call(&server, "UserService.GetName", json!([]))["result"], json!("ada"));
    assert_eq!(
        call(&server, "user_service.get_name", json!([]))["error"]["code"],
        json!(-32601)
    );
}

#[test]
fn app_registers_marked_fields() {
    let mut server = Server::default();
    server.register_app(App {
        calc: Calculator,
        accounts: Accounts,
        label: "ignored".into(),
    });

    assert_eq!(server.registry().namespaces(), vec!["calculator", "ledger"]);
    assert_eq!(server.registry().global_excludes(), &["ping".to_string()]);
    assert_eq!(call(&server, "ledger.balance", json!(["alice"]))["result"], json!(100));

    let body = call(&server, "calculator.ping", json!([]));
    assert_eq!(body["error"]["message"], json!("no method"));
}

#[test]
fn app_excludes_apply_to_later_registrations() {
    let mut server = Server::default();
    server.register_app(App {
        calc: Calculator,
        accounts: Accounts,
        label: String::new(),
    });
    server.register_def(
        ServiceDef::new("health")
            .method("ping", || "pong")
            .method("status", || "ok"),
    );

    let entry = server.registry().service("health").unwrap();
    assert_eq!(entry.method_names(), vec!["status"]);
}

#[test]
fn app_without_excludes_keeps_earlier_ones() {
    let mut server = Server::default();
    server.register_app(App {
        calc: Calculator,
        accounts: Accounts,
        label: String::new(),
    });
    server.register_app(Directory {
        users: UserService::default(),
    });
    assert_eq!(server.registry().global_excludes(), &["ping".to_string()]);

    server.register_def(
        ServiceDef::new("health")
            .method("ping", || "pong")
            .method("status", || "ok"),
    );
    assert_eq!(call(&server, "health.ping", json!([]))["error"]["code"], json!(-32601));
    assert_eq!(call(&server, "health.status", json!([]))["result"], json!("ok"));
}

#[test]
fn service_def_excludes() {
    let mut server = Server::default();
    server.register_def(
        ServiceDef::new("math")
            .method("square", |x: i64| x * x)
            .method("internal", || "secret")
            .exclude(["internal"]),
    );

    assert_eq!(call(&server, "math.square", json!([7]))["result"], json!(49));
    assert_eq!(call(&server, "math.internal", json!([]))["error"]["code"], json!(-32601));
}
