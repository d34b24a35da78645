//! End-to-end dispatch tests
//!
//! Each test builds a dispatcher the way a deployment would and sends it
//! raw JSON events.

use axum::extract::Request;
use axum::routing::get;
use axum::Router;
use percent_encoding::percent_decode_str;
use relaystack::{DispatchConfig, DispatchError, Dispatcher};
use relaystack_core::{handler_fn, Event, HandlerError, InvocationContext, ResolveError};
use relaystack_http::{Application, ApplicationFactory, ServiceApplication};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const APP_PATH: &str = "site.web.application";
const JOBS_PATH: &str = "app.jobs.handler";
const DEFAULT_PATH: &str = "app.default.handler";
const TASKS_PATH: &str = "app.tasks.handler";

fn ctx() -> InvocationContext {
    InvocationContext::local("shop-HttpFunction", Duration::from_secs(30))
}

/// Handler that reports which path it was registered under
fn tagged(tag: &'static str) -> Arc<dyn relaystack_core::Handler> {
    Arc::new(handler_fn(move |event: Event, _ctx: InvocationContext| async move {
        Ok::<Value, HandlerError>(json!({ "handled_by": tag, "event": event }))
    }))
}

/// Factory for an echo application, counting how often it runs
fn echo_factory(calls: Arc<AtomicUsize>) -> ApplicationFactory {
    Arc::new(move || {
        let instance = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let router = Router::new()
            .route("/instance", get(move || async move { instance.to_string() }))
            .fallback(|request: Request| async move { request.uri().path().to_string() });
        let app: Arc<dyn Application> = Arc::new(ServiceApplication::new(router));
        Ok(app)
    })
}

fn full_config() -> DispatchConfig {
    DispatchConfig {
        http_application: Some(APP_PATH.to_string()),
        queue_handler: Some(JOBS_PATH.to_string()),
        default_handler: Some(DEFAULT_PATH.to_string()),
        http_function: Some(true),
        ..DispatchConfig::default()
    }
}

fn build(config: DispatchConfig, calls: Arc<AtomicUsize>) -> Dispatcher {
    Dispatcher::builder(config)
        .handler(JOBS_PATH, tagged("jobs"))
        .unwrap()
        .handler(DEFAULT_PATH, tagged("default"))
        .unwrap()
        .handler(TASKS_PATH, tagged("tasks"))
        .unwrap()
        .application(APP_PATH, echo_factory(calls))
        .unwrap()
        .build()
        .unwrap()
}

fn http_event(path: &str) -> Value {
    json!({
        "version": "2.0",
        "routeKey": "$default",
        "rawPath": path,
        "rawQueryString": "",
        "headers": { "host": "shop.example.com" },
        "requestContext": {
            "requestId": "req-1",
            "http": { "method": "GET", "path": path, "protocol": "HTTP/1.1", "sourceIp": "10.0.0.1" }
        },
        "isBase64Encoded": false
    })
}

fn queue_event() -> Value {
    json!({ "Records": [{ "eventSource": "aws:sqs", "messageId": "m-1", "body": "resize 42" }] })
}

#[tokio::test]
async fn test_explicit_handler_path_wins() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = build(full_config(), calls.clone());

    let mut event = http_event("/");
    event["Records"] = queue_event()["Records"].clone();
    event["handler_path"] = json!(TASKS_PATH);

    let result = dispatcher.dispatch(&event, &ctx()).await.unwrap();

    assert_eq!(result["handled_by"], "tasks");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_event_reuses_application() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = build(full_config(), calls.clone());

    let first = dispatcher.dispatch(&http_event("/instance"), &ctx()).await.unwrap();
    let second = dispatcher.dispatch(&http_event("/instance"), &ctx()).await.unwrap();

    assert_eq!(first["statusCode"], 200);
    assert_eq!(first["body"], "1");
    assert_eq!(second["body"], "1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let a = dispatcher.web_application().unwrap().unwrap();
    let b = dispatcher.web_application().unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_ascii_path_reaches_application_intact() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher.dispatch(&http_event("/café"), &ctx()).await.unwrap();

    let path = result["body"].as_str().unwrap();
    assert_eq!(path, "/caf%C3%A9");
    let decoded = percent_decode_str(path).decode_utf8().unwrap();
    assert_eq!(decoded, "/café");
}

#[tokio::test]
async fn test_http_event_outside_http_role() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = DispatchConfig {
        http_function: Some(false),
        function_name: Some("shop-TasksFunction".to_string()),
        ..full_config()
    };
    let dispatcher = build(config, calls.clone());

    let result = dispatcher.dispatch(&http_event("/"), &ctx()).await.unwrap();

    assert_eq!(result["handled_by"], "default");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_http_role_from_function_name() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = DispatchConfig {
        http_function: None,
        function_name: Some("shop-HttpFunction-9XY".to_string()),
        ..full_config()
    };
    let dispatcher = build(config, calls.clone());

    let result = dispatcher.dispatch(&http_event("/hello"), &ctx()).await.unwrap();

    assert_eq!(result["body"], "/hello");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_queue_event_routed_to_queue_handler() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher.dispatch(&queue_event(), &ctx()).await.unwrap();

    assert_eq!(result["handled_by"], "jobs");
    assert_eq!(result["event"], queue_event());
}

#[tokio::test]
async fn test_queue_event_without_queue_handler_uses_default() {
    let config = DispatchConfig {
        queue_handler: None,
        ..full_config()
    };
    let dispatcher = build(config, Arc::new(AtomicUsize::new(0)));

    let result = dispatcher.dispatch(&queue_event(), &ctx()).await.unwrap();

    assert_eq!(result["handled_by"], "default");
}

#[tokio::test]
async fn test_unmatched_event_falls_back_to_logger() {
    let dispatcher = build(DispatchConfig::default(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher
        .dispatch(&json!({ "detail-type": "Scheduled Event" }), &ctx())
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_unknown_handler_path_is_resolve_error() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let err = dispatcher
        .dispatch(&json!({ "handler_path": "app.tasks.missing" }), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Resolve(ResolveError::AttributeNotFound { ref module, ref attribute })
            if module == "app.tasks" && attribute == "missing"
    ));

    let err = dispatcher
        .dispatch(&json!({ "handler_path": "nodots" }), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Resolve(ResolveError::InvalidPath(_))));
}

#[tokio::test]
async fn test_handler_errors_propagate() {
    let failing = Arc::new(handler_fn(|_event: Event, _ctx: InvocationContext| async move {
        Err::<Value, HandlerError>(HandlerError::InvalidEvent("missing order id".to_string()))
    }));
    let dispatcher = Dispatcher::builder(DispatchConfig::default())
        .handler("app.orders.handler", failing)
        .unwrap()
        .build()
        .unwrap();

    let err = dispatcher
        .dispatch(&json!({ "handler_path": "app.orders.handler" }), &ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Handler(HandlerError::InvalidEvent(_))));
    assert_eq!(err.to_payload().error_type, "InvalidEvent");
}

#[tokio::test]
async fn test_shell_handler_via_explicit_path() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher
        .dispatch(
            &json!({ "handler_path": "relaystack.handlers.shell.handler", "args": ["echo", "hi"] }),
            &ctx(),
        )
        .await
        .unwrap();
    assert_eq!(result, json!({ "exit_code": 0, "stdout": "hi\n", "stderr": "" }));

    let result = dispatcher
        .dispatch(
            &json!({ "handler_path": "relaystack.handlers.shell.handler", "args": ["relaystack-no-such-command"] }),
            &ctx(),
        )
        .await
        .unwrap();
    assert_ne!(result["exit_code"], 0);
}

#[tokio::test]
async fn test_exec_handler_via_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher
        .dispatch(
            &json!({
                "handler_path": "relaystack.handlers.exec.handler",
                "args": [format!("echo done > '{}'", marker.display())]
            }),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "done\n");
}

#[tokio::test]
async fn test_builtin_check_command() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));

    let result = dispatcher
        .dispatch(
            &json!({ "handler_path": "relaystack.handlers.manage.handler", "args": ["check"] }),
            &ctx(),
        )
        .await
        .unwrap();

    assert_eq!(
        result["stdout"],
        "ok queue_handler app.jobs.handler\nok default_handler app.default.handler\nok http_application site.web.application\n"
    );
    assert_eq!(result["stderr"], "");
}

#[tokio::test]
async fn test_dispatch_is_idempotent_for_pure_handlers() {
    let dispatcher = build(full_config(), Arc::new(AtomicUsize::new(0)));
    let event = queue_event();

    let first = dispatcher.dispatch(&event, &ctx()).await.unwrap();
    let second = dispatcher.dispatch(&event, &ctx()).await.unwrap();

    assert_eq!(first, second);
}
