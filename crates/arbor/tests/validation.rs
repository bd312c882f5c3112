//! Request validation and extraction through `App::handle`.

use arbor::prelude::*;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Debug, Serialize, Deserialize)]
struct ItemPath {
    id: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct NewItem {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    page: u32,
    #[serde(default)]
    draft: bool,
}

fn post_json(uri: &str, body: &'static str) -> Request {
    http::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

fn fetch(uri: &str) -> Request {
    http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

async fn create(ctx: Context, Body(item): Body<NewItem>) -> Value {
    json!({ "params": ctx.params(), "name": item.name, "tags": item.tags })
}

fn items() -> App {
    let spec = ValidateSpec::new()
        .params(typed::<ItemPath>())
        .body(typed::<NewItem>());
    App::build(router("/lists/:id", [post(create).at("items").validate(spec)])).unwrap()
}

#[tokio::test]
async fn validated_parts_replace_raw_values() {
    let res = items()
        .handle(post_json("/lists/12/items", r#"{"name":"pen","extra":true}"#))
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(&res),
        json!({ "params": { "id": 12 }, "name": "pen", "tags": [] })
    );
}

#[tokio::test]
async fn validation_failure_is_a_400_json_body() {
    let res = items().handle(post_json("/lists/abc/items", r#"{"name":"pen"}"#)).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
    let body = json_body(&res);
    assert_eq!(body["error"], "ValidationError");
    assert!(body["message"].as_str().unwrap().starts_with("invalid params"));

    let res = items().handle(post_json("/lists/1/items", r#"{"tags":[]}"#)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(&res)["message"].as_str().unwrap().starts_with("invalid body"));
}

#[tokio::test]
async fn closure_schemas_run_before_middleware() {
    let reject_admin = |value: Value| {
        if value["user"] == "admin" {
            Err("reserved user name")
        } else {
            Ok(value)
        }
    };
    let gate = |_ctx: Context, _next: Next| async { text(StatusCode::FORBIDDEN, "gate") };

    let app = App::build(scope(gate, [get(|| async {})
        .at("/u/:user")
        .validate(ValidateSpec::new().params(reject_admin))]))
    .unwrap();

    let res = app.handle(fetch("/u/admin")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&res)["message"],
        "invalid params: reserved user name"
    );

    let res = app.handle(fetch("/u/ada")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn query_extraction_is_lenient() {
    async fn list(Query(paging): Query<Paging>) -> Value {
        json!({ "page": paging.page, "draft": paging.draft })
    }
    let app = App::build(get(list).at("/items")).unwrap();

    let res = app.handle(fetch("/items?page=3&draft=true")).await;
    assert_eq!(json_body(&res), json!({ "page": 3, "draft": true }));

    let res = app.handle(fetch("/items?page=three")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.headers()[CONTENT_TYPE],
        arbor::core::error::PROBLEM_JSON
    );
}

#[tokio::test]
async fn missing_body_is_a_bad_request() {
    let app = App::build(post(create).at("/items")).unwrap();
    let req = http::Request::builder()
        .method(Method::POST)
        .uri("/items")
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(b"{not json"))
        .unwrap();

    let res = app.handle(req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_bodies_are_decoded() {
    async fn login(Body(form): Body<Value>) -> Value {
        form
    }
    let app = App::build(post(login).at("/login")).unwrap();
    let req = http::Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"user=ada&remember=1"))
        .unwrap();

    let res = app.handle(req).await;
    assert_eq!(json_body(&res), json!({ "user": "ada", "remember": "1" }));
}

#[tokio::test]
async fn app_is_a_tower_service() {
    let app = App::build(router("/", [get(|| async { "pong" }).at("ping")])).unwrap();

    let res = app.clone().oneshot(fetch("/ping")).await.unwrap();
    assert_eq!(res.body().as_ref(), b"\"pong\"");

    let res = app.oneshot(fetch("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
