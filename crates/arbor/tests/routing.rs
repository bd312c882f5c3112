//! End-to-end routing behaviour through `App::handle`.

use std::collections::BTreeMap;

use arbor::prelude::*;
use bytes::Bytes;
use http::header::ALLOW;
use http::{Method, StatusCode};
use serde_json::{Value, json};

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

async fn me() -> &'static str {
    "me"
}

async fn show(Params(id): Params<String>) -> Value {
    json!({ "id": id })
}

async fn echo_params(
    Params(params): Params<BTreeMap<String, String>>,
) -> Json<BTreeMap<String, String>> {
    Json(params)
}

#[tokio::test]
async fn static_segment_beats_parameter() {
    let app = App::build(router("/users", [get(show).at(":id"), get(me).at("me")])).unwrap();

    let res = app.handle(request(Method::GET, "/users/me")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(&res), json!("me"));

    let res = app.handle(request(Method::GET, "/users/42")).await;
    assert_eq!(json_body(&res), json!({ "id": "42" }));
}

#[tokio::test]
async fn paths_are_normalized_on_both_sides() {
    let app = App::build(router("api/", [router("//v1/", [get(me).at("/users///me/")])])).unwrap();

    for uri in ["/api/v1/users/me", "//api//v1/users/me/", "/api/v1/users/me?x=1"] {
        let res = app.handle(request(Method::GET, uri)).await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn wildcard_captures_any_depth() {
    let app = App::build(router("/", [
        get(echo_params).at("/files/*"),
        get(echo_params).at("/repos/:owner/*path"),
    ]))
    .unwrap();

    let res = app.handle(request(Method::GET, "/files/a/b/c.txt")).await;
    assert_eq!(json_body(&res), json!({ "*": "a/b/c.txt" }));

    let res = app.handle(request(Method::GET, "/files")).await;
    assert_eq!(json_body(&res), json!({ "*": "" }));

    let res = app.handle(request(Method::GET, "/repos/arbor/src/lib.rs")).await;
    assert_eq!(json_body(&res), json!({ "owner": "arbor", "path": "src/lib.rs" }));
}

#[tokio::test]
async fn not_found_and_method_not_allowed_share_prefixes() {
    let app = App::build(router("/r", [
        get(me).at("onlyget"),
        post(me).at("onlypost"),
        put(me).at("items/:id"),
        delete(me).at("items/:id"),
    ]))
    .unwrap();

    let res = app.handle(request(Method::POST, "/r/onlyget")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET");

    let res = app.handle(request(Method::GET, "/r/items/7")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "DELETE, PUT");

    for uri in ["/r", "/r/unknown", "/r/onlyget/extra", "/r/items"] {
        let res = app.handle(request(Method::GET, uri)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(res.body().as_ref(), b"Not Found");
    }
}

#[tokio::test]
async fn fragments_and_unnamed_scopes_add_no_path() {
    let passthrough = |_ctx: Context, next: Next| async move { next.run().await };
    let tree = router("/a", [fragment([scope(passthrough, [get(me).at("b")])])]);
    let app = App::build(tree).unwrap();

    let res = app.handle(request(Method::GET, "/a/b")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.middleware_index().len(), 1);
}

#[test]
fn conflicting_routes_are_rejected() {
    let dup = App::build(fragment([get(me).at("/x"), get(me).at("x/")]));
    assert!(dup.is_err());

    let interior = App::build(get(me).at("/files/*/meta"));
    assert!(interior.is_err());

    let clash = App::build(fragment([get(me).at("/u/:id"), post(me).at("/u/:name")]));
    assert!(clash.is_err());
}
