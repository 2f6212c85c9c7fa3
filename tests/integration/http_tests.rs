//! End-to-end HTTP action scenarios, driven in-process against the axum
//! router with `tower::ServiceExt::oneshot` rather than a real socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use basicdb::backend::memory::MemoryBackend;
use basicdb::backend::StorageBackend;
use basicdb::http::router;

fn app() -> axum::Router {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
    router(backend)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_request(owner: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("x-owner", owner)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn create_domain_then_list_domains_round_trips() {
    let app = app();

    let response = app
        .clone()
        .oneshot(form_request("alice", "Action=CreateDomain&DomainName=books"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(form_request("alice", "Action=ListDomains"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("<DomainName>books</DomainName>"));
}

#[tokio::test]
async fn put_and_get_attributes_round_trips() {
    let app = app();

    app.clone()
        .oneshot(form_request("alice", "Action=CreateDomain&DomainName=books"))
        .await
        .unwrap();

    let put = form_request(
        "alice",
        "Action=PutAttributes&DomainName=books&ItemName=b1&Attribute.0.Name=Title&Attribute.0.Value=Dune",
    );
    let response = app.clone().oneshot(put).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get = form_request("alice", "Action=GetAttributes&DomainName=books&ItemName=b1");
    let response = app.oneshot(get).await.unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<Value>Dune</Value>"));
}

#[tokio::test]
async fn put_attributes_honors_a_failed_expectation() {
    let app = app();
    app.clone()
        .oneshot(form_request("alice", "Action=CreateDomain&DomainName=books"))
        .await
        .unwrap();
    app.clone()
        .oneshot(form_request(
            "alice",
            "Action=PutAttributes&DomainName=books&ItemName=b1&Attribute.0.Name=Price&Attribute.0.Value=9.99",
        ))
        .await
        .unwrap();

    let conditional_put = form_request(
        "alice",
        "Action=PutAttributes&DomainName=books&ItemName=b1\
         &Attribute.0.Name=Price&Attribute.0.Value=14.99&Attribute.0.Replace=true\
         &Expected.0.Name=Price&Expected.0.Value=0.00",
    );
    let response = app.oneshot(conditional_put).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let text = body_text(response).await;
    assert!(text.contains("<ConditionalCheckFailed>"));
}

#[tokio::test]
async fn select_filters_by_where_clause() {
    let app = app();
    app.clone()
        .oneshot(form_request("alice", "Action=CreateDomain&DomainName=books"))
        .await
        .unwrap();
    app.clone()
        .oneshot(form_request(
            "alice",
            "Action=PutAttributes&DomainName=books&ItemName=b1&Attribute.0.Name=Genre&Attribute.0.Value=scifi",
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(form_request(
            "alice",
            "Action=PutAttributes&DomainName=books&ItemName=b2&Attribute.0.Name=Genre&Attribute.0.Value=romance",
        ))
        .await
        .unwrap();

    let select = form_request(
        "alice",
        "Action=Select&SelectExpression=select%20%2A%20from%20books%20where%20Genre%20%3D%20%27scifi%27",
    );
    let response = app.oneshot(select).await.unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<Name>b1</Name>"));
    assert!(!text.contains("<Name>b2</Name>"));
}

#[tokio::test]
async fn missing_owner_header_is_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("Action=ListDomains"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_action_is_rejected() {
    let app = app();
    let response = app
        .oneshot(form_request("alice", "Action=Frobnicate"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
