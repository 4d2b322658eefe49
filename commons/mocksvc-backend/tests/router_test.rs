use axum::body::Body;
use axum::http::{Request, StatusCode};
use mocksvc_backend::{
    BackendProvider, InMemoryProvider, PROBE_PATH, ServiceSnapshot,
    reset_service,
};
use serde_json::json;
use tower::ServiceExt;

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn put(uri: &str, value: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn probe_path_answers_ok() {
    let provider = InMemoryProvider::new();
    let app = provider.app("widgets");
    let res = app.oneshot(get(PROBE_PATH)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    // probing does not create regional state
    assert!(provider.backends("widgets").is_empty());
}

#[tokio::test]
async fn resource_crud() {
    let provider = InMemoryProvider::new();
    let app = provider.app("widgets");

    let res = app
        .clone()
        .oneshot(put("/us-east-1/resources/w1", json!({"size": 3})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(put("/us-east-1/resources/w1", json!({"size": 4})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get("/us-east-1/resources/w1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"size": 4}));

    let res = app
        .clone()
        .oneshot(get("/us-east-1/resources"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await, json!(["w1"]));

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/us-east-1/resources/w1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(get("/us-east-1/resources/w1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn state_and_reset_endpoints() {
    let provider = InMemoryProvider::new();
    let app = provider.app("widgets");
    app.clone()
        .oneshot(put("/us-east-1/resources/a", json!(1)))
        .await
        .unwrap();
    app.clone()
        .oneshot(put("/eu-west-1/resources/b", json!(2)))
        .await
        .unwrap();

    let res = app.clone().oneshot(get("/_mock/state")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snap: ServiceSnapshot =
        serde_json::from_value(body_json(res).await).unwrap();
    assert_eq!(snap.service, "widgets");
    assert_eq!(snap.regions.len(), 2);
    assert_eq!(snap.regions["us-east-1"].calls, 1);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_mock/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let snap = provider.snapshot("widgets").unwrap();
    assert!(
        snap.regions
            .values()
            .all(|r| r.calls == 0 && r.resources.is_empty())
    );
}

#[tokio::test]
async fn provider_reset_matches_http_reset() {
    let provider = InMemoryProvider::new();
    let app = provider.app("widgets");
    app.clone()
        .oneshot(put("/us-east-1/resources/a", json!(true)))
        .await
        .unwrap();
    reset_service(&provider, "widgets");
    let res = app.oneshot(get("/us-east-1/resources/a")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reserved_region_is_rejected() {
    let provider = InMemoryProvider::new();
    let res = provider
        .app("widgets")
        .oneshot(get("/_mock/resources"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
