mod common;

use common::{assert_closed, registry};

#[tokio::test(flavor = "multi_thread")]
async fn acquire_from_async_code_via_spawn_blocking() {
    let registry = registry();
    let acquiring = registry.clone();
    let handle = tokio::task::spawn_blocking(move || {
        acquiring.acquire("widgets", None)
    })
    .await
    .unwrap()
    .unwrap();

    let res = reqwest::get(handle.url("/static")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let endpoint = handle.endpoint_url().to_string();
    tokio::task::spawn_blocking(move || handle.release())
        .await
        .unwrap()
        .unwrap();
    assert!(!registry.is_active("widgets"));
    tokio::task::spawn_blocking(move || assert_closed(&endpoint))
        .await
        .unwrap();
}
