//! The staging channel over real HTTP: one producer, one consumer, teardown
//! on cancellation.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use planwatch::scheduler::Interconnect;
use planwatch::staging::Transfer;

use planwatch_test_utils::init_tracing;

async fn serve_transfer() -> (Transfer, tempfile::TempDir) {
    init_tracing();

    let data_dir = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let transfer = Transfer::new(format!("http://{addr}"), data_dir.path().to_path_buf());
    let router = transfer.router();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (transfer, data_dir)
}

#[tokio::test]
async fn upload_then_download_round_trips() {
    let (transfer, _data_dir) = serve_transfer().await;
    let token = CancellationToken::new();
    let url = transfer.init_interconnect(&token);

    let client = reqwest::Client::new();

    let post = client
        .post(&url)
        .body("tarball bytes".as_bytes().to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(post.status(), 200);

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.text().await.unwrap(), "tarball bytes");
}

#[tokio::test]
async fn unknown_names_are_404() {
    let (transfer, _data_dir) = serve_transfer().await;
    let token = CancellationToken::new();
    let url = transfer.init_interconnect(&token);
    let base = url.rsplit_once("/v1/transfer/").unwrap().0.to_string();

    let client = reqwest::Client::new();

    let get = client
        .get(format!("{base}/v1/transfer/no-such-endpoint"))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status(), 404);

    let post = client
        .post(format!("{base}/v1/transfer/no-such-endpoint"))
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(post.status(), 404);
}

#[tokio::test]
async fn other_methods_are_405() {
    let (transfer, _data_dir) = serve_transfer().await;
    let token = CancellationToken::new();
    let url = transfer.init_interconnect(&token);

    let put = reqwest::Client::new()
        .put(&url)
        .body(vec![0u8])
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 405);
}

#[tokio::test]
async fn cancellation_tears_down_endpoint_and_file() {
    let (transfer, data_dir) = serve_transfer().await;
    let token = CancellationToken::new();
    let url = transfer.init_interconnect(&token);
    let name = url.rsplit_once('/').unwrap().1.to_string();

    let client = reqwest::Client::new();
    client
        .post(&url)
        .body("payload".as_bytes().to_vec())
        .send()
        .await
        .unwrap();
    assert!(data_dir.path().join(&name).exists());

    token.cancel();

    // Cleanup runs async; poll until it lands.
    for _ in 0..100 {
        if !data_dir.path().join(&name).exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!data_dir.path().join(&name).exists());

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), 404);
}

#[tokio::test]
async fn unrelated_endpoints_do_not_interfere() {
    let (transfer, _data_dir) = serve_transfer().await;
    let token_a = CancellationToken::new();
    let token_b = CancellationToken::new();
    let url_a = transfer.init_interconnect(&token_a);
    let url_b = transfer.init_interconnect(&token_b);
    assert_ne!(url_a, url_b);

    let client = reqwest::Client::new();
    client.post(&url_a).body(b"aaa".to_vec()).send().await.unwrap();
    client.post(&url_b).body(b"bbb".to_vec()).send().await.unwrap();

    token_a.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // B is still live after A's teardown.
    let get = client.get(&url_b).send().await.unwrap();
    assert_eq!(get.text().await.unwrap(), "bbb");
}
