use lodestone::core::downloader::{DownloadOutcome, DownloadTask, Downloader};
use lodestone::core::http::build_http_client;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &[u8] = b"library bytes";

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn downloader() -> Downloader {
    Downloader::new(build_http_client(10).unwrap())
}

async fn serve(server: &MockServer, route: &str, body: &[u8], expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn second_fetch_of_valid_file_makes_no_request() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", BODY, 1).await;
    let dir = tempfile::tempdir().unwrap();

    let task = DownloadTask::new(
        format!("{}/lib.jar", server.uri()),
        dir.path().join("libs/lib.jar"),
        sha1_hex(BODY),
    )
    .with_size(BODY.len() as u64);

    let dl = downloader();
    assert_eq!(dl.fetch(&task).await, DownloadOutcome::Success);
    assert_eq!(dl.fetch(&task).await, DownloadOutcome::AlreadyValid);
    assert_eq!(std::fs::read(&task.dest).unwrap(), BODY);
}

#[tokio::test]
async fn corrupt_file_is_replaced_with_one_download() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", BODY, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("lib.jar");
    // Same length, different content.
    std::fs::write(&dest, b"LIBRARY BYTES").unwrap();

    let task = DownloadTask::new(format!("{}/lib.jar", server.uri()), &dest, sha1_hex(BODY))
        .with_size(BODY.len() as u64);
    assert_eq!(downloader().fetch(&task).await, DownloadOutcome::Success);
    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
}

#[tokio::test]
async fn corrupt_file_served_corrupt_again_is_not_retried_twice() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", b"still wrong!!", 1).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("lib.jar");
    std::fs::write(&dest, b"LIBRARY BYTES").unwrap();

    let task = DownloadTask::new(format!("{}/lib.jar", server.uri()), &dest, sha1_hex(BODY));
    assert_eq!(
        downloader().fetch(&task).await,
        DownloadOutcome::HashMismatchRetried
    );
}

#[tokio::test]
async fn fresh_download_with_bad_hash_is_not_repeated() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", b"tampered", 1).await;
    let dir = tempfile::tempdir().unwrap();

    let task = DownloadTask::new(
        format!("{}/lib.jar", server.uri()),
        dir.path().join("lib.jar"),
        sha1_hex(BODY),
    );
    assert_eq!(
        downloader().fetch(&task).await,
        DownloadOutcome::HashMismatchRetried
    );
}

#[tokio::test]
async fn declared_size_disagreement_is_not_retried() {
    let server = MockServer::start().await;
    serve(&server, "/lib.jar", BODY, 1).await;
    let dir = tempfile::tempdir().unwrap();

    let task = DownloadTask::new(
        format!("{}/lib.jar", server.uri()),
        dir.path().join("lib.jar"),
        sha1_hex(BODY),
    )
    .with_size(4);
    assert_eq!(
        downloader().fetch(&task).await,
        DownloadOutcome::SizeMismatch {
            expected: 4,
            actual: BODY.len() as u64
        }
    );
}

#[tokio::test]
async fn http_errors_are_reported_as_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let task = DownloadTask::new(
        format!("{}/missing.jar", server.uri()),
        dir.path().join("missing.jar"),
        sha1_hex(BODY),
    );
    assert_eq!(downloader().fetch(&task).await, DownloadOutcome::HttpError(404));
}

#[tokio::test]
async fn unverified_fetch_accepts_any_content() {
    let server = MockServer::start().await;
    serve(&server, "/installer.jar", BODY, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("tools/installer.jar");

    let outcome = downloader()
        .fetch_unverified(&format!("{}/installer.jar", server.uri()), &dest)
        .await;
    assert_eq!(outcome, DownloadOutcome::Success);
    assert_eq!(std::fs::read(&dest).unwrap(), BODY);
}

/// Serves `body` once, one byte every `gap_ms`, over a raw socket.
async fn serve_trickle(body: &'static [u8], gap_ms: u64) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for byte in body {
            tokio::time::sleep(std::time::Duration::from_millis(gap_ms)).await;
            socket.write_all(&[*byte]).await.unwrap();
            socket.flush().await.unwrap();
        }
    });
    format!("http://{}/slow.jar", addr)
}

#[tokio::test]
async fn slow_transfer_outlasting_connect_timeout_completes() {
    const SLOW: &[u8] = b"0123456789";
    // Ten bytes at 250ms each take well over the one second connect budget.
    let url = serve_trickle(SLOW, 250).await;
    let dir = tempfile::tempdir().unwrap();

    let task = DownloadTask::new(url, dir.path().join("slow.jar"), sha1_hex(SLOW))
        .with_size(SLOW.len() as u64);
    let dl = Downloader::new(build_http_client(1).unwrap());
    assert_eq!(dl.fetch(&task).await, DownloadOutcome::Success);
    assert_eq!(std::fs::read(&task.dest).unwrap(), SLOW);
}
