use std::io::Write;
use std::path::Path;

use lodestone::core::downloader::{BatchReport, BatchScheduler, DownloadOutcome, Downloader};
use lodestone::core::http::build_http_client;
use lodestone::core::java::{RuntimeInstaller, RuntimeManifest};
use lodestone::core::platform::Platform;
use lodestone::core::progress::silent_sink;
use serde_json::json;
use sha1::{Digest, Sha1};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JAVA: &[u8] = b"java binary";
const JLI: &[u8] = b"libjli";

fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn lzma(bytes: &[u8]) -> Vec<u8> {
    let options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
    let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
    let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// `bin/java` is offered both raw and compressed; `packed` is what the
/// compressed download unpacks to.
fn manifest(base: &str, packed: &[u8]) -> RuntimeManifest {
    let compressed = lzma(packed);
    serde_json::from_value(json!({"files": {
        "bin": {"type": "directory"},
        "bin/java": {"type": "file", "executable": true, "downloads": {
            "raw": {"sha1": sha1_hex(JAVA), "size": JAVA.len(), "url": format!("{base}/raw/java")},
            "lzma": {"sha1": sha1_hex(&compressed), "size": compressed.len(), "url": format!("{base}/lzma/java")}
        }},
        "bin/javaw": {"type": "link", "target": "java"},
        "lib/libjli.so": {"type": "file", "downloads": {
            "raw": {"sha1": sha1_hex(JLI), "size": JLI.len(), "url": format!("{base}/raw/libjli.so")}
        }}
    }}))
    .unwrap()
}

async fn install(manifest: &RuntimeManifest, root: &Path) -> BatchReport {
    let downloader = Downloader::new(build_http_client(10).unwrap());
    RuntimeInstaller {
        downloader: &downloader,
        scheduler: BatchScheduler::new(2),
        platform: Platform::detect(),
    }
    .install(manifest, root, "Installing Runtime", silent_sink())
    .await
    .unwrap()
}

#[tokio::test]
async fn compressed_files_are_unpacked_and_kept_on_reinstall() {
    let server = MockServer::start().await;
    serve(&server, "/lzma/java", lzma(JAVA), 1).await;
    serve(&server, "/raw/java", JAVA.to_vec(), 0).await;
    serve(&server, "/raw/libjli.so", JLI.to_vec(), 1).await;
    let manifest = manifest(&server.uri(), JAVA);
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("java-runtime-gamma");

    let report = install(&manifest, &root).await;
    assert!(report.all_ok(), "{report:?}");
    assert_eq!(report.total, 2);
    assert_eq!(std::fs::read(root.join("bin/java")).unwrap(), JAVA);
    assert!(!root.join("bin/java.lzma").exists());
    assert_eq!(std::fs::read(root.join("lib/libjli.so")).unwrap(), JLI);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(root.join("bin/java")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
        let link = std::fs::symlink_metadata(root.join("bin/javaw")).unwrap();
        assert!(link.file_type().is_symlink());
        assert_eq!(std::fs::read_link(root.join("bin/javaw")).unwrap(), Path::new("java"));
    }

    // Everything verifies, nothing is fetched again.
    let again = install(&manifest, &root).await;
    assert!(again.all_ok(), "{again:?}");
}

#[tokio::test]
async fn truncated_runtime_file_is_unpacked_again() {
    let server = MockServer::start().await;
    serve(&server, "/lzma/java", lzma(JAVA), 1).await;
    serve(&server, "/raw/libjli.so", JLI.to_vec(), 1).await;
    let manifest = manifest(&server.uri(), JAVA);
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("java-runtime-gamma");
    std::fs::create_dir_all(root.join("bin")).unwrap();
    std::fs::write(root.join("bin/java"), &JAVA[..4]).unwrap();

    let report = install(&manifest, &root).await;
    assert!(report.all_ok(), "{report:?}");
    assert_eq!(std::fs::read(root.join("bin/java")).unwrap(), JAVA);
}

#[tokio::test]
async fn unpacked_content_is_checked_against_raw_hash() {
    let server = MockServer::start().await;
    // Same length as the real binary, different bytes.
    let wrong = b"JAVA BINARY";
    serve(&server, "/lzma/java", lzma(wrong), 1).await;
    serve(&server, "/raw/libjli.so", JLI.to_vec(), 1).await;
    let manifest = manifest(&server.uri(), wrong);
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("java-runtime-gamma");

    let report = install(&manifest, &root).await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, vec![DownloadOutcome::HashMismatchRetried]);
    assert!(!root.join("bin/java.lzma").exists());
}
