//! Integration tests for the artifact lifecycle.
//!
//! These tests drive the public API end to end:
//! - install → checksum verification on the stored artifact
//! - duplicate install conflict without network traffic
//! - update policy gating for breaking updates
//! - format detection independent of file extension
//! - retry timing and batch ordering through the transfer engine
//! - catalog persistence across store reopen
//!
//! Run with: `cargo test --test lifecycle_integration`

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use edgemodel::inspect::{Framework, Inspector, ModelFormat, Platform};
use edgemodel::lifecycle::{
    ArtifactManager, InstallOptions, InstallRequest, LifecycleError, ManagerConfig,
    UpdateOptions,
};
use edgemodel::store::{
    ArtifactFilter, ArtifactStore, Capability, JsonFileStore, MemoryStore, ModelType,
};
use edgemodel::transfer::{
    sha256_hex, ChunkObserver, FetchRequest, Fetcher, TransferEngine, TransferError,
    TransferOptions, TransferRegistry, TransferRequest, TransferResult,
};
use edgemodel::version::UpdateType;

// ============================================================================
// Helpers
// ============================================================================

/// A TFLite flatbuffer header followed by filler bytes.
fn tflite_bytes(seed: u8) -> Vec<u8> {
    let mut bytes = vec![0x18, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(b"TFL3");
    bytes.extend((0..2048u32).map(|i| ((i as u8) ^ seed) | 0x80));
    bytes
}

/// Serves payloads by URL, counting requests. Fails the first
/// `failures_per_url` requests of every URL.
struct ModelServer {
    payloads: HashMap<String, Bytes>,
    failures_per_url: u32,
    seen: Mutex<HashMap<String, u32>>,
    requests: AtomicU32,
}

impl ModelServer {
    fn new() -> Self {
        Self {
            payloads: HashMap::new(),
            failures_per_url: 0,
            seen: Mutex::new(HashMap::new()),
            requests: AtomicU32::new(0),
        }
    }

    fn serve(mut self, url: &str, payload: Vec<u8>) -> Self {
        self.payloads.insert(url.to_string(), Bytes::from(payload));
        self
    }

    fn failing_first(mut self, failures: u32) -> Self {
        self.failures_per_url = failures;
        self
    }
}

impl Fetcher for ModelServer {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest<'a>,
        on_chunk: ChunkObserver<'a>,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, TransferResult<Bytes>> {
        async move {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let attempt = {
                let mut seen = self.seen.lock();
                let count = seen.entry(request.url.to_string()).or_default();
                *count += 1;
                *count
            };
            if attempt <= self.failures_per_url {
                return Err(TransferError::Http {
                    url: request.url.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            let body = self.payloads.get(request.url).cloned().ok_or_else(|| {
                TransferError::Status {
                    url: request.url.to_string(),
                    status: 404,
                }
            })?;
            for end in (512..body.len()).step_by(512).chain([body.len()]) {
                on_chunk(end as u64, Some(body.len() as u64));
            }
            Ok(body)
        }
        .boxed()
    }
}

const V1: &str = "https://models.example.com/ad-detector/1.0.0/model.tflite";
const V2: &str = "https://models.example.com/ad-detector/2.0.0/model.tflite";

fn build_manager(
    temp: &TempDir,
    server: ModelServer,
    store: Arc<dyn ArtifactStore>,
) -> (ArtifactManager, Arc<ModelServer>) {
    let server = Arc::new(server);
    let engine = TransferEngine::new(server.clone(), Arc::new(TransferRegistry::new()));
    let config = ManagerConfig::new(temp.path().join("models")).with_transfer(
        TransferOptions::default()
            .with_retries(2)
            .with_retry_delay(Duration::from_millis(10)),
    );
    (ArtifactManager::new(config, store, engine), server)
}

fn ad_detector(version: &str, url: &str) -> InstallRequest {
    InstallRequest::new(
        "ad-detector",
        version,
        url,
        ModelType::Detection,
        Framework::TensorFlowLite,
    )
    .with_capability(Capability::AdDetection)
    .with_tag("mobile")
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_install_then_verify_checksum() {
    let temp = TempDir::new().unwrap();
    let payload = tflite_bytes(1);
    let expected = sha256_hex(&payload);
    let (manager, _) = build_manager(
        &temp,
        ModelServer::new().serve(V1, payload),
        Arc::new(MemoryStore::new()),
    );

    let result = manager
        .install(
            ad_detector("1.0.0", V1).with_checksum(expected.to_uppercase()),
            &InstallOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.error);
    let record = result.record.unwrap();
    assert_eq!(record.checksum, expected);

    let inspector = Inspector::new();
    assert!(inspector
        .verify_checksum(&record.local_path, &record.checksum)
        .unwrap());
    assert!(!inspector
        .verify_checksum(&record.local_path, &"0".repeat(64))
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_install_conflicts_without_transfer() {
    let temp = TempDir::new().unwrap();
    let (manager, server) = build_manager(
        &temp,
        ModelServer::new().serve(V1, tflite_bytes(1)),
        Arc::new(MemoryStore::new()),
    );

    manager
        .install(ad_detector("1.0.0", V1), &InstallOptions::default())
        .await
        .unwrap();
    let requests_before = server.requests.load(Ordering::SeqCst);

    let err = manager
        .install(ad_detector("1.0.0", V1), &InstallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::AlreadyExists { ref name, ref version }
            if name == "ad-detector" && version == "1.0.0"
    ));
    assert_eq!(server.requests.load(Ordering::SeqCst), requests_before);
}

#[tokio::test]
async fn test_breaking_update_requires_major_and_force() {
    let temp = TempDir::new().unwrap();
    let (manager, _) = build_manager(
        &temp,
        ModelServer::new()
            .serve(V1, tflite_bytes(1))
            .serve(V2, tflite_bytes(2)),
        Arc::new(MemoryStore::new()),
    );

    let current = manager
        .install(ad_detector("1.0.0", V1), &InstallOptions::default())
        .await
        .unwrap()
        .record
        .unwrap();
    manager
        .install(ad_detector("2.0.0", V2), &InstallOptions::default())
        .await
        .unwrap();

    let check = manager.check_for_update(current.id, false).await.unwrap();
    assert_eq!(check.update_type, UpdateType::Major);
    assert!(check.is_breaking_change);
    assert_eq!(check.download_url.as_deref(), Some(V2));

    // Defaults refuse
    let refused = manager
        .update_to_latest(current.id, &UpdateOptions::default())
        .await
        .unwrap();
    assert!(!refused.success);
    assert!(matches!(
        refused.error,
        Some(LifecycleError::PolicyViolation {
            update_type: UpdateType::Major,
            ..
        })
    ));

    // allow_major alone still refuses
    let refused = manager
        .update_to_latest(current.id, &UpdateOptions::default().with_allow_major(true))
        .await
        .unwrap();
    assert!(!refused.success);

    let options = UpdateOptions::default()
        .with_allow_major(true)
        .with_force(true)
        .with_auto_install(true);
    let updated = manager.update_to_latest(current.id, &options).await.unwrap();
    assert!(updated.success, "{:?}", updated.error);
    assert_eq!(updated.old_version, "1.0.0");
    assert_eq!(updated.new_version.as_deref(), Some("2.0.0"));
    assert!(updated.backup_id.is_some());
    assert!(updated.install.unwrap().metadata.unwrap().overwritten);
}

#[test]
fn test_tflite_detected_by_signature_not_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("detector.bin");
    std::fs::write(&path, tflite_bytes(3)).unwrap();

    let inspector = Inspector::new();
    assert_eq!(inspector.detect_format(&path).unwrap(), ModelFormat::TfLite);

    let verdict = inspector.check_compatibility(&path, &Platform::Android, None);
    assert!(verdict.compatible);
    assert_eq!(verdict.framework, Some(Framework::TensorFlowLite));
}

#[tokio::test]
async fn test_install_retries_with_linear_backoff() {
    let temp = TempDir::new().unwrap();
    let (manager, server) = build_manager(
        &temp,
        ModelServer::new().serve(V1, tflite_bytes(1)).failing_first(2),
        Arc::new(MemoryStore::new()),
    );

    let started = Instant::now();
    let result = manager
        .install(ad_detector("1.0.0", V1), &InstallOptions::default())
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.error);
    let transfer = result.transfer.unwrap();
    assert_eq!(transfer.attempts, 3);
    assert_eq!(server.requests.load(Ordering::SeqCst), 3);
    // 10ms * 1 + 10ms * 2
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_batch_outcomes_follow_input_order() {
    let temp = TempDir::new().unwrap();
    let urls: Vec<String> = (0..6)
        .map(|i| format!("https://models.example.com/batch/{i}.tflite"))
        .collect();
    let server = urls
        .iter()
        .enumerate()
        .fold(ModelServer::new(), |server, (i, url)| {
            server.serve(url, tflite_bytes(i as u8))
        });
    let engine = TransferEngine::new(Arc::new(server), Arc::new(TransferRegistry::new()));

    let mut requests: Vec<TransferRequest> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| TransferRequest::new(url.clone(), temp.path().join(format!("{i}.tflite"))))
        .collect();
    requests.push(TransferRequest::new(
        "https://models.example.com/batch/missing.tflite",
        temp.path().join("missing.tflite"),
    ));

    let options = TransferOptions::default()
        .with_retries(0)
        .with_max_concurrent(3);
    let outcomes = engine.transfer_batch(&requests, &options).await;

    assert_eq!(outcomes.len(), requests.len());
    for (request, outcome) in requests.iter().zip(&outcomes) {
        assert_eq!(outcome.file_path, request.destination);
    }
    assert!(outcomes[..6].iter().all(|o| o.success));
    assert!(!outcomes[6].success);
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let catalog = temp.path().join("catalog.json");

    let record = {
        let store = Arc::new(JsonFileStore::open(&catalog).await.unwrap());
        let (manager, _) = build_manager(
            &temp,
            ModelServer::new().serve(V1, tflite_bytes(1)),
            store,
        );
        manager
            .install(ad_detector("1.0.0", V1), &InstallOptions::default())
            .await
            .unwrap()
            .record
            .unwrap()
    };

    let reopened = JsonFileStore::open(&catalog).await.unwrap();
    let found = reopened
        .find_by_name_and_version("ad-detector", "1.0.0")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, record);

    let mobile = reopened
        .find_all(&ArtifactFilter::new().with_tag("mobile"))
        .await
        .unwrap();
    assert_eq!(mobile.len(), 1);
}

/// Serve one canned HTTP/1.1 response.
async fn serve_http_once(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}/models/face-finder.tflite", addr)
}

#[tokio::test]
async fn test_install_over_http() {
    let temp = TempDir::new().unwrap();
    let url = serve_http_once(tflite_bytes(9)).await;
    let manager = ArtifactManager::with_http(
        ManagerConfig::new(temp.path().join("models")),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let result = manager
        .install(
            InstallRequest::new(
                "face-finder",
                "0.3.0",
                url,
                ModelType::Detection,
                Framework::TensorFlowLite,
            ),
            &InstallOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.error);
    let record = result.record.unwrap();
    assert_eq!(
        record.local_path.file_name().unwrap(),
        "face_finder_v0_3_0.tflite"
    );
    assert_eq!(record.file_size, tflite_bytes(9).len() as u64);
}
