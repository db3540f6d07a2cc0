//! The transfer engine: retrieval with retries, cancellation and batching.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::checksum::sha256_hex;
use super::error::{TransferError, TransferResult};
use super::fetcher::{FetchRequest, Fetcher, HttpFetcher};
use super::options::{TransferOptions, TransferRequest};
use super::progress::{TransferProgress, TransferStatus};
use super::registry::{TaskId, TaskJob, TransferRegistry, TransferStats, TransferTask};

/// Result of one transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// Task that performed the transfer.
    pub task_id: TaskId,
    /// Whether the artifact was written to `file_path`.
    pub success: bool,
    /// Final status of the task.
    pub status: TransferStatus,
    /// Destination path.
    pub file_path: PathBuf,
    /// Bytes written (0 on failure).
    pub file_size: u64,
    /// Lowercase hex SHA-256 of the written bytes.
    pub checksum: Option<String>,
    /// Wall-clock time including backoff waits.
    pub duration: Duration,
    /// Attempts made.
    pub attempts: u32,
    /// Failure description.
    pub error: Option<String>,
}

impl TransferOutcome {
    fn failed(
        job: &TaskJob,
        status: TransferStatus,
        error: &TransferError,
        attempts: u32,
        started: Instant,
    ) -> Self {
        Self {
            task_id: job.id,
            success: false,
            status,
            file_path: job.destination.clone(),
            file_size: 0,
            checksum: None,
            duration: started.elapsed(),
            attempts,
            error: Some(error.to_string()),
        }
    }
}

/// Path of the temporary file a body is written to before it is renamed.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".part");
    destination.with_file_name(name)
}

/// Retrieves remote artifacts to local paths.
///
/// Each engine owns the [`TransferRegistry`] it was given; active tasks and
/// statistics are scoped to that registry.
#[derive(Clone)]
pub struct TransferEngine {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<TransferRegistry>,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("registry", &self.registry)
            .finish()
    }
}

impl TransferEngine {
    /// Create an engine over the given fetcher and registry.
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: Arc<TransferRegistry>) -> Self {
        Self { fetcher, registry }
    }

    /// Create an engine using HTTP(S) and a fresh registry.
    pub fn http() -> TransferResult<Self> {
        Ok(Self::new(
            Arc::new(HttpFetcher::new()?),
            Arc::new(TransferRegistry::new()),
        ))
    }

    /// Get the registry backing this engine.
    pub fn registry(&self) -> &Arc<TransferRegistry> {
        &self.registry
    }

    /// Retrieve `url` to `destination`.
    ///
    /// Never returns an error: failures are described by the outcome.
    pub async fn transfer(
        &self,
        url: &str,
        destination: &Path,
        options: &TransferOptions,
    ) -> TransferOutcome {
        let id = self.begin(url, destination, options);
        self.run(id).await
    }

    /// Register a pending task without starting it.
    ///
    /// Use with [`TransferEngine::run`] when the caller needs the task id
    /// before the transfer completes (to pause or cancel it).
    pub fn begin(&self, url: &str, destination: &Path, options: &TransferOptions) -> TaskId {
        let id = self
            .registry
            .register(url, destination.to_path_buf(), options.clone());
        debug!(task_id = %id, url, path = %destination.display(), "Transfer registered");
        id
    }

    /// Run a registered task to completion, failure or interruption.
    pub async fn run(&self, id: TaskId) -> TransferOutcome {
        let started = Instant::now();

        let Some(job) = self.registry.job(id) else {
            return TransferOutcome {
                task_id: id,
                success: false,
                status: TransferStatus::Cancelled,
                file_path: PathBuf::new(),
                file_size: 0,
                checksum: None,
                duration: started.elapsed(),
                attempts: 0,
                error: Some(TransferError::UnknownTask(id).to_string()),
            };
        };

        self.registry.update(id, |task| {
            task.progress.restart();
            task.started_at = Some(Utc::now());
            task.completed_at = None;
            task.last_error = None;
        });

        if let Some(parent) = job.destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(source) = tokio::fs::create_dir_all(parent).await {
                let error = TransferError::Io {
                    path: parent.to_path_buf(),
                    source,
                };
                return self.finish_failed(&job, error, 0, started);
            }
        }

        let backoff = job.options.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.registry.record_attempt();
            debug!(task_id = %id, url = %job.url, attempt, "Starting transfer attempt");

            match self.attempt(&job).await {
                Ok(body) => return self.finish_success(&job, body, attempt, started).await,
                Err(e) if e.is_interruption() || job.cancel.is_cancelled() => {
                    return self.finish_interrupted(&job, attempt, started).await;
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.registry
                        .update(id, |task| task.last_error = Some(reason.clone()));

                    let Some(delay) = backoff.delay_for_attempt(attempt) else {
                        let error = TransferError::Exhausted {
                            url: job.url.clone(),
                            attempts: attempt,
                            last: reason,
                        };
                        return self.finish_failed(&job, error, attempt, started);
                    };

                    warn!(
                        task_id = %id,
                        url = %job.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Transfer attempt failed, retrying"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = job.cancel.cancelled() => {
                            return self.finish_interrupted(&job, attempt, started).await;
                        }
                    }
                }
            }
        }
    }

    async fn attempt(&self, job: &TaskJob) -> TransferResult<Bytes> {
        let attempt_start = Instant::now();
        let id = job.id;
        let registry = Arc::clone(&self.registry);
        let callback = job.options.on_progress.clone();

        let on_chunk = move |received: u64, total: Option<u64>| {
            let snapshot = registry.update(id, |task| {
                task.progress.advance(received, total, attempt_start);
                task.progress.clone()
            });
            if let (Some(snapshot), Some(cb)) = (snapshot, callback.as_ref()) {
                cb(&snapshot);
            }
        };

        let request = FetchRequest {
            url: &job.url,
            headers: &job.options.headers,
            timeout: job.options.timeout,
        };

        tokio::select! {
            biased;
            _ = job.cancel.cancelled() => Err(TransferError::Cancelled),
            result = self.fetcher.fetch(request, &on_chunk, &job.cancel) => result,
        }
    }

    async fn finish_success(
        &self,
        job: &TaskJob,
        body: Bytes,
        attempts: u32,
        started: Instant,
    ) -> TransferOutcome {
        let part = partial_path(&job.destination);

        if let Err(source) = tokio::fs::write(&part, &body).await {
            let _ = tokio::fs::remove_file(&part).await;
            let error = TransferError::Io { path: part, source };
            return self.finish_failed(job, error, attempts, started);
        }

        if job.cancel.is_cancelled() {
            return self.finish_interrupted(job, attempts, started).await;
        }

        if let Err(source) = tokio::fs::rename(&part, &job.destination).await {
            let _ = tokio::fs::remove_file(&part).await;
            let error = TransferError::Io {
                path: job.destination.clone(),
                source,
            };
            return self.finish_failed(job, error, attempts, started);
        }

        let size = body.len() as u64;
        let checksum = sha256_hex(&body);

        self.registry.update(job.id, |task| {
            task.progress.complete(size);
            task.completed_at = Some(Utc::now());
        });
        self.registry.remove(job.id);
        self.registry.record_completed(size);

        info!(
            task_id = %job.id,
            url = %job.url,
            path = %job.destination.display(),
            bytes = size,
            attempts,
            "Transfer complete"
        );

        TransferOutcome {
            task_id: job.id,
            success: true,
            status: TransferStatus::Completed,
            file_path: job.destination.clone(),
            file_size: size,
            checksum: Some(checksum),
            duration: started.elapsed(),
            attempts,
            error: None,
        }
    }

    fn finish_failed(
        &self,
        job: &TaskJob,
        error: TransferError,
        attempts: u32,
        started: Instant,
    ) -> TransferOutcome {
        self.registry.update(job.id, |task| {
            task.progress.status = TransferStatus::Failed;
            task.completed_at = Some(Utc::now());
            task.last_error = Some(error.to_string());
        });
        self.registry.remove(job.id);
        self.registry.record_failed();

        warn!(task_id = %job.id, url = %job.url, attempts, error = %error, "Transfer failed");

        TransferOutcome::failed(job, TransferStatus::Failed, &error, attempts, started)
    }

    async fn finish_interrupted(
        &self,
        job: &TaskJob,
        attempts: u32,
        started: Instant,
    ) -> TransferOutcome {
        let part = partial_path(&job.destination);
        if let Err(e) = tokio::fs::remove_file(&part).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %part.display(), error = %e, "Failed to remove partial file");
            }
        }

        if self.registry.status(job.id) == Some(TransferStatus::Paused) {
            debug!(task_id = %job.id, "Transfer paused");
            return TransferOutcome::failed(
                job,
                TransferStatus::Paused,
                &TransferError::Paused,
                attempts,
                started,
            );
        }

        // Cancelled: `cancel` already removed the task and counted it.
        debug!(task_id = %job.id, "Transfer cancelled");

        TransferOutcome::failed(
            job,
            TransferStatus::Cancelled,
            &TransferError::Cancelled,
            attempts,
            started,
        )
    }

    /// Retrieve a list of artifacts, `options.max_concurrent` at a time.
    ///
    /// Each chunk runs concurrently and the next chunk starts only once the
    /// previous one has fully resolved. Outcomes are in input order.
    pub async fn transfer_batch(
        &self,
        requests: &[TransferRequest],
        options: &TransferOptions,
    ) -> Vec<TransferOutcome> {
        let chunk_size = options.max_concurrent.max(1);
        let mut outcomes = Vec::with_capacity(requests.len());

        for chunk in requests.chunks(chunk_size) {
            let transfers = chunk
                .iter()
                .map(|request| self.transfer(&request.url, &request.destination, options));
            outcomes.extend(join_all(transfers).await);
        }

        outcomes
    }

    /// Cancel a task.
    ///
    /// The task leaves the active set immediately; the running attempt
    /// observes the cancellation at its next checkpoint.
    pub fn cancel(&self, id: TaskId) -> TransferResult<()> {
        let destination = self
            .registry
            .update(id, |task| {
                task.progress.status = TransferStatus::Cancelled;
                task.completed_at = Some(Utc::now());
                task.destination.clone()
            })
            .ok_or(TransferError::UnknownTask(id))?;

        self.registry.signal(id);
        self.registry.remove(id);
        self.registry.record_cancelled();

        let part = partial_path(&destination);
        if part.exists() {
            if let Err(e) = std::fs::remove_file(&part) {
                warn!(path = %part.display(), error = %e, "Failed to remove partial file");
            }
        }

        info!(task_id = %id, "Transfer cancelled");
        Ok(())
    }

    /// Pause an in-progress task.
    pub fn pause(&self, id: TaskId) -> TransferResult<()> {
        let status = self
            .registry
            .update(id, |task| {
                let status = task.progress.status;
                if status == TransferStatus::InProgress {
                    task.progress.status = TransferStatus::Paused;
                }
                status
            })
            .ok_or(TransferError::UnknownTask(id))?;

        if status != TransferStatus::InProgress {
            return Err(TransferError::InvalidState { task: id, status });
        }

        self.registry.signal(id);
        debug!(task_id = %id, "Transfer pause requested");
        Ok(())
    }

    /// Resume a paused task.
    ///
    /// The transfer restarts from byte zero.
    pub async fn resume(&self, id: TaskId) -> TransferResult<TransferOutcome> {
        let status = self
            .registry
            .status(id)
            .ok_or(TransferError::UnknownTask(id))?;
        if status != TransferStatus::Paused {
            return Err(TransferError::InvalidState { task: id, status });
        }

        self.registry.rearm(id);
        debug!(task_id = %id, "Resuming transfer from the start");
        Ok(self.run(id).await)
    }

    /// Get the current progress of an active task.
    pub fn progress(&self, id: TaskId) -> Option<TransferProgress> {
        self.registry.get(id).map(|task| task.progress)
    }

    /// Snapshots of all active tasks.
    pub fn active_tasks(&self) -> Vec<TransferTask> {
        self.registry.active()
    }

    /// Remove tasks in a terminal state from the active set.
    pub fn cleanup(&self) -> usize {
        self.registry.cleanup()
    }

    /// Cumulative statistics for this engine.
    pub fn stats(&self) -> TransferStats {
        self.registry.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use futures::FutureExt;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use crate::transfer::fetcher::ChunkObserver;
    use futures::future::BoxFuture;

    /// Fails the first `failures` attempts with a 503, then serves `payload`.
    struct FlakyFetcher {
        failures: u32,
        calls: AtomicU32,
        payload: &'static [u8],
    }

    impl FlakyFetcher {
        fn new(failures: u32, payload: &'static [u8]) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                payload,
            }
        }
    }

    impl Fetcher for FlakyFetcher {
        fn fetch<'a>(
            &'a self,
            request: FetchRequest<'a>,
            on_chunk: ChunkObserver<'a>,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, TransferResult<Bytes>> {
            async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call <= self.failures {
                    return Err(TransferError::Status {
                        url: request.url.to_string(),
                        status: 503,
                    });
                }
                let total = Some(self.payload.len() as u64);
                let half = self.payload.len() / 2;
                on_chunk(half as u64, total);
                on_chunk(self.payload.len() as u64, total);
                Ok(Bytes::from_static(self.payload))
            }
            .boxed()
        }
    }

    /// Reports one chunk then waits for cancellation, unless released.
    struct StallingFetcher {
        released: AtomicBool,
    }

    impl Fetcher for StallingFetcher {
        fn fetch<'a>(
            &'a self,
            _request: FetchRequest<'a>,
            on_chunk: ChunkObserver<'a>,
            cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, TransferResult<Bytes>> {
            async move {
                if self.released.load(Ordering::SeqCst) {
                    on_chunk(4, Some(4));
                    return Ok(Bytes::from_static(b"done"));
                }
                on_chunk(1, Some(4));
                cancel.cancelled().await;
                Err(TransferError::Cancelled)
            }
            .boxed()
        }
    }

    /// Serves the URL's own text after a delay encoded in the URL.
    struct DelayFetcher;

    impl Fetcher for DelayFetcher {
        fn fetch<'a>(
            &'a self,
            request: FetchRequest<'a>,
            _on_chunk: ChunkObserver<'a>,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, TransferResult<Bytes>> {
            async move {
                let delay_ms: u64 = request
                    .url
                    .rsplit('/')
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Bytes::copy_from_slice(request.url.as_bytes()))
            }
            .boxed()
        }
    }

    fn engine(fetcher: impl Fetcher + 'static) -> TransferEngine {
        TransferEngine::new(Arc::new(fetcher), Arc::new(TransferRegistry::new()))
    }

    fn fast_options() -> TransferOptions {
        TransferOptions::default().with_retry_delay(Duration::from_millis(1))
    }

    async fn wait_for_status(engine: &TransferEngine, id: TaskId, status: TransferStatus) {
        for _ in 0..200 {
            if engine.registry().status(id) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {} never reached {}", id, status);
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/models/a_v1_0_0.onnx")),
            PathBuf::from("/models/a_v1_0_0.onnx.part")
        );
    }

    #[tokio::test]
    async fn test_transfer_writes_file_and_checksum() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested/dir/model.tflite");
        let engine = engine(FlakyFetcher::new(0, b"hello world"));

        let outcome = engine
            .transfer("https://models.example.com/model.tflite", &dest, &fast_options())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.status, TransferStatus::Completed);
        assert_eq!(outcome.file_size, 11);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.checksum.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(!partial_path(&dest).exists());
        assert!(engine.active_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_progress_callbacks_are_non_decreasing() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let options = fast_options().with_progress(Arc::new(move |p: &TransferProgress| {
            seen_clone.lock().push(p.downloaded_bytes);
        }));
        let engine = engine(FlakyFetcher::new(1, b"0123456789"));

        let outcome = engine
            .transfer("https://e/m.bin", &temp.path().join("m.bin"), &options)
            .await;

        assert!(outcome.success);
        let seen = seen.lock();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_retry_then_success_waits_linear_backoff() {
        let temp = TempDir::new().unwrap();
        let engine = engine(FlakyFetcher::new(2, b"payload"));
        let options = TransferOptions::default()
            .with_retries(3)
            .with_retry_delay(Duration::from_millis(20));

        let outcome = engine
            .transfer("https://e/m.onnx", &temp.path().join("m.onnx"), &options)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        // Two waits: 20ms * 1 + 20ms * 2
        assert!(outcome.duration >= Duration::from_millis(60));
        assert_eq!(engine.stats().attempts, 3);
        assert_eq!(engine.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_no_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("m.onnx");
        let engine = engine(FlakyFetcher::new(u32::MAX, b""));

        let outcome = engine
            .transfer("https://e/m.onnx", &dest, &fast_options().with_retries(2))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, TransferStatus::Failed);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.error.unwrap().contains("3 attempts"));
        assert!(!dest.exists());

        let stats = engine.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let temp = TempDir::new().unwrap();
        let engine = engine(DelayFetcher);
        // Earlier entries finish later
        let delays = [40u64, 30, 20, 10, 0];
        let requests: Vec<_> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| {
                TransferRequest::new(
                    format!("https://e/{}", d),
                    temp.path().join(format!("{}.bin", i)),
                )
            })
            .collect();

        let outcomes = engine
            .transfer_batch(&requests, &fast_options().with_max_concurrent(2))
            .await;

        assert_eq!(outcomes.len(), requests.len());
        for (request, outcome) in requests.iter().zip(&outcomes) {
            assert!(outcome.success);
            assert_eq!(outcome.file_path, request.destination);
            assert_eq!(
                std::fs::read_to_string(&outcome.file_path).unwrap(),
                request.url
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_in_progress_transfer() {
        let temp = TempDir::new().unwrap();
        let engine = engine(StallingFetcher {
            released: AtomicBool::new(false),
        });
        let dest = temp.path().join("m.bin");
        let id = engine.begin("https://e/m.bin", &dest, &fast_options());

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.run(id).await });
        wait_for_status(&engine, id, TransferStatus::InProgress).await;

        engine.cancel(id).unwrap();
        let outcome = handle.await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.status, TransferStatus::Cancelled);
        assert!(engine.progress(id).is_none());
        assert_eq!(engine.stats().cancelled, 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_pause_then_resume_restarts() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(StallingFetcher {
            released: AtomicBool::new(false),
        });
        let engine = TransferEngine::new(fetcher.clone(), Arc::new(TransferRegistry::new()));
        let dest = temp.path().join("m.bin");
        let id = engine.begin("https://e/m.bin", &dest, &fast_options());

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.run(id).await });
        wait_for_status(&engine, id, TransferStatus::InProgress).await;

        engine.pause(id).unwrap();
        let paused = handle.await.unwrap();
        assert_eq!(paused.status, TransferStatus::Paused);
        assert_eq!(engine.registry().status(id), Some(TransferStatus::Paused));

        // Pausing again is rejected
        assert!(matches!(
            engine.pause(id),
            Err(TransferError::InvalidState { .. })
        ));

        fetcher.released.store(true, Ordering::SeqCst);
        let resumed = engine.resume(id).await.unwrap();

        assert!(resumed.success);
        assert_eq!(resumed.task_id, id);
        assert_eq!(std::fs::read(&dest).unwrap(), b"done");
        assert!(engine.progress(id).is_none());
    }

    #[tokio::test]
    async fn test_pause_requires_in_progress() {
        let engine = engine(FlakyFetcher::new(0, b"x"));
        let id = engine.begin("https://e/m.bin", Path::new("m.bin"), &fast_options());

        match engine.pause(id) {
            Err(TransferError::InvalidState { status, .. }) => {
                assert_eq!(status, TransferStatus::Pending)
            }
            other => panic!("Expected InvalidState, got {:?}", other),
        }
        assert!(matches!(
            engine.resume(id).await,
            Err(TransferError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_task_operations() {
        let engine = engine(FlakyFetcher::new(0, b"x"));
        assert!(matches!(
            engine.cancel(TaskId(99)),
            Err(TransferError::UnknownTask(TaskId(99)))
        ));
        assert!(matches!(
            engine.pause(TaskId(99)),
            Err(TransferError::UnknownTask(_))
        ));
        let outcome = engine.run(TaskId(99)).await;
        assert!(!outcome.success);
    }
}
