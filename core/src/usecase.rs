//! Entry points for presentation code.
//!
//! # Design
//! A use case hops onto a dedicated I/O runtime before doing any I/O, so the
//! caller's (rendering) thread never runs the fetch itself, even when the
//! caller is a single-threaded event loop. The caller awaits the result and
//! resumes on its own task. Dropping the caller's future aborts the
//! background work.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::FetchError;
use crate::repository::DestinationRepository;
use crate::types::DestinationResponse;

const IO_WORKER_THREADS: usize = 2;

#[async_trait]
pub trait UseCase<P, T>: Send + Sync
where
    P: Send + 'static,
    T: Send + 'static,
{
    async fn run(&self, params: P) -> Result<T, FetchError>;

    /// `None` on any failure.
    async fn invoke(&self, params: P) -> Option<T> {
        self.run(params).await.ok()
    }
}

/// A multi-thread runtime reserved for I/O, shut down without blocking when
/// dropped, so it can be released from inside async code.
#[derive(Debug)]
pub struct IoRuntime {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl IoRuntime {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(IO_WORKER_THREADS)
            .thread_name("trip-io")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for IoRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Fetches the destination list on the background runtime.
pub struct GetDestinations<R: ?Sized> {
    repository: Arc<R>,
    background: Handle,
    _owned: Option<Arc<IoRuntime>>,
}

impl<R> GetDestinations<R>
where
    R: DestinationRepository + ?Sized + 'static,
{
    /// `background` must belong to a runtime whose workers are not the
    /// caller's thread, typically a shared [`IoRuntime`].
    pub fn new(repository: Arc<R>, background: Handle) -> Self {
        Self {
            repository,
            background,
            _owned: None,
        }
    }

    /// Runs fetches on an existing I/O runtime, keeping it alive for as long
    /// as this use case exists.
    pub fn on_io_runtime(repository: Arc<R>, runtime: Arc<IoRuntime>) -> Self {
        Self {
            repository,
            background: runtime.handle().clone(),
            _owned: Some(runtime),
        }
    }

    /// Starts a dedicated I/O runtime for this use case.
    pub fn with_io_runtime(repository: Arc<R>) -> std::io::Result<Self> {
        Ok(Self::on_io_runtime(repository, Arc::new(IoRuntime::new()?)))
    }
}

/// Aborts the wrapped task when dropped before completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl<R> UseCase<String, DestinationResponse> for GetDestinations<R>
where
    R: DestinationRepository + ?Sized + 'static,
{
    /// `params` is reserved for server-side filtering and currently unused.
    async fn run(&self, params: String) -> Result<DestinationResponse, FetchError> {
        debug!(params = %params, "running GetDestinations");
        let repository = Arc::clone(&self.repository);
        let mut task = AbortOnDrop(
            self.background
                .spawn(async move { repository.fetch_destinations().await }),
        );
        match (&mut task.0).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(FetchError::Network("fetch task cancelled".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::ThreadId;

    use parking_lot::Mutex;

    struct FakeRepository {
        outcome: Result<DestinationResponse, FetchError>,
        calls: AtomicUsize,
        thread: Mutex<Option<ThreadId>>,
    }

    impl FakeRepository {
        fn new(outcome: Result<DestinationResponse, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                thread: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl DestinationRepository for FakeRepository {
        async fn fetch_destinations(&self) -> Result<DestinationResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.thread.lock() = Some(std::thread::current().id());
            self.outcome.clone()
        }
    }

    struct PanickingRepository;

    #[async_trait]
    impl DestinationRepository for PanickingRepository {
        async fn fetch_destinations(&self) -> Result<DestinationResponse, FetchError> {
            panic!("repository blew up");
        }
    }

    #[tokio::test]
    async fn returns_repository_result_unchanged() {
        let repo = FakeRepository::new(Ok(DestinationResponse::default()));
        let use_case = GetDestinations::with_io_runtime(repo.clone()).unwrap();

        assert_eq!(use_case.run(String::new()).await, Ok(DestinationResponse::default()));
        assert_eq!(use_case.invoke("ignored".to_string()).await, Some(DestinationResponse::default()));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_is_absent_through_invoke() {
        let repo = FakeRepository::new(Err(FetchError::Http {
            status: 503,
            body: String::new(),
        }));
        let use_case = GetDestinations::with_io_runtime(repo).unwrap();

        assert_eq!(use_case.invoke(String::new()).await, None);
        assert_eq!(
            use_case.run(String::new()).await.unwrap_err().status(),
            Some(503)
        );
    }

    #[test]
    fn runs_on_the_background_runtime() {
        let background = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("trip-io")
            .enable_all()
            .build()
            .unwrap();
        let foreground = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let repo = FakeRepository::new(Ok(DestinationResponse::default()));
        let use_case = GetDestinations::new(repo.clone(), background.handle().clone());
        let result = foreground.block_on(use_case.run(String::new()));

        assert!(result.is_ok());
        let fetch_thread = (*repo.thread.lock()).unwrap();
        assert_ne!(fetch_thread, std::thread::current().id());
    }

    #[tokio::test]
    #[should_panic(expected = "repository blew up")]
    async fn repository_panic_is_fatal_for_the_caller() {
        let use_case = GetDestinations::with_io_runtime(Arc::new(PanickingRepository)).unwrap();
        let _ = use_case.run(String::new()).await;
    }

    #[test]
    fn single_threaded_caller_never_runs_the_fetch() {
        let foreground = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let repo = FakeRepository::new(Ok(DestinationResponse::default()));
        let use_case = GetDestinations::with_io_runtime(repo.clone()).unwrap();

        let caller = foreground.block_on(async { std::thread::current().id() });
        assert!(foreground.block_on(use_case.run(String::new())).is_ok());
        let fetch_thread = (*repo.thread.lock()).unwrap();
        assert_ne!(fetch_thread, caller);
    }

    #[tokio::test]
    async fn use_cases_can_share_one_io_runtime() {
        let runtime = Arc::new(IoRuntime::new().unwrap());
        let repo = FakeRepository::new(Ok(DestinationResponse::default()));
        let first = GetDestinations::on_io_runtime(repo.clone(), runtime.clone());
        let second = GetDestinations::on_io_runtime(repo.clone(), runtime.clone());

        assert!(first.invoke(String::new()).await.is_some());
        drop(first);
        assert!(second.invoke(String::new()).await.is_some());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn accepts_trait_objects() {
        let repo: Arc<dyn DestinationRepository> =
            FakeRepository::new(Ok(DestinationResponse::default()));
        let use_case = GetDestinations::with_io_runtime(repo).unwrap();
        assert!(use_case.invoke(String::new()).await.is_some());
    }
}
