use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::FutureExt;
use pb_core::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default time in-flight work gets to finish after [`AsyncRunner::stop`].
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub const RUNNER_THREAD_NAME: &str = "postblog-runner";

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct RunnerHandle {
    sender: mpsc::UnboundedSender<Job>,
    thread: JoinHandle<()>,
}

impl RunnerHandle {
    fn is_alive(&self) -> bool {
        !self.sender.is_closed() && !self.thread.is_finished()
    }
}

/// Background event loop on a dedicated thread.
///
/// Callers hand it futures from synchronous code. Every submitted future is
/// driven on the runner thread, and exactly one of its callbacks is invoked
/// there when it settles. Callbacks that touch UI state must marshal back to
/// the UI thread themselves.
pub struct AsyncRunner {
    handle: Mutex<Option<RunnerHandle>>,
    shutdown_grace: Duration,
}

impl Default for AsyncRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRunner {
    pub fn new() -> Self {
        Self::with_shutdown_grace(DEFAULT_SHUTDOWN_GRACE)
    }

    pub fn with_shutdown_grace(shutdown_grace: Duration) -> Self {
        Self {
            handle: Mutex::new(None),
            shutdown_grace,
        }
    }

    /// Starts the event loop thread. No-op when already running.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(RunnerHandle::is_alive) {
            return Ok(());
        }
        *handle = Some(spawn_loop(self.shutdown_grace)?);
        info!("Background runner started");
        Ok(())
    }

    /// Stops accepting work and waits for in-flight tasks up to the grace
    /// period. Tasks still running after that are dropped.
    pub fn stop(&self) {
        let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        let RunnerHandle { sender, thread } = handle;
        drop(sender);
        if thread.thread().id() == thread::current().id() {
            // Called from a callback; the loop winds down on its own.
            return;
        }
        if thread.join().is_err() {
            error!("Background runner thread panicked");
        }
        info!("Background runner stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RunnerHandle::is_alive)
    }

    /// Runs `future` in the background, starting the runner if needed.
    ///
    /// Exactly one of `on_success` and `on_error` is called once on the
    /// runner thread. A panic inside `future` is reported through
    /// `on_error`. An `Err` here means the work was never scheduled and
    /// neither callback will run. Work still pending when [`stop`](Self::stop)
    /// runs out of shutdown grace is aborted, and then neither callback runs
    /// either.
    pub fn run<F, T, S, E>(&self, future: F, on_success: S, on_error: E) -> Result<()>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
        S: FnOnce(T) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        self.enqueue(Box::pin(async move {
            match guarded(future).await {
                Ok(value) => on_success(value),
                Err(e) => {
                    error!("Background task failed: {}", e);
                    on_error(e)
                }
            }
        }))
    }

    /// Channel-style variant of [`run`](Self::run): the outcome arrives on
    /// the returned receiver.
    pub fn submit<F, T>(&self, future: F) -> Result<oneshot::Receiver<Result<T>>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::pin(async move {
            if tx.send(guarded(future).await).is_err() {
                debug!("Background task finished after its receiver was dropped");
            }
        }))?;
        Ok(rx)
    }

    fn enqueue(&self, job: Job) -> Result<()> {
        self.start()?;
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = handle
            .as_ref()
            .map(|h| &h.sender)
            .ok_or_else(|| Error::Runtime("background runner is not running".to_string()))?;
        sender
            .send(job)
            .map_err(|_| Error::Runtime("background runner is shutting down".to_string()))
    }
}

impl Drop for AsyncRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_loop(shutdown_grace: Duration) -> Result<RunnerHandle> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

    let thread = thread::Builder::new()
        .name(RUNNER_THREAD_NAME.to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let mut tasks = JoinSet::new();
                loop {
                    tokio::select! {
                        job = receiver.recv() => match job {
                            Some(job) => {
                                tasks.spawn(job);
                            }
                            None => break,
                        },
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                            if let Err(e) = joined {
                                error!("Background task aborted: {}", e);
                            }
                        }
                    }
                }

                let drained = tokio::time::timeout(shutdown_grace, async {
                    while tasks.join_next().await.is_some() {}
                })
                .await;
                if drained.is_err() {
                    warn!(
                        "Dropping {} background task(s) still running after {:?}",
                        tasks.len(),
                        shutdown_grace
                    );
                    tasks.abort_all();
                }
            });
            runtime.shutdown_background();
        })?;

    Ok(RunnerHandle { sender, thread })
}

/// Awaits `future`, turning a panic into `Error::Runtime`.
async fn guarded<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Runtime(format!(
            "background task panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
