//! Folder watcher: owns the notify subscription and the processing task.
//!
//! Lifecycle: `Idle` -> `start()` -> `Running` -> `stop()` (or the event
//! stream closing) -> `Stopped`. `Stopped` is terminal.
//!
//! The notify callback runs on notify's own thread and only forwards: events
//! and errors go into two unbounded channels, and a single tokio task drains
//! them in delivery order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, Instrument};

use aurora_core::error::{AuroraError, Result};

use crate::watch::pipeline::EventProcessor;

/// Directory under observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    path: PathBuf,
}

impl WatchTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Running,
    Stopped,
}

impl WatcherState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WatcherState::Idle,
            1 => WatcherState::Running,
            _ => WatcherState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            WatcherState::Idle => 0,
            WatcherState::Running => 1,
            WatcherState::Stopped => 2,
        }
    }
}

/// Watcher lifecycle state shared between the owner, the processing task
/// (which marks itself stopped when the event stream ends) and readiness probes.
#[derive(Debug)]
pub struct WatcherStatus(AtomicU8);

impl Default for WatcherStatus {
    fn default() -> Self {
        Self::new(WatcherState::Idle)
    }
}

impl WatcherStatus {
    fn new(state: WatcherState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> WatcherState {
        WatcherState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WatcherState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

struct Running {
    watcher: RecommendedWatcher,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Watches one directory and feeds eligible files through the processor.
pub struct FolderWatcher {
    target: WatchTarget,
    processor: Arc<EventProcessor>,
    state: Arc<WatcherStatus>,
    running: Option<Running>,
}

impl FolderWatcher {
    pub fn new(target: WatchTarget, processor: Arc<EventProcessor>) -> Self {
        Self::with_status(target, processor, Arc::new(WatcherStatus::default()))
    }

    /// Watcher publishing its lifecycle into `status`, which others may observe.
    pub fn with_status(
        target: WatchTarget,
        processor: Arc<EventProcessor>,
        status: Arc<WatcherStatus>,
    ) -> Self {
        Self {
            target,
            processor,
            state: status,
            running: None,
        }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn state(&self) -> WatcherState {
        self.state.get()
    }

    /// Subscribe to the target directory and spawn the processing task.
    ///
    /// Must be called from within a tokio runtime. Subscription failures are
    /// returned as `Subscription` errors and never retried.
    #[instrument(name = "folder_watcher", skip(self), fields(path = %self.target.path().display()))]
    pub fn start(&mut self) -> Result<()> {
        let state = self.state();
        if state != WatcherState::Idle {
            return Err(AuroraError::Internal(format!(
                "folder watcher cannot start from state {state:?}"
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel::<Event>();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel::<notify::Error>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let delivered = match res {
                Ok(event) => events_tx.send(event).is_ok(),
                Err(e) => errors_tx.send(e).is_ok(),
            };
            if !delivered {
                trace!("processing task gone; dropping notification");
            }
        })
        .map_err(|e| AuroraError::Subscription(format!("create watcher failed: {e}")))?;

        watcher
            .watch(self.target.path(), RecursiveMode::NonRecursive)
            .map_err(|e| {
                AuroraError::Subscription(format!(
                    "watch {} failed: {e}",
                    self.target.path().display()
                ))
            })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        self.state.set(WatcherState::Running);
        let handle = tokio::spawn(
            run_loop(
                Arc::clone(&self.processor),
                events_rx,
                errors_rx,
                stop_rx,
                Arc::clone(&self.state),
            )
            .in_current_span(),
        );

        self.running = Some(Running { watcher, stop_tx, handle });
        info!(extension = %self.processor.extension(), "watching metrics folder");
        Ok(())
    }

    /// Close the subscription and wait for the processing task to finish.
    /// Idempotent.
    pub async fn stop(&mut self) {
        let Some(Running { watcher, stop_tx, handle }) = self.running.take() else {
            self.state.set(WatcherState::Stopped);
            return;
        };

        let _ = stop_tx.send(());
        drop(watcher);
        if let Err(e) = handle.await {
            error!(?e, "folder watcher task failed");
        }
        self.state.set(WatcherState::Stopped);
        info!(path = %self.target.path().display(), "folder watcher stopped");
    }
}

/// Processing loop. Exits on stop, or when the event stream closes.
async fn run_loop(
    processor: Arc<EventProcessor>,
    mut events_rx: mpsc::UnboundedReceiver<Event>,
    mut errors_rx: mpsc::UnboundedReceiver<notify::Error>,
    mut stop_rx: oneshot::Receiver<()>,
    state: Arc<WatcherStatus>,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                debug!("stop requested");
                break;
            }

            maybe_event = events_rx.recv() => {
                let Some(event) = maybe_event else {
                    debug!("event stream closed");
                    break;
                };
                processor.respond(&event).await;
            }

            Some(e) = errors_rx.recv() => {
                let err = AuroraError::Notification(e.to_string());
                error!(code = err.code().as_str(), error = %err, "watcher error");
            }
        }
    }
    state.set(WatcherState::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::ExporterMetrics;
    use crate::registry::MetricRegistry;
    use notify::event::{CreateKind, EventKind};
    use std::time::Duration;

    fn processor() -> Arc<EventProcessor> {
        let metrics = Arc::new(ExporterMetrics::new("aurora", 0.0));
        let registry = Arc::new(MetricRegistry::new());
        Arc::new(EventProcessor::new(registry, metrics, ".txt"))
    }

    #[tokio::test]
    async fn missing_directory_is_a_subscription_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = WatchTarget::new(dir.path().join("does-not-exist"));
        let mut w = FolderWatcher::new(target, processor());

        let err = w.start().unwrap_err();
        assert_eq!(err.code().as_str(), "SUBSCRIPTION");
        assert!(err.code().is_fatal());
        assert_eq!(w.state(), WatcherState::Idle);
    }

    #[tokio::test]
    async fn start_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = FolderWatcher::new(WatchTarget::new(dir.path()), processor());
        assert_eq!(w.state(), WatcherState::Idle);

        w.start().unwrap();
        assert_eq!(w.state(), WatcherState::Running);

        let again = w.start().unwrap_err();
        assert_eq!(again.code().as_str(), "INTERNAL");

        w.stop().await;
        assert_eq!(w.state(), WatcherState::Stopped);
        w.stop().await;
        assert_eq!(w.state(), WatcherState::Stopped);
        assert!(w.start().is_err());
    }

    #[tokio::test]
    async fn shared_status_follows_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let status = Arc::new(WatcherStatus::default());
        let mut w = FolderWatcher::with_status(WatchTarget::new(dir.path()), processor(), Arc::clone(&status));
        assert_eq!(status.get(), WatcherState::Idle);

        w.start().unwrap();
        assert_eq!(status.get(), WatcherState::Running);

        w.stop().await;
        assert_eq!(status.get(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn closed_event_stream_ends_loop() {
        let p = processor();
        let state = Arc::new(WatcherStatus::new(WatcherState::Running));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel::<notify::Error>();
        let (_stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(run_loop(Arc::clone(&p), events_rx, errors_rx, stop_rx, Arc::clone(&state)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "queued 4\n").unwrap();
        events_tx
            .send(Event::new(EventKind::Create(CreateKind::File)).add_path(path))
            .unwrap();
        errors_tx.send(notify::Error::generic("queue overflow")).unwrap();
        drop(events_tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop did not exit")
            .unwrap();
        assert_eq!(state.get(), WatcherState::Stopped);
        assert_eq!(p.registry().get("queued").unwrap().value(), 4.0);
    }

    #[tokio::test]
    async fn notification_errors_do_not_stop_the_loop() {
        let p = processor();
        let state = Arc::new(WatcherStatus::new(WatcherState::Running));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel::<notify::Error>();
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(run_loop(Arc::clone(&p), events_rx, errors_rx, stop_rx, Arc::clone(&state)));

        errors_tx.send(notify::Error::generic("first")).unwrap();
        drop(errors_tx);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("after.txt");
        std::fs::write(&path, "after_error 2\n").unwrap();
        events_tx
            .send(Event::new(EventKind::Create(CreateKind::File)).add_path(path))
            .unwrap();

        for _ in 0..100 {
            if p.registry().get("after_error").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(p.registry().get("after_error").unwrap().value(), 2.0);
        assert_eq!(state.get(), WatcherState::Running);

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(state.get(), WatcherState::Stopped);
    }
}
