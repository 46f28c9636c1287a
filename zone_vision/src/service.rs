// THEORY:
// The `service` module owns the continuous capture loop. It is a two-state
// machine, Idle or Running, wrapped around one dedicated worker thread.
//
// Lifecycle:
// 1.  **start (Idle -> Running)**: The frame source is opened on the caller's
//     thread. If that fails the error is returned and the service stays Idle.
//     The worker is spawned next and receives the open source over a oneshot
//     channel once it exists. If the spawn fails the source is closed and kept,
//     so a later `start()` can try again.
// 2.  **Running**: The worker pulls a frame, runs it through the pipeline and
//     publishes the snapshot, over and over. An iteration with no frame is
//     skipped after a short sleep. The worker never waits on readers.
// 3.  **stop (Running -> Idle)**: A stop flag is raised and observed at the top
//     of the next iteration, so the frame in flight always completes. The worker
//     closes the source and hands it back through its join handle, ready for the
//     next `start()`.
//
// `start()` while Running and `stop()` while Idle do nothing.

use crate::core_modules::frame_source::FrameSource;
use crate::error::{Result, VisionError};
use crate::pipeline::DetectionPipeline;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

const WORKER_THREAD_NAME: &str = "zone-vision-worker";

/// The two lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Running,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Idle => f.write_str("idle"),
            ServiceState::Running => f.write_str("running"),
        }
    }
}

type BoxedSource = Box<dyn FrameSource>;

struct Worker {
    stop: Arc<AtomicBool>,
    /// Yields `None` when the worker never received a source.
    handle: JoinHandle<Option<BoxedSource>>,
}

/// Drives a [`DetectionPipeline`] from a [`FrameSource`] on a background thread.
pub struct VisionService {
    pipeline: Arc<DetectionPipeline>,
    /// Present while Idle; moved into the worker while Running.
    source: Option<BoxedSource>,
    worker: Option<Worker>,
    worker_stack_size: Option<usize>,
}

impl VisionService {
    pub fn new(pipeline: Arc<DetectionPipeline>, source: impl FrameSource + 'static) -> Self {
        Self {
            pipeline,
            source: Some(Box::new(source)),
            worker: None,
            worker_stack_size: None,
        }
    }

    /// Stack size for the worker thread, in bytes. Defaults to the platform's.
    pub fn with_worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = Some(bytes);
        self
    }

    pub fn pipeline(&self) -> &Arc<DetectionPipeline> {
        &self.pipeline
    }

    pub fn state(&self) -> ServiceState {
        if self.worker.is_some() {
            ServiceState::Running
        } else {
            ServiceState::Idle
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.pipeline.frames_processed()
    }

    /// Opens the frame source and starts the worker.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            debug!("start ignored, already running");
            return Ok(());
        }

        let mut source = self.source.take().ok_or_else(|| {
            VisionError::FrameSourceUnavailable(
                "frame source was lost when the worker panicked".into(),
            )
        })?;

        if let Err(e) = source.open() {
            warn!(error = %e, "frame source failed to open");
            self.source = Some(source);
            return Err(e);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let pipeline = Arc::clone(&self.pipeline);
        let (handoff, inbox) = oneshot::channel::<BoxedSource>();

        let mut builder = thread::Builder::new().name(WORKER_THREAD_NAME.to_string());
        if let Some(bytes) = self.worker_stack_size {
            builder = builder.stack_size(bytes);
        }
        let spawned = builder.spawn(move || {
            let source = inbox.blocking_recv().ok()?;
            Some(run_worker(pipeline, source, worker_stop))
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "failed to spawn vision worker");
                source.close();
                self.source = Some(source);
                return Err(VisionError::WorkerSpawn(e));
            }
        };

        if let Err(mut source) = handoff.send(source) {
            source.close();
            self.source = Some(source);
            let _ = handle.join();
            return Err(VisionError::FrameSourceUnavailable(
                "vision worker exited before receiving the frame source".into(),
            ));
        }

        self.worker = Some(Worker { stop, handle });
        info!("vision service running");
        Ok(())
    }

    /// Signals the worker, waits for its current frame, and returns to Idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            debug!("stop ignored, already idle");
            return;
        };

        worker.stop.store(true, Ordering::SeqCst);
        match worker.handle.join() {
            Ok(Some(source)) => self.source = Some(source),
            Ok(None) => warn!("vision worker exited before receiving the frame source"),
            Err(_) => error!("vision worker panicked; frame source dropped"),
        }
        info!(frames = self.frames_processed(), "vision service idle");
    }
}

impl Drop for VisionService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    pipeline: Arc<DetectionPipeline>,
    mut source: BoxedSource,
    stop: Arc<AtomicBool>,
) -> BoxedSource {
    let backoff = pipeline.config().idle_backoff();
    debug!("vision worker started");

    while !stop.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(Some(frame)) => {
                pipeline.process_frame(frame);
            }
            Ok(None) => thread::sleep(backoff),
            Err(e) => {
                warn!(error = %e, "frame capture failed, skipping iteration");
                thread::sleep(backoff);
            }
        }
    }

    source.close();
    debug!("vision worker exiting");
    source
}
