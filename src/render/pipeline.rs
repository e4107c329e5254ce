//! Triple-buffered hand-off between render workers and presentation.
//!
//! A fixed pool of [`BufferPair`]s cycles through three places:
//!
//! ```text
//!   available ──claim──▶ render worker ──publish──▶ completed
//!       ▲                     │ (failed)                 │
//!       │◀────────────────────┘ (or panicked)       present
//!       │                                                ▼
//!       └──────────────── recycle previous ◀──────── displayed
//! ```
//!
//! Render requests run on dedicated worker threads. Each worker blocks until
//! a pair is available, runs the request inside a rayon pool for its data
//! parallel work, then publishes the pair. Presentation never blocks: it
//! takes a completed pair if there is one, shows it, and returns the pair it
//! showed before to the available pool. The displayed pair is owned by the
//! pipeline and never handed to a worker, so it cannot change under the
//! display.
//!
//! Nothing orders requests against each other; with several workers a later
//! request may publish first.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, select, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex};

use super::framebuffer::BufferPair;
use crate::error::{RenderError, Result};

/// A render request: fills the pair it is given.
pub type RenderJob = Box<dyn FnOnce(&mut BufferPair) -> Result<()> + Send + 'static>;

/// State shared by the workers and the owning pipeline.
struct Shared {
    available_tx: Sender<BufferPair>,
    available_rx: Receiver<BufferPair>,
    completed_tx: Sender<BufferPair>,
    completed_rx: Receiver<BufferPair>,
    /// Never sent on; disconnects when the pipeline shuts down, waking every
    /// blocked claim.
    shutdown_rx: Receiver<()>,
    closed: AtomicBool,
    in_flight: Mutex<usize>,
    idle: Condvar,
    displayed: Mutex<Option<BufferPair>>,
}

impl Shared {
    /// Blocks until a pair is available or the pipeline closes.
    fn claim(&self) -> Result<BufferPair> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RenderError::PipelineClosed);
        }
        select! {
            recv(self.available_rx) -> pair => pair.map_err(|_| RenderError::PipelineClosed),
            recv(self.shutdown_rx) -> _ => Err(RenderError::PipelineClosed),
        }
    }

    fn recycle(&self, pair: BufferPair) {
        // Capacity equals the pool size, so this only fails if a pair was
        // duplicated, which ownership rules out.
        if self.available_tx.try_send(pair).is_err() {
            warn!("available pool full, dropping buffer pair");
        }
    }

    fn publish(&self, pair: BufferPair) {
        if let Err(e) = self.completed_tx.try_send(pair) {
            warn!("completed queue full, recycling buffer pair");
            self.recycle(e.into_inner());
        }
    }

    fn begin(&self) {
        *self.in_flight.lock() += 1;
    }

    fn finish(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.idle.notify_all();
        }
    }
}

/// Marks one request finished when dropped, even if the job panicked.
struct InFlight<'a>(&'a Shared);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// A bounded pool of buffer pairs with render workers and a presentation
/// end.
pub struct FramePipeline {
    shared: Arc<Shared>,
    jobs: Mutex<Option<Sender<RenderJob>>>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    buffer_count: usize,
}

impl FramePipeline {
    /// Creates `buffer_count` pairs of `width`×`height` and starts
    /// `worker_threads` render workers sharing a rayon pool of the same size.
    pub fn new(
        width: u32,
        height: u32,
        buffer_count: usize,
        worker_threads: usize,
    ) -> Result<Self> {
        let buffer_count = buffer_count.max(1);
        let worker_threads = worker_threads.max(1);

        let (available_tx, available_rx) = bounded(buffer_count);
        let (completed_tx, completed_rx) = bounded(buffer_count);
        let (shutdown_tx, shutdown_rx) = bounded(0);
        for id in 0..buffer_count {
            // Freshly created with room for every pair
            let _ = available_tx.try_send(BufferPair::new(id, width, height));
        }

        let shared = Arc::new(Shared {
            available_tx,
            available_rx,
            completed_tx,
            completed_rx,
            shutdown_rx,
            closed: AtomicBool::new(false),
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
            displayed: Mutex::new(None),
        });

        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(worker_threads)
                .thread_name(|i| format!("softrast-raster-{i}"))
                .build()?,
        );

        let (jobs_tx, jobs_rx) = unbounded::<RenderJob>();
        let mut workers = Vec::with_capacity(worker_threads);
        for i in 0..worker_threads {
            let shared = Arc::clone(&shared);
            let jobs = jobs_rx.clone();
            let pool = Arc::clone(&pool);
            let handle = thread::Builder::new()
                .name(format!("softrast-render-{i}"))
                .spawn(move || worker_loop(&shared, &jobs, &pool))?;
            workers.push(handle);
        }

        info!(
            "frame pipeline started: {buffer_count} pairs of {width}x{height}, {worker_threads} workers"
        );

        Ok(Self {
            shared,
            jobs: Mutex::new(Some(jobs_tx)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            workers: Mutex::new(workers),
            buffer_count,
        })
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Queues a render request. It runs once a worker is free and a pair is
    /// available; a job that returns an error gives its pair back unpublished.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&mut BufferPair) -> Result<()> + Send + 'static,
    {
        let jobs = self.jobs.lock();
        let Some(sender) = jobs.as_ref().filter(|_| !self.is_closed()) else {
            return Err(RenderError::PipelineClosed);
        };
        self.shared.begin();
        if sender.send(Box::new(job)).is_err() {
            self.shared.finish();
            return Err(RenderError::PipelineClosed);
        }
        Ok(())
    }

    /// Shows the newest completed frame, if any, without blocking.
    ///
    /// The sink sees the pair read-only. Returns whether a frame was
    /// presented; the previously displayed pair goes back to the pool.
    pub fn present<F>(&self, sink: F) -> bool
    where
        F: FnOnce(&BufferPair),
    {
        let Ok(pair) = self.shared.completed_rx.try_recv() else {
            return false;
        };
        sink(&pair);
        let previous = self.shared.displayed.lock().replace(pair);
        if let Some(previous) = previous {
            self.shared.recycle(previous);
        }
        true
    }

    /// Runs `f` on the currently displayed pair, e.g. to redraw after an
    /// expose event.
    pub fn with_displayed<R>(&self, f: impl FnOnce(&BufferPair) -> R) -> Option<R> {
        self.shared.displayed.lock().as_ref().map(f)
    }

    /// Requests submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        *self.shared.in_flight.lock()
    }

    /// Blocks until every submitted request has finished.
    pub fn wait_idle(&self) {
        let mut in_flight = self.shared.in_flight.lock();
        while *in_flight > 0 {
            self.shared.idle.wait(&mut in_flight);
        }
    }

    /// Closes the pipeline and waits for the workers to drain.
    ///
    /// Blocked claims fail with [`RenderError::PipelineClosed`], queued
    /// requests are dropped and later submissions are rejected. Requests
    /// already rendering run to completion. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown_tx.lock().take();
        self.jobs.lock().take();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            let name = handle.thread().name().unwrap_or("render").to_owned();
            if handle.join().is_err() {
                error!("{name} panicked");
            }
        }
        info!("frame pipeline shut down");
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs jobs until the job channel disconnects.
fn worker_loop(shared: &Shared, jobs: &Receiver<RenderJob>, pool: &rayon::ThreadPool) {
    while let Ok(job) = jobs.recv() {
        let _in_flight = InFlight(shared);
        let mut pair = match shared.claim() {
            Ok(pair) => pair,
            Err(e) => {
                debug!("dropping render request: {e}");
                continue;
            }
        };

        // a panicking job must not take the worker or the pair down with it
        match panic::catch_unwind(AssertUnwindSafe(|| pool.install(|| job(&mut pair)))) {
            Ok(Ok(())) => shared.publish(pair),
            Ok(Err(e)) => {
                error!("render on pair {} failed: {e}", pair.id());
                shared.recycle(pair);
            }
            Err(_) => {
                error!("render on pair {} panicked", pair.id());
                shared.recycle(pair);
            }
        }
    }
    debug!(
        "{} exiting",
        thread::current().name().unwrap_or("render worker")
    );
}
