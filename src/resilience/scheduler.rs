//! Outbound request scheduler
//!
//! Serializes dispatch of upstream calls through a FIFO queue. A worker loop
//! enforces a rolling one-second ceiling and a minimum spacing between
//! consecutive dispatches, then runs each task under a bounded-concurrency
//! semaphore. A task failure is returned to its own caller; the scheduler
//! never retries.

use crate::config::SchedulerSettings;
use crate::errors::{GatewayError, GatewayResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(1);

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

fn shutdown_error() -> GatewayError {
	GatewayError::ServiceUnavailable {
		status_code: 503,
		reason: "request scheduler is shut down".to_string(),
	}
}

/// FIFO dispatcher with rate ceiling and burst control
pub struct RequestScheduler {
	tx: mpsc::UnboundedSender<Job>,
	cancel: CancellationToken,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl RequestScheduler {
	/// Create the scheduler and start its worker loop
	pub fn new(settings: SchedulerSettings) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let cancel = CancellationToken::new();
		let worker = tokio::spawn(worker_loop(rx, settings, cancel.clone()));

		Self {
			tx,
			cancel,
			worker: Mutex::new(Some(worker)),
		}
	}

	/// Queue a task and wait for its result
	///
	/// Tasks dispatch strictly in arrival order. The returned future suspends
	/// while the task waits for a dispatch slot and while it runs.
	pub async fn schedule<T, F>(&self, task: F) -> GatewayResult<T>
	where
		T: Send + 'static,
		F: Future<Output = GatewayResult<T>> + Send + 'static,
	{
		let (result_tx, result_rx) = oneshot::channel();
		let job: Job = Box::pin(async move {
			let _ = result_tx.send(task.await);
		});

		self.tx.send(job).map_err(|_| shutdown_error())?;

		// A dropped sender means the worker shut down with the task queued
		result_rx.await.map_err(|_| shutdown_error())?
	}

	/// Stop the worker loop; queued tasks are rejected to their callers
	pub async fn shutdown(&self) {
		self.cancel.cancel();
		if let Some(worker) = self.worker.lock().await.take() {
			let _ = worker.await;
		}
	}
}

async fn worker_loop(
	mut rx: mpsc::UnboundedReceiver<Job>,
	settings: SchedulerSettings,
	cancel: CancellationToken,
) {
	let rps = settings.requests_per_second.max(1);
	let min_gap = if settings.burst_per_second == 0 {
		Duration::ZERO
	} else {
		Duration::from_secs_f64(1.0 / settings.burst_per_second as f64)
	};
	let semaphore = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));

	let mut window_start = Instant::now();
	let mut issued_in_window: u32 = 0;
	let mut last_dispatch: Option<Instant> = None;

	loop {
		let job = tokio::select! {
			_ = cancel.cancelled() => break,
			job = rx.recv() => match job {
				Some(job) => job,
				None => break,
			},
		};

		// Rolling one-second window against the per-second ceiling
		if window_start.elapsed() >= WINDOW {
			window_start = Instant::now();
			issued_in_window = 0;
		}
		if issued_in_window >= rps {
			debug!("Rate ceiling of {}/s reached, waiting for window reset", rps);
			sleep_until(window_start + WINDOW).await;
			window_start = Instant::now();
			issued_in_window = 0;
		}

		// Burst control: minimum spacing between consecutive dispatches
		if let Some(prev) = last_dispatch {
			let since = prev.elapsed();
			if since < min_gap {
				sleep(min_gap - since).await;
			}
		}

		let permit = match Arc::clone(&semaphore).acquire_owned().await {
			Ok(permit) => permit,
			Err(_) => break,
		};

		issued_in_window += 1;
		last_dispatch = Some(Instant::now());

		tokio::spawn(async move {
			job.await;
			drop(permit);
		});
	}

	debug!("Request scheduler worker stopped");
}
