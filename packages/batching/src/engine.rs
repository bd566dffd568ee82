//! The batching engine: submission, batch cuts and lifecycle.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use batching_core::{BatchEvent, BatchFrequency, BatchId, BatchSize, Job, JobId, JobRequest};
use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, broadcast};

use crate::config::RunConfig;
use crate::dispatch::DispatchTracker;
use crate::error::BatchingResult;
use crate::preprocess::JobProcess;
use crate::processor::BatchProcessor;
use crate::queue::JobQueue;
use crate::trigger::{ActorTrigger, ScheduledTrigger, TickFn, TriggerProvider};

/// State shared between the engine handle and the tick callback.
struct BatchingInner {
    /// Current configuration; read at every tick and every start.
    config: RwLock<RunConfig>,
    /// Jobs waiting for a batch.
    queue: JobQueue,
    /// Preprocessing pipeline, when enabled.
    pipeline: RwLock<Option<Arc<JobProcess>>>,
    /// Consumer of dispatched batches.
    processor: Arc<dyn BatchProcessor>,
    /// Factory for periodic triggers.
    trigger_provider: Arc<dyn TriggerProvider>,
    /// Active trigger, if running.
    trigger: Mutex<Option<Box<dyn ScheduledTrigger>>>,
    /// In-flight dispatch tasks.
    dispatches: Arc<DispatchTracker>,
    /// Event broadcaster.
    event_tx: broadcast::Sender<BatchEvent>,
}

impl BatchingInner {
    fn config(&self) -> RwLockReadGuard<'_, RunConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut(&self) -> RwLockWriteGuard<'_, RunConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pipeline(&self) -> Option<Arc<JobProcess>> {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_pipeline(&self, pipeline: Option<Arc<JobProcess>>) {
        *self.pipeline.write().unwrap_or_else(PoisonError::into_inner) = pipeline;
    }

    /// Broadcast an event.
    fn broadcast(&self, event: BatchEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Create a trigger for the current configuration.
    async fn schedule(self: &Arc<Self>) -> BatchingResult<Box<dyn ScheduledTrigger>> {
        let config = self.config().clone();
        config.validate()?;

        let engine = Arc::downgrade(self);
        let on_tick: TickFn = Arc::new(move || -> BoxFuture<'static, ()> {
            let engine = engine.clone();
            Box::pin(async move {
                if let Some(engine) = engine.upgrade() {
                    engine.post().await;
                }
            })
        });

        let trigger = self
            .trigger_provider
            .schedule(config.period(), on_tick)
            .await?;

        tracing::info!(
            "Batching started: every {}s, up to {} jobs per batch",
            config.frequency,
            config.batch_size
        );
        self.broadcast(BatchEvent::TriggerStarted {
            frequency_secs: config.frequency,
            batch_size: config.batch_size,
            timestamp: Utc::now(),
        });

        Ok(trigger)
    }

    async fn stop_trigger(&self, trigger: Box<dyn ScheduledTrigger>) -> BatchingResult<()> {
        trigger.stop().await?;
        tracing::info!("Batching trigger stopped");
        self.broadcast(BatchEvent::TriggerStopped {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// One dispatch cycle.
    async fn post(&self) {
        if self.queue.is_empty() {
            tracing::debug!("No jobs to process");
            self.broadcast(BatchEvent::TickSkipped {
                timestamp: Utc::now(),
            });
            return;
        }

        if let Some(pipeline) = self.pipeline() {
            let pending = self.queue.drain();
            let jobs_in = pending.len();
            let preprocessed = pipeline.process(pending).await;
            let jobs_out = preprocessed.jobs.len();

            for failure in preprocessed.failures {
                self.broadcast(BatchEvent::PreprocessFailed {
                    job_type: failure.job_type,
                    error: failure.error.to_string(),
                    timestamp: Utc::now(),
                });
            }

            // Jobs submitted while the pipeline ran stay behind the processed ones.
            self.queue.restore_front(preprocessed.jobs);

            tracing::debug!(jobs_in, jobs_out, "Preprocessed pending jobs");
            self.broadcast(BatchEvent::Preprocessed {
                jobs_in,
                jobs_out,
                timestamp: Utc::now(),
            });
        }

        let (batch_size, pacing) = {
            let config = self.config();
            (config.batch_size, config.pacing())
        };

        let batch = self.queue.dequeue(batch_size);
        if batch.is_empty() {
            tracing::debug!("Nothing left to dispatch after preprocessing");
            return;
        }

        let batch_id = BatchId::new();
        let job_count = batch.len();
        tracing::info!(%batch_id, job_count, "Dispatching batch");
        self.broadcast(BatchEvent::BatchDispatched {
            batch_id,
            job_ids: batch.iter().map(|job| job.id).collect(),
            timestamp: Utc::now(),
        });

        let processor = Arc::clone(&self.processor);
        let event_tx = self.event_tx.clone();
        self.dispatches.spawn(async move {
            let started = std::time::Instant::now();
            processor.process_and_sleep(batch, pacing).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            tracing::info!(%batch_id, job_count, duration_ms, "Batch processed");
            let _ = event_tx.send(BatchEvent::BatchCompleted {
                batch_id,
                job_count,
                duration_ms,
                timestamp: Utc::now(),
            });
        });
    }
}

/// Micro-batching engine.
///
/// Jobs submitted through [`Batching::take`] wait in a FIFO queue. Once
/// started, a periodic trigger cuts a batch of at most `batch_size` jobs every
/// `frequency` seconds and hands it to the [`BatchProcessor`] on a background
/// task. [`Batching::shut_down`] stops the trigger and waits for those tasks.
///
/// The handle is cheap to clone; all clones drive the same engine. Call
/// `shut_down` before dropping the last handle of a started engine.
#[derive(Clone)]
pub struct Batching {
    inner: Arc<BatchingInner>,
}

impl Batching {
    /// Create an engine that ticks with the default actor-based trigger.
    pub fn new<P: BatchProcessor>(config: RunConfig, processor: P) -> Self {
        Self::with_trigger(config, processor, ActorTrigger)
    }

    /// Create an engine with a custom trigger provider.
    pub fn with_trigger<P, T>(config: RunConfig, processor: P, trigger_provider: T) -> Self
    where
        P: BatchProcessor,
        T: TriggerProvider,
    {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(BatchingInner {
                queue: JobQueue::with_capacity_limit(config.max_queue_size),
                config: RwLock::new(config),
                pipeline: RwLock::new(None),
                processor: Arc::new(processor),
                trigger_provider: Arc::new(trigger_provider),
                trigger: Mutex::new(None),
                dispatches: DispatchTracker::new(),
                event_tx,
            }),
        }
    }

    /// Create an engine from a JSON configuration file.
    pub async fn from_config_file<P: BatchProcessor>(
        path: impl AsRef<Path>,
        processor: P,
    ) -> BatchingResult<Self> {
        let config = RunConfig::load(path).await?;
        Ok(Self::new(config, processor))
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Create a job from the request and queue it.
    pub fn take(&self, request: JobRequest) -> BatchingResult<Job> {
        let job = Job::from_request(request);
        if let Err(e) = self.inner.queue.enqueue(job.clone()) {
            tracing::warn!(
                job_type = %job.job_type,
                capacity = ?self.inner.queue.capacity(),
                queued = self.inner.queue.len(),
                "Job refused: {}",
                e
            );
            return Err(e.into());
        }

        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job queued");
        self.inner.broadcast(BatchEvent::JobQueued {
            job: job.clone(),
            timestamp: Utc::now(),
        });

        Ok(job)
    }

    /// Look up a job that has not been dispatched yet.
    pub fn job_info(&self, id: JobId) -> BatchingResult<Job> {
        Ok(self.inner.queue.find(id)?)
    }

    /// Number of jobs waiting for a batch.
    pub fn pending(&self) -> usize {
        self.inner.queue.len()
    }

    /// Number of dispatched batches still being processed.
    pub fn outstanding_batches(&self) -> usize {
        self.inner.dispatches.outstanding()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> RunConfig {
        self.inner.config().clone()
    }

    pub fn frequency(&self) -> BatchFrequency {
        self.inner.config().batch_frequency()
    }

    pub fn batch_size(&self) -> BatchSize {
        self.inner.config().batch_size_setting()
    }

    /// Change the tick interval. Takes effect on the next start or restart.
    pub fn set_frequency(&self, frequency: BatchFrequency) {
        self.inner.config_mut().frequency = frequency.frequency;
    }

    /// Change the batch size. Read by every tick from now on.
    pub fn set_batch_size(&self, batch_size: BatchSize) {
        self.inner.config_mut().batch_size = batch_size.batch_size;
    }

    /// Turn preprocessing with the built-in chains on or off.
    ///
    /// Turning it off drops the pipeline; a pass already running finishes.
    pub fn set_preprocess(&self, on: bool) {
        let mut pipeline = self
            .inner
            .pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if on {
            if pipeline.is_some() {
                tracing::warn!("Preprocessing is already on");
                return;
            }
            *pipeline = Some(Arc::new(JobProcess::with_builtin_processors()));
            tracing::info!("Added preprocessing");
        } else {
            *pipeline = None;
            tracing::info!("Removed preprocessing");
        }
    }

    /// Turn preprocessing on with a caller-built pipeline, replacing any current one.
    pub fn use_pipeline(&self, pipeline: JobProcess) {
        self.inner.set_pipeline(Some(Arc::new(pipeline)));
        tracing::info!("Added custom preprocessing");
    }

    pub fn is_preprocessing(&self) -> bool {
        self.inner.pipeline().is_some()
    }

    /// Check whether a trigger is active.
    pub async fn is_running(&self) -> bool {
        self.inner.trigger.lock().await.is_some()
    }

    /// Start ticking with the current configuration.
    ///
    /// Starting a running engine is a no-op. Fails if the configuration is
    /// invalid or the trigger cannot be created; the engine stays stopped.
    pub async fn start(&self) -> BatchingResult<()> {
        let mut trigger = self.inner.trigger.lock().await;
        if trigger.is_some() {
            tracing::warn!("Batching is already running");
            return Ok(());
        }

        *trigger = Some(self.inner.schedule().await?);
        Ok(())
    }

    /// Stop the running trigger and start a new one from the current configuration.
    ///
    /// Does nothing when the engine is not running.
    pub async fn restart(&self) -> BatchingResult<()> {
        let mut trigger = self.inner.trigger.lock().await;
        let Some(current) = trigger.take() else {
            tracing::debug!("Restart ignored, batching is not running");
            return Ok(());
        };

        self.inner.stop_trigger(current).await?;
        *trigger = Some(self.inner.schedule().await?);
        Ok(())
    }

    /// Stop the trigger and wait for every dispatched batch to finish.
    ///
    /// Waits for in-flight batches even when stopping the trigger fails; that
    /// failure is returned afterwards.
    pub async fn shut_down(&self) -> BatchingResult<()> {
        let stopped = match self.inner.trigger.lock().await.take() {
            Some(trigger) => self.inner.stop_trigger(trigger).await,
            None => Ok(()),
        };

        let outstanding = self.inner.dispatches.outstanding();
        if outstanding > 0 {
            tracing::info!("Waiting for {} outstanding batches", outstanding);
        }
        self.inner.dispatches.wait_idle().await;
        tracing::info!("Batching shut down");

        stopped
    }

    /// Run one dispatch cycle now: preprocess if enabled, then cut and
    /// dispatch one batch. Returns once the batch is handed off.
    pub async fn post(&self) {
        self.inner.post().await;
    }
}
