#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use batching::{
    BatchFuture, BatchProcessor, Job, JobRequest, JobType, RunConfig, ScheduledTrigger, TickFn,
    TriggerError, TriggerFuture, TriggerProvider,
};

pub fn request(job_type: &str, name: &str) -> JobRequest {
    JobRequest::new(JobType::from(job_type), name)
}

pub fn job(job_type: &str, name: &str) -> Job {
    Job::from_request(request(job_type, name))
}

pub fn names(jobs: &[Job]) -> Vec<String> {
    jobs.iter().map(|j| j.name.clone()).collect()
}

/// Config whose own ticks never fire during a test.
pub fn test_config() -> RunConfig {
    RunConfig::default()
        .with_frequency(3600)
        .with_batch_size(2)
        .with_pacing_secs(0)
}

/// Batches seen by a [`RecordingProcessor`].
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<Vec<Job>>>>);

impl Recorded {
    pub fn batches(&self) -> Vec<Vec<Job>> {
        self.0.lock().unwrap().clone()
    }

    pub fn batch_names(&self) -> Vec<Vec<String>> {
        self.batches().iter().map(|b| names(b)).collect()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Batch processor that waits `delay`, then records the batch.
pub struct RecordingProcessor {
    recorded: Recorded,
    delay: Duration,
}

impl RecordingProcessor {
    pub fn new() -> (Self, Recorded) {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> (Self, Recorded) {
        let recorded = Recorded::default();
        (
            Self {
                recorded: recorded.clone(),
                delay,
            },
            recorded,
        )
    }
}

impl BatchProcessor for RecordingProcessor {
    fn process_and_sleep(&self, batch: Vec<Job>, pacing: Duration) -> BatchFuture {
        let recorded = self.recorded.clone();
        let delay = self.delay + pacing;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            recorded.0.lock().unwrap().push(batch);
        })
    }
}

/// Trigger provider whose ticks are fired by the test.
#[derive(Clone, Default)]
pub struct ManualTrigger {
    on_tick: Arc<Mutex<Option<TickFn>>>,
    scheduled: Arc<Mutex<Vec<Duration>>>,
    fail_create: bool,
    fail_stop: bool,
}

impl ManualTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    /// Run one tick, if a trigger is active.
    pub async fn fire(&self) -> bool {
        let on_tick = self.on_tick.lock().unwrap().clone();
        match on_tick {
            Some(on_tick) => {
                on_tick().await;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.on_tick.lock().unwrap().is_some()
    }

    /// Periods of every trigger scheduled so far.
    pub fn scheduled(&self) -> Vec<Duration> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl TriggerProvider for ManualTrigger {
    fn schedule(&self, period: Duration, on_tick: TickFn) -> TriggerFuture<Box<dyn ScheduledTrigger>> {
        let this = self.clone();
        Box::pin(async move {
            if this.fail_create {
                return Err(TriggerError::Create("scheduler unavailable".into()));
            }
            this.scheduled.lock().unwrap().push(period);
            *this.on_tick.lock().unwrap() = Some(on_tick);
            Ok(Box::new(ManualHandle { trigger: this }) as Box<dyn ScheduledTrigger>)
        })
    }
}

struct ManualHandle {
    trigger: ManualTrigger,
}

impl ScheduledTrigger for ManualHandle {
    fn stop(self: Box<Self>) -> TriggerFuture<()> {
        Box::pin(async move {
            self.trigger.on_tick.lock().unwrap().take();
            if self.trigger.fail_stop {
                return Err(TriggerError::Stop("scheduler wedged".into()));
            }
            Ok(())
        })
    }
}
