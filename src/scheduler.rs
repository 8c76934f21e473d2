use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, error, info, warn};

use crate::ingest_pipeline::{CycleOutcome, IngestPipeline};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FAULT_BACKOFF: Duration = Duration::from_secs(30);

/// The two delays the scheduler can wait between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Normal cadence, measured from the end of one cycle to the start of the next
    pub interval: Duration,
    /// Escalated delay after a loop-level fault
    pub fault_backoff: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            fault_backoff: DEFAULT_FAULT_BACKOFF,
        }
    }
}

/// Which of the configured delays follows a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDelay {
    Normal,
    Backoff,
}

impl ScheduleConfig {
    pub fn delay(&self, next: NextDelay) -> Duration {
        match next {
            NextDelay::Normal => self.interval,
            NextDelay::Backoff => self.fault_backoff,
        }
    }
}

/// Scheduler state between and during cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// A cycle task is executing
    Running,
    /// Sleeping before the next cycle
    Waiting(NextDelay),
}

/// What happened to one scheduled cycle
#[derive(Debug)]
pub enum LoopEvent {
    /// The cycle ran to completion
    Completed(CycleOutcome),
    /// The cycle reported an error; it produced nothing
    CycleFailed(anyhow::Error),
    /// The cycle task itself died (panic or cancellation)
    Fault(String),
}

impl LoopEvent {
    pub fn next_delay(&self) -> NextDelay {
        match self {
            LoopEvent::Completed(_) | LoopEvent::CycleFailed(_) => NextDelay::Normal,
            LoopEvent::Fault(_) => NextDelay::Backoff,
        }
    }
}

/// Drives the ingestion pipeline on a fixed cadence
///
/// Cycles never overlap: each one runs in its own task and the scheduler
/// waits for it before sleeping. Errors returned by a cycle keep the normal
/// cadence; a task that panics escalates to the fault backoff.
pub struct Scheduler {
    pipeline: Arc<IngestPipeline>,
    config: ScheduleConfig,
    state: SchedulerState,
    cycles_run: u64,
}

impl Scheduler {
    pub fn new(pipeline: Arc<IngestPipeline>, config: ScheduleConfig) -> Self {
        Self {
            pipeline,
            config,
            state: SchedulerState::Waiting(NextDelay::Normal),
            cycles_run: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Run a single cycle in its own task and classify the result
    pub async fn tick(&mut self) -> LoopEvent {
        self.state = SchedulerState::Running;
        self.cycles_run += 1;

        let pipeline = self.pipeline.clone();
        let span = tracing::info_span!("ingest_cycle", cycle = self.cycles_run);
        let handle = tokio::spawn(async move { pipeline.run_cycle().await }.instrument(span));

        let event = match handle.await {
            Ok(Ok(outcome)) => LoopEvent::Completed(outcome),
            Ok(Err(e)) => LoopEvent::CycleFailed(e),
            Err(join_error) => LoopEvent::Fault(join_error.to_string()),
        };

        self.record(&event);
        self.state = SchedulerState::Waiting(event.next_delay());
        event
    }

    fn record(&self, event: &LoopEvent) {
        match event {
            LoopEvent::Completed(CycleOutcome::Written {
                ingestion_time,
                count,
            }) => {
                metrics::counter!("ingest.cycle.completed_total").increment(1);
                info!(
                    "Cycle {} stored {} flights at {}",
                    self.cycles_run, count, ingestion_time
                );
            }
            LoopEvent::Completed(CycleOutcome::NoFlights) => {
                metrics::counter!("ingest.cycle.empty_total").increment(1);
                info!("Cycle {} produced no flights", self.cycles_run);
            }
            LoopEvent::CycleFailed(e) => {
                metrics::counter!("ingest.cycle.failed_total").increment(1);
                error!("Cycle {} failed: {:#}", self.cycles_run, e);
            }
            LoopEvent::Fault(reason) => {
                metrics::counter!("ingest.loop.fault_total").increment(1);
                error!(
                    "Error in ingestion loop (cycle {}): {} - backing off for {:?}",
                    self.cycles_run, reason, self.config.fault_backoff
                );
            }
        }
    }

    /// Run exactly `cycles` cycles, sleeping between them but not after the last
    pub async fn run_cycles(&mut self, cycles: u64) -> Vec<LoopEvent> {
        let mut events = Vec::new();
        for n in 0..cycles {
            let event = self.tick().await;
            let delay = self.config.delay(event.next_delay());
            events.push(event);
            if n + 1 < cycles {
                tokio::time::sleep(delay).await;
            }
        }
        events
    }

    /// Run until the process is terminated
    pub async fn run(mut self) {
        info!(
            "Fetching flight data every {:?} (fault backoff {:?})",
            self.config.interval, self.config.fault_backoff
        );

        loop {
            let event = self.tick().await;
            let next = event.next_delay();
            if next == NextDelay::Backoff {
                warn!("Escalating to fault backoff");
            }
            tokio::time::sleep(self.config.delay(next)).await;
        }
    }
}
