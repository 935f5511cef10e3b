use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::pipeline::{Pipeline, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Startup,
    Interval,
    OnDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { report: RunReport },
    Failed { error: String },
}

/// Result of the most recent run, published to anyone watching.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub trigger: Trigger,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Starts pipeline runs in the background. Runs never overlap: a trigger that
/// arrives while one is in flight is skipped.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    last_run: Arc<watch::Sender<Option<RunSummary>>>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Arc<Self> {
        let (tx, _rx) = watch::channel(None);
        Arc::new(Self {
            pipeline,
            last_run: Arc::new(tx),
        })
    }

    /// Spawns a run and returns immediately. Failures are logged and
    /// published; they never reach the caller.
    pub fn trigger(&self, trigger: Trigger) -> TriggerOutcome {
        let Some(guard) = self.pipeline.try_begin() else {
            info!(?trigger, "pipeline run already in progress, skipping trigger");
            return TriggerOutcome::AlreadyRunning;
        };

        info!(?trigger, "starting pipeline run");
        let pipeline = self.pipeline.clone();
        let last_run = self.last_run.clone();
        tokio::spawn(async move {
            let outcome = match pipeline.run_claimed(guard).await {
                Ok(report) => RunOutcome::Completed { report },
                Err(err) => {
                    error!(?trigger, error = %err, "pipeline run failed");
                    RunOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };
            last_run.send_replace(Some(RunSummary {
                trigger,
                finished_at: Utc::now(),
                outcome,
            }));
        });
        TriggerOutcome::Started
    }

    pub fn last_run(&self) -> Option<RunSummary> {
        self.last_run.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RunSummary>> {
        self.last_run.subscribe()
    }

    /// Fires once now, then every `period`.
    pub fn start(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        self.trigger(Trigger::Startup);
        self.spawn_interval(period)
    }

    pub fn spawn_interval(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.trigger(Trigger::Interval);
            }
        })
    }
}
