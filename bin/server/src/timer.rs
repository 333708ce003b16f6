//! The due-timer sweep loop.

use chrono::Utc;
use copper_sparrow_flow::FlowEngine;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Periodically resumes executions whose delay timers have elapsed.
pub struct TimerSweeper {
    engine: Arc<FlowEngine>,
    poll_interval: Duration,
}

impl TimerSweeper {
    #[must_use]
    pub fn new(engine: Arc<FlowEngine>, poll_interval: Duration) -> Self {
        Self {
            engine,
            poll_interval,
        }
    }

    /// Runs the sweep loop forever.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.engine.resume_due(Utc::now()).await {
                Ok(outcomes) if outcomes.is_empty() => {}
                Ok(outcomes) => {
                    debug!(resumed = outcomes.len(), "resumed due timers");
                }
                Err(error) => {
                    warn!(%error, "timer sweep failed");
                }
            }
        }
    }
}
