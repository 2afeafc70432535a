//! [`StatusReporter`] – fixed-rate heartbeat of the operating state.
//!
//! Fires on its own timer regardless of arbitrator activity, reading the
//! state cell with atomic loads only.  Purely observational; it never
//! mutates system state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use armos_types::{Event, EventPayload, StatusMsg};
use chrono::Utc;
use tracing::trace;

use crate::bus::{EventBus, Topic};
use crate::state::StateHandle;

/// Default heartbeat period: 10 Hz.
pub const DEFAULT_STATUS_PERIOD: Duration = Duration::from_millis(100);

/// Emits the current operating state and held-object id at a fixed period.
pub struct StatusReporter {
    state: StateHandle,
    bus: EventBus,
    period: Duration,
}

impl StatusReporter {
    pub fn new(state: StateHandle, bus: EventBus, period: Duration) -> Self {
        Self { state, bus, period }
    }

    /// Build one status message from the current cell values.
    pub fn report(&self) -> StatusMsg {
        StatusMsg {
            utime: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            state: self.state.get().name().to_string(),
            held_object: self
                .state
                .held_object()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string()),
        }
    }

    /// Publish heartbeats until `shutdown` flips.
    pub async fn run(self, shutdown: Arc<AtomicBool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            let msg = self.report();
            trace!(state = %msg.state, held = %msg.held_object, "status heartbeat");
            self.bus.publish_to(
                Topic::Status,
                Event::now("armos-motion::reporter", EventPayload::Status(msg)),
            );
        }
    }
}
