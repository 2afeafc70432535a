//! Simulated perception feed and the cache intake task.
//!
//! Without a real vision pipeline on the bus, the sim feed publishes a
//! small static tabletop scene at a fixed period so the motion stack has
//! something to point at and plan around.  The intake task is the wiring
//! that exists in every deployment, simulated or not: it drains the
//! Perception topic into the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use armos_motion::{EventBus, Topic};
use armos_perception::PerceptionCache;
use armos_types::{
    Dimensions, Event, EventPayload, ObjectObservation, ObservationFrame, Quat, SupportSurface,
    Vec3,
};
use tracing::debug;

/// The fixed scene the sim feed reports: two blocks on a table at z ≈ 0.72.
fn demo_frame() -> ObservationFrame {
    ObservationFrame {
        objects: vec![
            ObjectObservation {
                id: 1,
                position: Vec3::new(0.55, -0.12, 0.72),
                orientation: Quat::identity(),
                size: Dimensions::new(0.05, 0.05, 0.11),
            },
            ObjectObservation {
                id: 2,
                position: Vec3::new(0.62, 0.15, 0.72),
                orientation: Quat::identity(),
                size: Dimensions::new(0.07, 0.04, 0.08),
            },
        ],
        table: SupportSurface::new([0.0, 0.0, 1.0, -0.72]),
    }
}

/// Publish the demo scene onto the Perception topic until `shutdown` flips.
pub async fn run_sim_feed(bus: EventBus, period: Duration, shutdown: Arc<AtomicBool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        bus.publish_to(
            Topic::Perception,
            Event::now(
                "armos-cli::sim_feed",
                EventPayload::Observations(demo_frame()),
            ),
        );
    }
}

/// Drain observation frames from the bus into the perception cache.
pub async fn run_perception_intake(
    bus: EventBus,
    cache: Arc<PerceptionCache>,
    shutdown: Arc<AtomicBool>,
) {
    let mut rx = bus.subscribe_to(Topic::Perception);
    while let Some(event) = rx.recv().await {
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        if let EventPayload::Observations(frame) = event.payload {
            debug!(objects = frame.objects.len(), "observation frame received");
            cache.update(&frame);
        }
    }
}
