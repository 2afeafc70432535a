//! Bounded command queue and the blocking command worker.
//!
//! Motion calls are long-running and synchronous, so commands are handled
//! on a dedicated blocking worker: a stuck planner call serializes later
//! commands behind the in-flight motion without starving the perception
//! intake or the status reporter.  The queue in front of the worker is
//! bounded with explicit rejection-when-busy; a flooded operator channel
//! produces a logged [`ArmError::Busy`] instead of silently growing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use armos_types::{ArmError, CommandMsg, EventPayload};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::arbitrator::CommandArbitrator;
use crate::bus::{EventBus, Topic};

/// Default depth of the inbound command queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Sending half of the bounded command queue.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<CommandMsg>,
}

impl CommandQueue {
    /// Create a queue of the given depth; the receiving half goes to the
    /// worker.
    pub fn bounded(depth: usize) -> (Self, mpsc::Receiver<CommandMsg>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a command without waiting.
    ///
    /// # Errors
    ///
    /// [`ArmError::Busy`] when the queue is full (the worker is behind an
    /// in-flight motion); [`ArmError::Channel`] when the worker is gone.
    pub fn submit(&self, msg: CommandMsg) -> Result<(), ArmError> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ArmError::Busy,
            mpsc::error::TrySendError::Closed(_) => {
                ArmError::Channel("command worker has shut down".to_string())
            }
        })
    }
}

/// Spawn the blocking worker that drains `rx` into the arbitrator.
///
/// The worker exits when every [`CommandQueue`] handle has been dropped.
pub fn spawn_command_worker(
    mut arbitrator: CommandArbitrator,
    mut rx: mpsc::Receiver<CommandMsg>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        info!("command worker started");
        while let Some(msg) = rx.blocking_recv() {
            debug!(utime = msg.utime, action = %msg.action, "command dequeued");
            arbitrator.submit(&msg);
        }
        info!("command worker stopped");
    })
}

/// Forward commands from the bus onto the bounded queue until `shutdown`
/// flips, logging (not blocking) when the worker is busy.
pub async fn forward_commands(bus: EventBus, queue: CommandQueue, shutdown: Arc<AtomicBool>) {
    let mut rx = bus.subscribe_to(Topic::Commands);
    while let Some(event) = rx.recv().await {
        if shutdown.load(Ordering::Acquire) {
            break;
        }
        let EventPayload::Command(msg) = event.payload else {
            continue;
        };
        match queue.submit(msg) {
            Ok(()) => {}
            Err(ArmError::Busy) => {
                warn!("arm busy; rejecting command");
            }
            Err(e) => {
                warn!(error = %e, "command forwarding stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armos_types::Event;

    fn command(utime: i64) -> CommandMsg {
        CommandMsg {
            utime,
            action: "HOME".to_string(),
            dest: None,
        }
    }

    #[tokio::test]
    async fn submit_fills_up_to_depth_then_rejects() {
        let (queue, _rx) = CommandQueue::bounded(2);
        queue.submit(command(1)).unwrap();
        queue.submit(command(2)).unwrap();
        assert!(matches!(queue.submit(command(3)), Err(ArmError::Busy)));
    }

    #[tokio::test]
    async fn submit_after_worker_shutdown_is_a_channel_error() {
        let (queue, rx) = CommandQueue::bounded(2);
        drop(rx);
        assert!(matches!(
            queue.submit(command(1)),
            Err(ArmError::Channel(_))
        ));
    }

    #[tokio::test]
    async fn forwarder_moves_bus_commands_onto_the_queue() {
        let bus = EventBus::default();
        let (queue, mut rx) = CommandQueue::bounded(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(forward_commands(
            bus.clone(),
            queue,
            Arc::clone(&shutdown),
        ));

        // Give the forwarder a beat to subscribe before publishing.
        tokio::task::yield_now().await;
        bus.publish_to(
            Topic::Commands,
            Event::now("test", EventPayload::Command(command(42))),
        );

        let msg = rx.recv().await.expect("command expected on the queue");
        assert_eq!(msg.utime, 42);

        shutdown.store(true, Ordering::Release);
        bus.publish_to(
            Topic::Commands,
            Event::now("test", EventPayload::Command(command(43))),
        );
        task.await.unwrap();
    }

    #[tokio::test]
    async fn forwarder_ignores_non_command_payloads() {
        let bus = EventBus::default();
        let (queue, mut rx) = CommandQueue::bounded(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(forward_commands(
            bus.clone(),
            queue,
            Arc::clone(&shutdown),
        ));
        tokio::task::yield_now().await;

        bus.publish_to(
            Topic::Commands,
            Event::now(
                "test",
                EventPayload::Halt {
                    reason: "oops".to_string(),
                },
            ),
        );
        bus.publish_to(
            Topic::Commands,
            Event::now("test", EventPayload::Command(command(7))),
        );

        // Only the command payload comes through.
        assert_eq!(rx.recv().await.unwrap().utime, 7);

        shutdown.store(true, Ordering::Release);
        bus.publish_to(
            Topic::Commands,
            Event::now("test", EventPayload::Command(command(8))),
        );
        task.await.unwrap();
    }
}
