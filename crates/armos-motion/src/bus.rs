//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  This is the *internal* routing fabric between tasks in one
//! process; the external message transport is out of scope for this crate.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::Perception`] | Observation frames from the perception feed |
//! | [`Topic::Commands`] | Inbound operator commands |
//! | [`Topic::Status`] | Fixed-rate status heartbeats |

use armos_types::Event;
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (buffered events before old ones are dropped
/// for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// First-class routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Observation frames produced by the perception feed.
    Perception,
    /// Inbound operator commands.
    Commands,
    /// Status heartbeats emitted by the reporter.
    Status,
}

/// Shared event bus.  Clone it cheaply; all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    perception: broadcast::Sender<Event>,
    commands: broadcast::Sender<Event>,
    status: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus; `capacity` applies to every topic channel
    /// independently.
    pub fn new(capacity: usize) -> Self {
        let (perception, _) = broadcast::channel(capacity);
        let (commands, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self {
            perception,
            commands,
            status,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// No subscribers is a normal condition, not an error: the status
    /// reporter keeps publishing whether or not anyone listens.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        match self.topic_sender(topic).send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => 0,
        }
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Perception => &self.perception,
            Topic::Commands => &self.commands,
            Topic::Status => &self.status,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// A lagged subscriber logs a warning and keeps going with the oldest
    /// still-buffered event; `None` means the bus has shut down.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is buffered.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
