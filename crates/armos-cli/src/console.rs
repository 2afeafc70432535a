//! Operator console: one stdin, two consumers.
//!
//! Commands and safety-gate confirmations both arrive on the process's
//! stdin, so a single reader thread owns it and routes each line: while a
//! confirmation is pending the line answers the gate, otherwise it is
//! parsed as a command and published onto the bus.  Without the routing,
//! the command reader would steal the gate's "y"/"n" answer.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use armos_motion::{ConfirmationPrompt, EventBus, Topic};
use armos_types::{CommandMsg, Event, EventPayload, Vec3};
use chrono::Utc;
use colored::Colorize;
use tracing::warn;

/// Slot holding the reply channel of an in-flight confirmation, if any.
#[derive(Clone, Default)]
pub struct PendingAnswer {
    slot: Arc<Mutex<Option<std_mpsc::Sender<String>>>>,
}

impl PendingAnswer {
    pub fn new() -> Self {
        Self::default()
    }

    fn install(&self, tx: std_mpsc::Sender<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn take(&self) -> Option<std_mpsc::Sender<String>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Safety-gate prompt backed by the console router.
///
/// `ask` parks the command worker until the operator's next line arrives;
/// there is deliberately no timeout.
pub struct ConsolePrompt {
    pending: PendingAnswer,
}

impl ConsolePrompt {
    pub fn new(pending: PendingAnswer) -> Self {
        Self { pending }
    }
}

impl ConfirmationPrompt for ConsolePrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let (tx, rx) = std_mpsc::channel();
        self.pending.install(tx);
        println!("{} ", question.yellow().bold());
        rx.recv()
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))
    }
}

/// Parse one console line into a command message.
///
/// The first token is the action tag; a DROP may be followed by three
/// destination coordinates (`DROP 0.4 0.0 0.75`).  Returns `None` for an
/// empty line.
pub fn parse_command_line(line: &str) -> Option<CommandMsg> {
    let mut tokens = line.split_whitespace();
    let action = tokens.next()?.to_string();

    let coords: Vec<f64> = tokens.filter_map(|t| t.parse().ok()).collect();
    let dest = match coords.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    };

    Some(CommandMsg {
        utime: Utc::now().timestamp_micros(),
        action,
        dest,
    })
}

/// Spawn the console reader thread.
///
/// Lines are routed to a pending confirmation when one exists, otherwise
/// published as commands.  `quit` (or stdin closing) requests shutdown.
pub fn spawn_console(
    bus: EventBus,
    pending: PendingAnswer,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "console read failed");
                    break;
                }
            };

            if let Some(tx) = pending.take() {
                // Ignore a send failure: the worker gave up on the answer.
                let _ = tx.send(line);
                continue;
            }

            if line.trim().eq_ignore_ascii_case("quit") {
                shutdown.store(true, Ordering::Release);
                break;
            }

            match parse_command_line(&line) {
                Some(msg) => {
                    bus.publish_to(
                        Topic::Commands,
                        Event::now("armos-cli::console", EventPayload::Command(msg)),
                    );
                }
                None => continue,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_action() {
        let msg = parse_command_line("HOME").unwrap();
        assert_eq!(msg.action, "HOME");
        assert_eq!(msg.dest, None);
        assert!(msg.utime > 0);
    }

    #[test]
    fn parse_drop_with_destination() {
        let msg = parse_command_line("DROP 0.4 -0.1 0.75").unwrap();
        assert_eq!(msg.action, "DROP");
        assert_eq!(msg.dest, Some(Vec3::new(0.4, -0.1, 0.75)));
    }

    #[test]
    fn parse_ignores_partial_coordinates() {
        let msg = parse_command_line("DROP 0.4 0.1").unwrap();
        assert_eq!(msg.dest, None);
    }

    #[test]
    fn parse_empty_line_is_none() {
        assert!(parse_command_line("").is_none());
        assert!(parse_command_line("   ").is_none());
    }

    #[test]
    fn consecutive_commands_get_distinct_timestamps() {
        let a = parse_command_line("HOME").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = parse_command_line("HOME").unwrap();
        assert!(b.utime > a.utime);
    }

    #[test]
    fn pending_answer_routes_a_reply_to_the_prompt() {
        let pending = PendingAnswer::new();
        let mut prompt = ConsolePrompt::new(pending.clone());

        let asker = thread::spawn(move || prompt.ask("Is this motion plan okay? [y/n]"));

        // Wait for the prompt to install its reply channel, then answer the
        // way the console thread would.
        let tx = loop {
            if let Some(tx) = pending.take() {
                break tx;
            }
            thread::yield_now();
        };
        tx.send("y".to_string()).unwrap();

        assert_eq!(asker.join().unwrap().unwrap(), "y");
    }

    #[test]
    fn prompt_fails_when_the_console_goes_away() {
        let pending = PendingAnswer::new();
        let mut prompt = ConsolePrompt::new(pending.clone());

        let asker = thread::spawn(move || prompt.ask("Is this motion plan okay? [y/n]"));

        // Dropping the reply channel simulates a closed console.
        let tx = loop {
            if let Some(tx) = pending.take() {
                break tx;
            }
            thread::yield_now();
        };
        drop(tx);

        assert!(asker.join().unwrap().is_err());
    }
}
