//! [`SafetyGate`] – the human-confirmation checkpoint between planning and
//! physical execution.
//!
//! When confirmation is required, every approved-for-execution plan first
//! passes a yes/no prompt.  The gate is deliberately fail-closed: only an
//! answer that clearly reads as "yes" approves; "no", an empty line,
//! garbled input, and prompt I/O failures all reject.  There is no timeout;
//! with no operator at the console the prompt blocks indefinitely, which is
//! the intended behaviour for a gate guarding real motion.

use std::io::{self, BufRead, Write};

use armos_types::{GateDecision, MotionPlan};
use tracing::info;

/// Source of the operator's yes/no answer.
///
/// The binary wires in [`StdinPrompt`]; tests script the replies.
pub trait ConfirmationPrompt: Send {
    /// Put `question` in front of the operator and return their reply.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Blocking prompt on the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{question} ")?;
        stdout.flush()?;

        let mut reply = String::new();
        io::stdin().lock().read_line(&mut reply)?;
        Ok(reply)
    }
}

/// The plan-confirmation gate.
pub struct SafetyGate {
    require_confirmation: bool,
    prompt: Box<dyn ConfirmationPrompt>,
}

impl SafetyGate {
    /// Build a gate.  With `require_confirmation` false the prompt is never
    /// consulted and every plan is approved.
    pub fn new(require_confirmation: bool, prompt: Box<dyn ConfirmationPrompt>) -> Self {
        Self {
            require_confirmation,
            prompt,
        }
    }

    /// A gate that approves everything, for headless and test runs.
    pub fn auto_approve() -> Self {
        Self::new(false, Box::new(StdinPrompt))
    }

    /// Ask for confirmation of `plan`.
    ///
    /// Decision table on the trimmed, lowercased reply: leading `y` means
    /// approved, leading `n` means rejected, and anything else (empty,
    /// "maybe", I/O error) rejects.  Ambiguity never approves.
    pub fn confirm(&mut self, plan: &MotionPlan) -> GateDecision {
        if !self.require_confirmation {
            return GateDecision::Approved;
        }

        let reply = match self.prompt.ask("Is this motion plan okay? [y/n]") {
            Ok(reply) => reply,
            Err(e) => {
                info!(error = %e, "confirmation prompt failed; rejecting plan");
                return GateDecision::Rejected;
            }
        };

        match reply.trim().to_ascii_lowercase().chars().next() {
            Some('y') => {
                info!(plan = %plan.id, "plan accepted; starting execution");
                GateDecision::Approved
            }
            Some('n') => {
                info!(plan = %plan.id, "plan rejected; cancelling execution");
                GateDecision::Rejected
            }
            _ => {
                info!(plan = %plan.id, "confusing confirmation input; cancelling execution");
                GateDecision::Rejected
            }
        }
    }
}
