//! `armos-motion` – command arbitration and the motion-execution state
//! machine.
//!
//! This is the core of the stack: everything between an inbound command
//! and the calls into the Motion Planning Service boundary lives here.
//!
//! # Modules
//!
//! - [`state`] – [`StateCell`][state::StateCell]: the atomically-updated
//!   single source of truth for the current [`OperatingState`][armos_types::OperatingState]
//!   and the held-object id.  Written only on the command worker; read by
//!   any thread without locks.
//! - [`bus`] – [`EventBus`][bus::EventBus]: typed, topic-routed
//!   publish/subscribe channels connecting the perception intake, command
//!   sources, and the status stream.
//! - [`gate`] – [`SafetyGate`][gate::SafetyGate]: the human-confirmation
//!   checkpoint between planning and physical execution.  Fail closed.
//! - [`executor`] – [`MotionExecutor`][executor::MotionExecutor]: derives
//!   pose/joint targets and runs the plan → gate → execute pipeline,
//!   including the gripper state machine for pick/place.
//! - [`scene`] – [`SceneSynchronizer`][scene::SceneSynchronizer]: rebuilds
//!   the planner's obstacle world model from the perception cache.
//! - [`arbitrator`] – [`CommandArbitrator`][arbitrator::CommandArbitrator]:
//!   deduplicates and classifies inbound commands and drives the other
//!   components.
//! - [`reporter`] – [`StatusReporter`][reporter::StatusReporter]: fixed-rate
//!   heartbeat of the current state and held object.
//! - [`worker`] – bounded command queue plus the blocking worker that
//!   serializes command handling behind in-flight motions.

pub mod arbitrator;
pub mod bus;
pub mod executor;
pub mod gate;
pub mod reporter;
pub mod scene;
pub mod state;
pub mod worker;

pub use arbitrator::CommandArbitrator;
pub use bus::{EventBus, Topic, TopicReceiver};
pub use executor::MotionExecutor;
pub use gate::{ConfirmationPrompt, SafetyGate, StdinPrompt};
pub use reporter::StatusReporter;
pub use scene::SceneSynchronizer;
pub use state::{StateCell, StateHandle};
pub use worker::{CommandQueue, forward_commands, spawn_command_worker};
