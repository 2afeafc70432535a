//! `armos-planner` – the Motion Planning Service boundary.
//!
//! The planning, inverse-kinematics, collision-checking, and trajectory
//! execution engine is an external collaborator; ARMOS only ever talks to
//! it through the traits in this crate, so the real bridge and the
//! simulated backend can be swapped without touching the motion layer.
//!
//! # Modules
//!
//! - [`planner`] – [`MotionPlanner`][planner::MotionPlanner]: target
//!   submission, planning, execution, and the obstacle world model.  Calls
//!   are synchronous, potentially slow, and never internally retried.
//! - [`gripper`] – [`Gripper`][gripper::Gripper]: the discrete open/close
//!   end-effector boundary.
//! - [`sim`] – [`SimPlanner`][sim::SimPlanner] and
//!   [`SimGripper`][sim::SimGripper]: recording stand-ins for headless runs
//!   and tests, scriptable to fail planning or execution.

pub mod gripper;
pub mod planner;
pub mod sim;

pub use gripper::{Gripper, SharedGripper, shared_gripper};
pub use planner::{MotionPlanner, SharedPlanner, shared_planner};
pub use sim::{CallJournal, GripperProbe, PlannerCall, SimGripper, SimPlanner};
