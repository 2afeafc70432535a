//! [`Gripper`] – discrete open/close end-effector boundary.

use std::sync::{Arc, Mutex};

use armos_types::ArmError;

/// A two-jaw gripper controller.
///
/// Drivers implement this trait; the motion executor coordinates it with
/// its own Open/Moving/Closed state machine, so a driver only needs to
/// report the physical jaw state.
pub trait Gripper: Send {
    /// Stable identifier, e.g. `"gripper"`.
    fn id(&self) -> &str;

    /// Drive the jaws to `closed` (`true` = closed on the workpiece).
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::GripperFault`] if the command cannot be applied
    /// (e.g. the jaw stalls or the controller is in a fault state).
    fn set_closed(&mut self, closed: bool) -> Result<(), ArmError>;

    /// Most recently known jaw state (`true` = closed).
    fn is_closed(&self) -> bool;
}

/// A gripper handle shareable with the motion executor.
pub type SharedGripper = Arc<Mutex<Box<dyn Gripper>>>;

/// Wrap a concrete gripper into a [`SharedGripper`].
pub fn shared_gripper<G: Gripper + 'static>(gripper: G) -> SharedGripper {
    Arc::new(Mutex::new(Box::new(gripper)))
}
