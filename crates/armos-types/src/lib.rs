//! `armos-types` – shared data model for the ARMOS manipulator stack.
//!
//! Every crate in the workspace speaks these types: the perception feed
//! produces [`ObservationFrame`]s, operators produce [`CommandMsg`]s, the
//! motion layer produces [`MotionRequest`]s for the planner boundary, and
//! the status reporter emits [`StatusMsg`]s.  Keeping them in one leaf
//! crate means the planner boundary, the perception cache, and the command
//! arbitrator never depend on each other directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Operating state
// ────────────────────────────────────────────────────────────────────────────

/// The single enumerated mode describing what the arm is currently doing.
///
/// Exactly one value is current at any instant.  The value is owned by the
/// command arbitrator and mutated only on its worker thread; every other
/// thread (the status reporter in particular) observes it through the
/// atomically-updated state cell in `armos-motion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperatingState {
    /// Nothing in flight; the arm is ready for the next command.
    Idle = 0,
    /// Driving to the fixed home joint configuration.
    Homing = 1,
    /// Executing a pick sequence.
    Grabbing = 2,
    /// Executing a reach-and-hover sequence.
    Pointing = 3,
    /// Executing a place sequence.
    Dropping = 4,
    /// The last command failed; sink state until the next accepted command.
    Failed = 5,
    /// Rebuilding the planner's obstacle world model.
    SceneBuilding = 6,
}

impl OperatingState {
    /// Canonical wire name, as emitted in the status stream and matched by
    /// the arbitrator's self-suppression guard.
    pub fn name(self) -> &'static str {
        match self {
            OperatingState::Idle => "IDLE",
            OperatingState::Homing => "HOMING",
            OperatingState::Grabbing => "GRABBING",
            OperatingState::Pointing => "POINTING",
            OperatingState::Dropping => "DROPPING",
            OperatingState::Failed => "FAILED",
            OperatingState::SceneBuilding => "SCENE_BUILDING",
        }
    }

    /// Inverse of the `repr(u8)` discriminant, used by the atomic state cell.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OperatingState::Idle),
            1 => Some(OperatingState::Homing),
            2 => Some(OperatingState::Grabbing),
            3 => Some(OperatingState::Pointing),
            4 => Some(OperatingState::Dropping),
            5 => Some(OperatingState::Failed),
            6 => Some(OperatingState::SceneBuilding),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry primitives
// ────────────────────────────────────────────────────────────────────────────

/// A point or translation in the fixed world frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// An orientation as intrinsic roll/pitch/yaw angles (radians).
///
/// All consumers of cached poses assume this one convention; the perception
/// crate decomposes incoming quaternions into it before storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollPitchYaw {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl RollPitchYaw {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// A rotation as produced by the perception feed (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }
}

/// Axis-aligned bounding-box dimensions of an observed object (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Perception feed messages
// ────────────────────────────────────────────────────────────────────────────

/// One observed object as delivered by the perception feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectObservation {
    /// Integer id, unique among currently visible objects.  Ids are not
    /// stable across frames; every frame replaces the previous one wholesale.
    pub id: i32,
    pub position: Vec3,
    pub orientation: Quat,
    pub size: Dimensions,
}

/// Plane descriptor `ax + by + cz + d = 0` for the surface the objects
/// rest on.  Replaced wholesale with each perception update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportSurface {
    pub coefficients: [f64; 4],
}

impl SupportSurface {
    pub fn new(coefficients: [f64; 4]) -> Self {
        Self { coefficients }
    }
}

impl Default for SupportSurface {
    fn default() -> Self {
        Self::new([0.0; 4])
    }
}

/// A complete perception snapshot: all visible objects plus the support
/// surface.  Consumed wholesale; there is no incremental merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationFrame {
    pub objects: Vec<ObjectObservation>,
    pub table: SupportSurface,
}

// ────────────────────────────────────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────────────────────────────────────

/// A timestamped operator command as it arrives off the wire.
///
/// `utime` doubles as the deduplication key: a command whose timestamp
/// equals the last accepted one is dropped without effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMsg {
    pub utime: i64,
    /// Raw action tag, e.g. `"GRAB=7"`, `"HOME"`.
    pub action: String,
    /// Destination pose for DROP commands.
    pub dest: Option<Vec3>,
}

/// A parsed action tag.
///
/// Parsing is substring containment in fixed priority order (GRAB, DROP,
/// POINT, HOME, SCENE); anything else is [`ArmAction::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmAction {
    Grab(i32),
    Drop,
    Point(i32),
    Home,
    Scene,
    Unknown,
}

impl ArmAction {
    /// Parse an action tag string.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::MalformedCommand`] when a GRAB/POINT tag carries
    /// a non-numeric object id after its `=` delimiter (or no delimiter at
    /// all).  An unrecognised tag is not an error; it parses to
    /// [`ArmAction::Unknown`] so the arbitrator can transition to Failed.
    pub fn parse(action: &str) -> Result<Self, ArmError> {
        if action.contains("GRAB") {
            Ok(ArmAction::Grab(Self::object_id(action)?))
        } else if action.contains("DROP") {
            Ok(ArmAction::Drop)
        } else if action.contains("POINT") {
            Ok(ArmAction::Point(Self::object_id(action)?))
        } else if action.contains("HOME") {
            Ok(ArmAction::Home)
        } else if action.contains("SCENE") {
            Ok(ArmAction::Scene)
        } else {
            Ok(ArmAction::Unknown)
        }
    }

    fn object_id(action: &str) -> Result<i32, ArmError> {
        let raw = action
            .split_once('=')
            .map(|(_, id)| id.trim())
            .unwrap_or("");
        raw.parse::<i32>()
            .map_err(|_| ArmError::MalformedCommand(raw.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Motion requests and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Number of rotational joints on the arm.
pub const NUM_JOINTS: usize = 7;

/// A Cartesian end-effector target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseTarget {
    pub position: Vec3,
    pub orientation: RollPitchYaw,
}

/// A target submitted to the motion planner: either a Cartesian pose or a
/// full joint configuration.  Produced transiently inside the motion
/// executor, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionRequest {
    Pose(PoseTarget),
    Joints([f64; NUM_JOINTS]),
}

/// Opaque token for a successfully computed plan, handed back to
/// [`execute`](MotionRequest) by the planner boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    pub id: Uuid,
    pub request: MotionRequest,
}

/// Terminal outcome of one pass through the plan → gate → execute pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Planned, approved, and executed.
    Executed,
    /// The planner found no feasible plan; nothing was executed.
    PlanFailed,
    /// The safety gate denied (or could not understand) the confirmation.
    GateRejected,
    /// The plan was approved but trajectory execution reported failure.
    ExecutionFailed,
}

/// Decision returned by the safety gate.  Ambiguous input never approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Approved,
    Rejected,
}

/// One box-shaped obstacle in the planner's world model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    pub id: String,
    pub center: Vec3,
    pub orientation: RollPitchYaw,
    pub size: Dimensions,
}

/// Gripper jaw state machine.  `Moving` covers the actuation window between
/// a commanded transition and its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GripperState {
    Open,
    Closed,
    Moving,
}

// ────────────────────────────────────────────────────────────────────────────
// Status stream
// ────────────────────────────────────────────────────────────────────────────

/// Heartbeat emitted by the status reporter at a fixed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMsg {
    pub utime: i64,
    /// Current [`OperatingState::name`].
    pub state: String,
    /// Decimal id of the held object, or `"none"`.
    pub held_object: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Event bus envelope
// ────────────────────────────────────────────────────────────────────────────

/// Unified envelope for the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"armos-cli::console"`.
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Build an envelope with a fresh id and the current timestamp.
    pub fn now(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Observations(ObservationFrame),
    Command(CommandMsg),
    Status(StatusMsg),
    /// Operator-initiated shutdown (Ctrl-C).
    Halt { reason: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Global error type for the manipulator stack.
///
/// Every variant is handled locally by logging and (where a command was in
/// flight) transitioning the operating state to `Failed`; none of them
/// crash the process, and none of them trigger an automatic retry.
#[derive(Error, Debug)]
pub enum ArmError {
    #[error("malformed command: object id '{0}' is not an integer")]
    MalformedCommand(String),

    #[error("object {0} is not present in the current perception snapshot")]
    ObjectNotFound(i32),

    #[error("motion planner found no feasible plan for the current target")]
    PlanFailed,

    #[error("safety gate rejected the plan: {0}")]
    GateRejected(String),

    #[error("trajectory execution failed: {0}")]
    ExecutionFailed(String),

    #[error("unknown command action '{0}'")]
    UnknownAction(String),

    #[error("plan() called before any target was set")]
    NoTarget,

    #[error("drop requested with no object held")]
    NothingHeld,

    #[error("gripper fault on {id}: {details}")]
    GripperFault { id: String, details: String },

    #[error("command queue full; arm is busy")]
    Busy,

    #[error("event channel error: {0}")]
    Channel(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_round_trip_through_u8() {
        for v in 0..7u8 {
            let state = OperatingState::from_u8(v).unwrap();
            assert_eq!(state as u8, v);
        }
        assert_eq!(OperatingState::from_u8(7), None);
    }

    #[test]
    fn state_names_are_stable() {
        assert_eq!(OperatingState::Idle.name(), "IDLE");
        assert_eq!(OperatingState::SceneBuilding.name(), "SCENE_BUILDING");
    }

    #[test]
    fn parse_grab_with_id() {
        assert_eq!(ArmAction::parse("GRAB=7").unwrap(), ArmAction::Grab(7));
    }

    #[test]
    fn parse_point_with_id() {
        assert_eq!(ArmAction::parse("POINT=12").unwrap(), ArmAction::Point(12));
    }

    #[test]
    fn parse_plain_tags() {
        assert_eq!(ArmAction::parse("DROP").unwrap(), ArmAction::Drop);
        assert_eq!(ArmAction::parse("HOME").unwrap(), ArmAction::Home);
        assert_eq!(ArmAction::parse("SCENE").unwrap(), ArmAction::Scene);
    }

    #[test]
    fn parse_is_substring_containment() {
        // The tag grammar allows decoration around the keyword.
        assert_eq!(
            ArmAction::parse("please POINT=3 now").unwrap(),
            ArmAction::Point(3)
        );
    }

    #[test]
    fn parse_priority_order_grab_wins() {
        // GRAB is matched before POINT when both substrings are present.
        assert_eq!(
            ArmAction::parse("GRAB=1 POINT=2").unwrap(),
            ArmAction::Grab(1)
        );
    }

    #[test]
    fn parse_non_numeric_id_is_malformed() {
        assert!(matches!(
            ArmAction::parse("GRAB=seven"),
            Err(ArmError::MalformedCommand(_))
        ));
        assert!(matches!(
            ArmAction::parse("POINT="),
            Err(ArmError::MalformedCommand(_))
        ));
    }

    #[test]
    fn parse_grab_without_delimiter_is_malformed() {
        assert!(matches!(
            ArmAction::parse("GRAB"),
            Err(ArmError::MalformedCommand(_))
        ));
    }

    #[test]
    fn parse_unrecognised_tag_is_unknown() {
        assert_eq!(ArmAction::parse("DANCE").unwrap(), ArmAction::Unknown);
        assert_eq!(ArmAction::parse("").unwrap(), ArmAction::Unknown);
    }

    #[test]
    fn command_msg_round_trip() {
        let msg = CommandMsg {
            utime: 1_700_000_000_000,
            action: "GRAB=3".to_string(),
            dest: Some(Vec3::new(0.4, -0.1, 0.8)),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: CommandMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn observation_frame_round_trip() {
        let frame = ObservationFrame {
            objects: vec![ObjectObservation {
                id: 4,
                position: Vec3::new(0.6, 0.0, 0.75),
                orientation: Quat::identity(),
                size: Dimensions::new(0.05, 0.05, 0.12),
            }],
            table: SupportSurface::new([0.0, 0.0, 1.0, -0.7]),
        };
        let json = serde_json::to_string(&frame).unwrap();
        let back: ObservationFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn arm_error_display() {
        let err = ArmError::ObjectNotFound(9);
        assert!(err.to_string().contains('9'));

        let err = ArmError::GripperFault {
            id: "gripper".to_string(),
            details: "jaw stalled".to_string(),
        };
        assert!(err.to_string().contains("jaw stalled"));
    }
}
