//! [`CommandArbitrator`] – deduplication, classification, and dispatch of
//! inbound commands.
//!
//! The arbitrator owns the current operating state.  Two guards protect it
//! from replayed or duplicate command messages: a timestamp check (a
//! command whose `utime` equals the last accepted one is dropped) and a
//! self-suppression check (a command whose tag equals the current state's
//! wire name is dropped).  Everything that survives the guards is parsed,
//! transitions the state to the matching transient value, and is handed to
//! the motion executor or the scene synchronizer.  The handlers land the
//! terminal state themselves; the arbitrator never leaves a transient
//! state behind once `submit` returns.

use armos_types::{ArmAction, CommandMsg, OperatingState};
use tracing::{debug, info, warn};

use crate::executor::MotionExecutor;
use crate::scene::SceneSynchronizer;
use crate::state::StateHandle;

/// Root of the command-handling pipeline.  Runs on the command worker
/// thread; a slow planner call blocks the next command, never the
/// perception intake or the status reporter.
pub struct CommandArbitrator {
    state: StateHandle,
    executor: MotionExecutor,
    scene: SceneSynchronizer,
    last_command_time: Option<i64>,
}

impl CommandArbitrator {
    pub fn new(state: StateHandle, executor: MotionExecutor, scene: SceneSynchronizer) -> Self {
        Self {
            state,
            executor,
            scene,
            last_command_time: None,
        }
    }

    /// Handle one inbound command.
    ///
    /// Rejected duplicates and malformed commands are no-ops: the state is
    /// left untouched and no planner traffic is generated.
    pub fn submit(&mut self, msg: &CommandMsg) {
        if self.last_command_time == Some(msg.utime)
            || msg.action == self.state.get().name()
        {
            debug!(utime = msg.utime, action = %msg.action, "duplicate command dropped");
            return;
        }
        self.last_command_time = Some(msg.utime);

        let action = match ArmAction::parse(&msg.action) {
            Ok(action) => action,
            Err(e) => {
                // Bad object id: diagnostic only, no transition.
                warn!(action = %msg.action, error = %e, "command aborted");
                return;
            }
        };

        match action {
            ArmAction::Grab(id) => {
                info!(object = id, "handling pickup command");
                self.state.set(OperatingState::Grabbing);
                if let Err(e) = self.executor.grab(id) {
                    warn!(object = id, error = %e, "pickup failed");
                }
            }
            ArmAction::Drop => {
                let Some(dest) = msg.dest else {
                    warn!("drop command without a destination pose; aborted");
                    return;
                };
                info!("handling putdown command");
                self.state.set(OperatingState::Dropping);
                if let Err(e) = self.executor.drop_at(dest) {
                    warn!(error = %e, "putdown failed");
                }
            }
            ArmAction::Point(id) => {
                info!(object = id, "handling point command");
                self.state.set(OperatingState::Pointing);
                if let Err(e) = self.executor.point_at(id) {
                    warn!(object = id, error = %e, "point failed");
                }
            }
            ArmAction::Home => {
                info!("handling home command");
                self.state.set(OperatingState::Homing);
                self.executor.home();
            }
            ArmAction::Scene => {
                info!("handling build-scene command");
                self.state.set(OperatingState::SceneBuilding);
                match self.scene.rebuild() {
                    // Not a physical motion: no safety gate, straight back
                    // to Idle once the world model is rebuilt.
                    Ok(()) => self.state.set(OperatingState::Idle),
                    Err(e) => {
                        warn!(error = %e, "scene rebuild failed");
                        self.state.set(OperatingState::Failed);
                    }
                }
            }
            ArmAction::Unknown => {
                warn!(action = %msg.action, "unknown command type received");
                self.state.set(OperatingState::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::HOME_JOINTS;
    use crate::gate::SafetyGate;
    use crate::state::StateCell;
    use armos_perception::PerceptionCache;
    use armos_planner::{
        CallJournal, MotionPlanner, SharedPlanner, SimGripper, SimPlanner, shared_gripper,
        shared_planner,
    };
    use armos_types::{
        Dimensions, MotionRequest, ObjectObservation, ObservationFrame, Quat, SupportSurface, Vec3,
    };
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        arbitrator: CommandArbitrator,
        state: StateHandle,
        journal: CallJournal,
        planner: SharedPlanner,
    }

    fn fixture_with(planner: SimPlanner, object_ids: &[i32]) -> Fixture {
        let journal = planner.journal();
        let planner = shared_planner(planner);
        let gripper = shared_gripper(SimGripper::new());
        let state = StateCell::new();

        let cache = Arc::new(PerceptionCache::new());
        cache.update(&ObservationFrame {
            objects: object_ids
                .iter()
                .map(|&id| ObjectObservation {
                    id,
                    position: Vec3::new(0.5, 0.0, 0.72),
                    orientation: Quat::identity(),
                    size: Dimensions::new(0.05, 0.05, 0.10),
                })
                .collect(),
            table: SupportSurface::new([0.0, 0.0, 1.0, -0.7]),
        });

        let executor = MotionExecutor::new(
            Arc::clone(&planner),
            gripper,
            Arc::clone(&cache),
            SafetyGate::auto_approve(),
            Arc::clone(&state),
            Duration::ZERO,
        );
        let scene = SceneSynchronizer::new(Arc::clone(&planner), cache, Duration::ZERO);

        Fixture {
            arbitrator: CommandArbitrator::new(Arc::clone(&state), executor, scene),
            state,
            journal,
            planner,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SimPlanner::new(), &[7])
    }

    fn command(utime: i64, action: &str) -> CommandMsg {
        CommandMsg {
            utime,
            action: action.to_string(),
            dest: None,
        }
    }

    #[test]
    fn home_command_executes_the_fixed_joint_target() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "HOME"));

        assert_eq!(f.state.get(), OperatingState::Idle);
        assert_eq!(
            f.journal.executed_requests(),
            vec![MotionRequest::Joints(HOME_JOINTS)]
        );
    }

    #[test]
    fn identical_timestamp_is_processed_once() {
        let mut f = fixture();
        f.arbitrator.submit(&command(10, "HOME"));
        f.arbitrator.submit(&command(10, "HOME"));

        // One transition, one motion; the replay is a no-op.
        assert_eq!(f.journal.executed_requests().len(), 1);
    }

    #[test]
    fn command_matching_the_state_name_is_suppressed() {
        let mut f = fixture();
        f.state.set(OperatingState::Grabbing);
        f.arbitrator.submit(&command(5, "GRABBING"));

        assert_eq!(f.state.get(), OperatingState::Grabbing);
        assert!(f.journal.calls().is_empty());
    }

    #[test]
    fn grab_of_unseen_object_fails_with_no_planner_traffic() {
        let mut f = fixture();
        // Object 7 is cached; object 9 is not.
        f.arbitrator.submit(&command(1, "GRAB=9"));

        assert_eq!(f.state.get(), OperatingState::Failed);
        assert!(f.journal.calls().is_empty());
    }

    #[test]
    fn point_ends_idle_after_the_chained_home() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "POINT=7"));

        assert_eq!(f.state.get(), OperatingState::Idle);
        assert_eq!(f.journal.executed_requests().len(), 2);
    }

    #[test]
    fn point_at_unseen_object_fails() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "POINT=3"));

        assert_eq!(f.state.get(), OperatingState::Failed);
        assert!(f.journal.calls().is_empty());
    }

    #[test]
    fn malformed_object_id_leaves_state_unchanged() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "GRAB=banana"));

        assert_eq!(f.state.get(), OperatingState::Idle);
        assert!(f.journal.calls().is_empty());
    }

    #[test]
    fn unknown_action_is_a_failure_sink_until_the_next_command() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "DANCE"));
        assert_eq!(f.state.get(), OperatingState::Failed);

        // A later well-formed command clears the sink.
        f.arbitrator.submit(&command(2, "HOME"));
        assert_eq!(f.state.get(), OperatingState::Idle);
    }

    #[test]
    fn scene_rebuilds_wholesale_and_returns_to_idle() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "SCENE"));

        assert_eq!(f.state.get(), OperatingState::Idle);
        let mut ids = f.planner.lock().unwrap().known_obstacles();
        ids.sort();
        assert_eq!(ids, vec!["7", "table"]);
    }

    #[test]
    fn drop_without_destination_is_aborted_before_any_transition() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "DROP"));

        assert_eq!(f.state.get(), OperatingState::Idle);
        assert!(f.journal.calls().is_empty());
    }

    #[test]
    fn grab_then_drop_round_trip() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "GRAB=7"));
        assert_eq!(f.state.get(), OperatingState::Idle);
        assert_eq!(f.state.held_object(), Some(7));

        let mut drop_cmd = command(2, "DROP");
        drop_cmd.dest = Some(Vec3::new(0.3, 0.2, 0.72));
        f.arbitrator.submit(&drop_cmd);

        assert_eq!(f.state.get(), OperatingState::Idle);
        assert_eq!(f.state.held_object(), None);
    }

    #[test]
    fn planning_failure_lands_failed() {
        let mut f = fixture_with(SimPlanner::new().with_planning_failure(), &[7]);
        f.arbitrator.submit(&command(1, "HOME"));
        assert_eq!(f.state.get(), OperatingState::Failed);
        assert!(f.journal.executed_requests().is_empty());
    }

    #[test]
    fn execution_failure_lands_failed() {
        let mut f = fixture_with(SimPlanner::new().with_execution_failure(), &[7]);
        f.arbitrator.submit(&command(1, "HOME"));
        assert_eq!(f.state.get(), OperatingState::Failed);
    }

    #[test]
    fn distinct_timestamps_are_both_processed() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "HOME"));
        f.arbitrator.submit(&command(2, "HOME"));
        assert_eq!(f.journal.executed_requests().len(), 2);
    }

    #[test]
    fn duplicate_guard_keys_on_the_last_accepted_timestamp_only() {
        let mut f = fixture();
        f.arbitrator.submit(&command(1, "HOME"));
        f.arbitrator.submit(&command(2, "HOME"));
        // utime 1 is older than the last accepted (2) but not equal to it;
        // the guard is an equality check, not a monotonicity check.
        f.arbitrator.submit(&command(1, "HOME"));
        assert_eq!(f.journal.executed_requests().len(), 3);
    }
}
