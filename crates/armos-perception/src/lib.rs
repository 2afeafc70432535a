//! `armos-perception` – the arm's model of the observable world.
//!
//! Turns raw perception-feed frames into the snapshot the motion layer
//! plans against.
//!
//! # Modules
//!
//! - [`cache`] – [`PerceptionCache`][cache::PerceptionCache]: thread-safe
//!   store of the most recent object poses, object dimensions, and
//!   support-surface parameters.  Updates replace the previous frame
//!   wholesale; readers receive a consistent [`SceneSnapshot`][cache::SceneSnapshot]
//!   copy and never hold references into live state.
//! - [`pose`] – quaternion → roll/pitch/yaw decomposition in the one fixed
//!   convention every downstream consumer assumes.

pub mod cache;
pub mod pose;

pub use cache::{ObjectPose, PerceptionCache, SceneSnapshot};
pub use pose::quat_to_rpy;
