//! Rapier backend for `physics_sync`.
//!
//! Add [`RapierEnginePlugin`] to an app to simulate every `PhysicsBody`,
//! `PhysicsShape` and `PhysicsConstraint` with Rapier.

pub mod collider;
pub mod config;
pub mod constants;
mod convert;
pub mod engine;
pub mod joint;
pub mod plugin;

pub use collider::collider_from_geometry;
pub use config::RapierConfig;
pub use constants::{DEFAULT_GRAVITY, DEFAULT_TIMESTEP};
pub use engine::RapierEngine;
pub use joint::joint_from_options;
pub use plugin::RapierEnginePlugin;

// Re-export Rapier so downstream crates can reach the simulation without
// depending on `rapier3d` directly.
pub use rapier3d;
