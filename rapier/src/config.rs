use bevy::prelude::*;

use crate::constants::{DEFAULT_GRAVITY, DEFAULT_TIMESTEP};

/// Simulation parameters of the [`RapierEngine`](crate::RapierEngine).
///
/// Insert it before adding [`RapierEnginePlugin`](crate::RapierEnginePlugin)
/// to override the defaults. Later changes are picked up before the next step.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct RapierConfig {
    pub gravity: Vec3,
    /// Seconds advanced per step.
    pub timestep: f32,
}

impl Default for RapierConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            timestep: DEFAULT_TIMESTEP,
        }
    }
}
