//! Contract between the synchronization layer and a physics engine.
//!
//! The engine owns solving, integration and collision detection. The sync layer
//! only ever talks to it through opaque handles, so any engine that can create,
//! update and remove bodies, shapes and constraints can sit behind this trait.

use bevy::prelude::*;
use thiserror::Error;

use crate::{
    body::PhysicsBody,
    constraint::ConstraintOptions,
    handle::{BodyHandle, ConstraintHandle, ShapeHandle},
    shape::ShapeGeometry,
};

/// Result type alias for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors an engine may report back to the sync layer.
///
/// None of these abort a tick. Failed creations are retried on the next tick,
/// failed updates and removals are logged and dropped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),

    #[error("unknown shape {0:?}")]
    UnknownShape(ShapeHandle),

    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintHandle),

    #[error("degenerate shape: {0}")]
    DegenerateShape(String),

    #[error("engine rejected the request: {0}")]
    Rejected(String),
}

impl EngineError {
    /// Create a degenerate shape error.
    #[must_use]
    pub fn degenerate_shape(details: impl Into<String>) -> Self {
        Self::DegenerateShape(details.into())
    }

    /// Create a rejected request error.
    #[must_use]
    pub fn rejected(details: impl Into<String>) -> Self {
        Self::Rejected(details.into())
    }
}

/// Per-body snapshot produced by the engine for the current tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyFrameResult {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Bodies currently in contact with this one.
    pub collisions: Vec<BodyHandle>,
    /// Shapes currently attached to this body.
    pub shapes: Vec<ShapeHandle>,
}

/// `world` without its scale.
///
/// Engines place bodies by translation and rotation only, so poses relative
/// to a body are taken against this rather than the body's full transform.
pub fn rigid_pose(world: &GlobalTransform) -> GlobalTransform {
    let (_, rotation, translation) = world.to_scale_rotation_translation();
    GlobalTransform::from(Transform::from_translation(translation).with_rotation(rotation))
}

/// A shape ready to be attached to a realized body.
///
/// `geometry` is final: any fit-to-mesh derivation has already happened.
/// `local` is the shape's pose relative to the owning body's unscaled pose, so
/// its scale carries the body's scale as well as the shape's own.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeRequest {
    pub entity: Entity,
    pub geometry: ShapeGeometry,
    pub local: Transform,
}

/// Joint frames of a constraint, each relative to its own body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintFrames {
    pub frame_a: Transform,
    pub frame_b: Transform,
}

impl Default for ConstraintFrames {
    fn default() -> Self {
        Self {
            frame_a: Transform::IDENTITY,
            frame_b: Transform::IDENTITY,
        }
    }
}

/// A physics engine the sync layer can drive.
///
/// All calls are synchronous and happen from a single system during the
/// apply step of a tick.
pub trait PhysicsEngine: Resource {
    /// Whether the engine can accept requests. The whole sync pass is skipped
    /// while this returns `false`.
    fn is_ready(&self) -> bool {
        true
    }

    fn create_body(&mut self, body: &PhysicsBody, world: &GlobalTransform)
    -> EngineResult<BodyHandle>;

    fn update_body(
        &mut self,
        handle: BodyHandle,
        body: &PhysicsBody,
        world: &GlobalTransform,
    ) -> EngineResult<()>;

    fn remove_body(&mut self, handle: BodyHandle) -> EngineResult<()>;

    fn attach_shape(&mut self, body: BodyHandle, request: &ShapeRequest)
    -> EngineResult<ShapeHandle>;

    fn detach_shape(&mut self, body: BodyHandle, shape: ShapeHandle) -> EngineResult<()>;

    fn add_constraint(
        &mut self,
        id: ConstraintHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        options: &ConstraintOptions,
        frames: &ConstraintFrames,
    ) -> EngineResult<ConstraintHandle>;

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> EngineResult<()>;

    /// The latest simulation snapshot of a body, if the engine has one.
    fn frame_result(&self, handle: BodyHandle) -> Option<&BodyFrameResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::UnknownBody(BodyHandle(3));
        assert!(format!("{err}").contains("unknown body"));

        let err = EngineError::degenerate_shape("hull has 2 points");
        assert!(format!("{err}").contains("hull has 2 points"));

        let err = EngineError::rejected("not ready");
        assert!(format!("{err}").contains("not ready"));
    }

    #[test]
    fn rigid_pose_drops_scale_only() {
        let world = GlobalTransform::from(
            Transform::from_xyz(1.0, 2.0, 3.0)
                .with_rotation(Quat::from_rotation_y(1.0))
                .with_scale(Vec3::new(2.0, 3.0, 4.0)),
        );

        let (scale, rotation, translation) = rigid_pose(&world).to_scale_rotation_translation();

        assert!(scale.abs_diff_eq(Vec3::ONE, 1.0e-5));
        assert!(rotation.abs_diff_eq(Quat::from_rotation_y(1.0), 1.0e-5));
        assert!(translation.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1.0e-5));
    }
}
