//! Keeps scene entities and an external physics engine in lockstep.
//!
//! Entities declare physics through [`PhysicsBody`], [`PhysicsShape`] and
//! [`PhysicsConstraint`] components. Once per tick [`PhysicsSyncPlugin`]
//! realizes newly declared descriptors in the engine, pushes pending changes,
//! copies simulation results back and tears down whatever was removed.

pub mod ancestor;
pub mod body;
pub mod command;
pub mod constraint;
pub mod engine;
pub mod handle;
pub mod orchestrator;
pub mod registry;
pub mod shape;
mod teardown;

#[cfg(test)]
mod testing;

pub use ancestor::{MAX_ANCESTOR_DEPTH, find_body_ancestor};
pub use body::{Activation, BodyKind, BodyState, PhysicsBody};
pub use command::{SyncCommand, SyncPhase, SyncQueue};
pub use constraint::{ConstraintOptions, JointKind, PhysicsConstraint};
pub use engine::{
    BodyFrameResult, ConstraintFrames, EngineError, EngineResult, PhysicsEngine, ShapeRequest,
    rigid_pose,
};
pub use handle::{BodyHandle, ConstraintHandle, Resolution, ShapeHandle};
pub use orchestrator::{PhysicsSyncPlugin, PhysicsSyncSystems, SyncStep};
pub use registry::{HandleRegistry, ShapeAttachment};
pub use shape::{LocalBounds, MeshGeometry, PhysicsShape, ShapeFit, ShapeGeometry, fit_geometry};
