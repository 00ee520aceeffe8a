//! Rigid body descriptors and their lifecycle.
//!
//! Every tick each [`PhysicsBody`] is either created in the engine (while it
//! is unresolved), updated (when resolved and dirty) or left alone. After the
//! apply step the latest simulation snapshot is copied back onto every
//! resolved body, including the ones created this very tick.

use bevy::{prelude::*, transform::helper::TransformHelper};
use tracing::{debug, warn};

use crate::{
    command::{SyncCommand, SyncQueue},
    engine::{BodyFrameResult, PhysicsEngine},
    handle::{BodyHandle, Resolution, ShapeHandle},
    registry::HandleRegistry,
};

/// How the engine moves a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// Never moves.
    Static,
    /// Moved by the solver.
    #[default]
    Dynamic,
    /// Moved by the scene; pushes dynamic bodies but is not pushed back.
    Kinematic,
}

/// Whether the engine may put a body to sleep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activation {
    /// Simulated, and allowed to sleep when it comes to rest.
    #[default]
    Active,
    /// Simulated and never put to sleep.
    NeverDeactivate,
    /// Excluded from the simulation entirely.
    Disabled,
}

impl Activation {
    #[inline]
    pub fn can_sleep(self) -> bool {
        matches!(self, Activation::Active)
    }

    #[inline]
    pub fn is_enabled(self) -> bool {
        !matches!(self, Activation::Disabled)
    }
}

/// Simulation state pulled back from the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyState {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub collisions: Vec<BodyHandle>,
    pub shapes: Vec<ShapeHandle>,
}

impl BodyState {
    fn matches(&self, result: &BodyFrameResult) -> bool {
        self.linear_velocity == result.linear_velocity
            && self.angular_velocity == result.angular_velocity
            && self.collisions == result.collisions
            && self.shapes == result.shapes
    }

    fn copy_from(&mut self, result: &BodyFrameResult) {
        self.linear_velocity = result.linear_velocity;
        self.angular_velocity = result.angular_velocity;
        self.collisions.clone_from(&result.collisions);
        self.shapes.clone_from(&result.shapes);
    }
}

/// Declares that an entity should be simulated as a rigid body.
///
/// The public fields describe the body. After changing any of them on a body
/// that is already in the simulation, call [`PhysicsBody::mark_dirty`] so the
/// change is pushed to the engine on the next tick.
#[derive(Component, Debug)]
#[require(Transform)]
pub struct PhysicsBody {
    pub kind: BodyKind,
    pub activation: Activation,
    /// Additional mass on top of whatever the attached shapes contribute.
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_scale: f32,
    handle: Resolution<BodyHandle>,
    dirty: bool,
    state: BodyState,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self::new(BodyKind::default())
    }
}

impl PhysicsBody {
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            activation: Activation::default(),
            mass: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            handle: Resolution::Unresolved,
            dirty: false,
            state: BodyState::default(),
        }
    }

    pub fn dynamic() -> Self {
        Self::new(BodyKind::Dynamic)
    }

    pub fn fixed() -> Self {
        Self::new(BodyKind::Static)
    }

    pub fn kinematic() -> Self {
        Self::new(BodyKind::Kinematic)
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    pub fn set_kind(&mut self, kind: BodyKind) {
        self.kind = kind;
        self.dirty = true;
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
        self.dirty = true;
    }

    /// Request that the current fields be pushed to the engine next tick.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle.get()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution<BodyHandle> {
        self.handle
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.handle.is_resolved()
    }

    /// Resolved and waiting for its changes to reach the engine.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.dirty && self.handle.is_resolved()
    }

    pub fn state(&self) -> &BodyState {
        &self.state
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.state.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.state.angular_velocity
    }

    pub fn collisions(&self) -> &[BodyHandle] {
        &self.state.collisions
    }

    pub fn shapes(&self) -> &[ShapeHandle] {
        &self.state.shapes
    }

    /// Constrained bodies are always dynamic and must not go dormant.
    pub(crate) fn promote_for_constraint(&mut self) {
        self.kind = BodyKind::Dynamic;
        self.activation = Activation::NeverDeactivate;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

pub(crate) fn plan_bodies(bodies: Query<(Entity, &PhysicsBody)>, mut queue: ResMut<SyncQueue>) {
    for (entity, body) in &bodies {
        match body.handle {
            Resolution::Unresolved => queue.push(SyncCommand::CreateBody { entity }),
            Resolution::Resolved(handle) if body.dirty => {
                queue.push(SyncCommand::UpdateBody {
                    entity,
                    body: handle,
                });
            }
            Resolution::Resolved(_) => {}
        }
    }
}

pub(crate) fn create_body<E: PhysicsEngine>(
    entity: Entity,
    engine: &mut E,
    registry: &mut HandleRegistry,
    bodies: &mut Query<&mut PhysicsBody>,
    transforms: &TransformHelper,
) {
    let Ok(mut body) = bodies.get_mut(entity) else {
        return;
    };
    if body.is_resolved() {
        return;
    }

    let world = match transforms.compute_global_transform(entity) {
        Ok(world) => world,
        Err(err) => {
            warn!(?entity, %err, "body has no world transform yet, retrying next tick");
            return;
        }
    };

    match engine.create_body(&body, &world) {
        Ok(handle) => {
            body.handle = Resolution::Resolved(handle);
            body.clear_dirty();
            registry.register_body(entity, handle);
            debug!(?entity, ?handle, "created body");
        }
        Err(err) => {
            warn!(?entity, %err, "body creation failed, retrying next tick");
        }
    }
}

pub(crate) fn update_body<E: PhysicsEngine>(
    entity: Entity,
    handle: BodyHandle,
    engine: &mut E,
    bodies: &mut Query<&mut PhysicsBody>,
    transforms: &TransformHelper,
) {
    let Ok(mut body) = bodies.get_mut(entity) else {
        return;
    };
    // Replaced by a different body since planning.
    if body.handle() != Some(handle) {
        return;
    }

    let world = match transforms.compute_global_transform(entity) {
        Ok(world) => world,
        Err(err) => {
            warn!(?entity, %err, "body has no world transform, update deferred");
            return;
        }
    };

    if let Err(err) = engine.update_body(handle, &body, &world) {
        warn!(?entity, ?handle, %err, "body update failed");
    }
    body.clear_dirty();
}

/// Copy the engine's latest snapshot onto every resolved body.
pub(crate) fn pull_frame_results<E: PhysicsEngine>(
    engine: Res<E>,
    mut bodies: Query<&mut PhysicsBody>,
) {
    for mut body in &mut bodies {
        let Some(handle) = body.handle() else {
            continue;
        };
        // An unchanged snapshot must not trip `Changed<PhysicsBody>`.
        if let Some(result) = engine.frame_result(handle)
            && !body.state.matches(result)
        {
            body.state.copy_from(result);
        }
    }
}
