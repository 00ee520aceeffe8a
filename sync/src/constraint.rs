//! Constraints between two rigid bodies.
//!
//! A [`PhysicsConstraint`] lives on an entity that also carries a
//! [`PhysicsBody`] and points at a second body entity. It resolves once both
//! bodies are realized. Resolving promotes the local body to a dynamic body
//! that never sleeps and pushes that change to the engine before the
//! constraint itself is created.

use bevy::{prelude::*, transform::helper::TransformHelper};
use tracing::{debug, warn};

use crate::{
    body::PhysicsBody,
    command::{SyncCommand, SyncQueue},
    engine::{ConstraintFrames, PhysicsEngine, rigid_pose},
    handle::{BodyHandle, ConstraintHandle, Resolution},
    registry::HandleRegistry,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JointKind {
    /// Locks all relative motion.
    #[default]
    Fixed,
    /// Locks relative translation, rotation is free.
    Spherical,
    /// Rotation about a single axis, expressed in the local body's frame.
    Revolute { axis: Vec3 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstraintOptions {
    pub kind: JointKind,
}

#[derive(Component, Debug)]
pub struct PhysicsConstraint {
    /// The other body of the constraint.
    pub target: Entity,
    pub options: ConstraintOptions,
    handle: Resolution<ConstraintHandle>,
}

impl PhysicsConstraint {
    pub fn new(target: Entity) -> Self {
        Self {
            target,
            options: ConstraintOptions::default(),
            handle: Resolution::Unresolved,
        }
    }

    pub fn with_kind(mut self, kind: JointKind) -> Self {
        self.options.kind = kind;
        self
    }

    #[inline]
    pub fn handle(&self) -> Option<ConstraintHandle> {
        self.handle.get()
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.handle.is_resolved()
    }
}

pub(crate) fn plan_constraints(
    constraints: Query<(Entity, &PhysicsConstraint)>,
    bodies: Query<&PhysicsBody>,
    registry: Res<HandleRegistry>,
    mut queue: ResMut<SyncQueue>,
) {
    for (entity, constraint) in &constraints {
        if constraint.is_resolved() {
            continue;
        }
        // The id is derived from the entity, so a replaced constraint waits
        // until the old joint is torn down.
        if registry.constraint(entity).is_some() {
            continue;
        }

        let (Ok(body), Ok(target)) = (bodies.get(entity), bodies.get(constraint.target)) else {
            continue;
        };
        let (Some(body), Some(target_body)) = (body.handle(), target.handle()) else {
            continue;
        };

        queue.push(SyncCommand::ResolveConstraint {
            entity,
            target: constraint.target,
            body,
            target_body,
        });
    }
}

pub(crate) fn resolve_constraint<E: PhysicsEngine>(
    entity: Entity,
    target: Entity,
    body_handle: BodyHandle,
    target_handle: BodyHandle,
    engine: &mut E,
    registry: &mut HandleRegistry,
    constraints: &mut Query<&mut PhysicsConstraint>,
    bodies: &mut Query<&mut PhysicsBody>,
    transforms: &TransformHelper,
) {
    let Ok(mut constraint) = constraints.get_mut(entity) else {
        return;
    };
    if constraint.is_resolved() {
        return;
    }

    let (body_world, target_world) = match (
        transforms.compute_global_transform(entity),
        transforms.compute_global_transform(target),
    ) {
        (Ok(body_world), Ok(target_world)) => (body_world, target_world),
        (Err(err), _) | (_, Err(err)) => {
            warn!(?entity, %err, "constraint bodies have no world transform, retrying next tick");
            return;
        }
    };

    let Ok(mut body) = bodies.get_mut(entity) else {
        return;
    };
    if body.handle() != Some(body_handle) {
        return;
    }

    body.promote_for_constraint();
    if let Err(err) = engine.update_body(body_handle, &body, &body_world) {
        warn!(?entity, handle = ?body_handle, %err, "constrained body update failed");
    }
    body.clear_dirty();

    // Anchor the joint at the target's current pose so it holds the bodies
    // where they are.
    let mut frame_a = target_world.reparented_to(&rigid_pose(&body_world));
    frame_a.scale = Vec3::ONE;
    let frames = ConstraintFrames {
        frame_a,
        frame_b: Transform::IDENTITY,
    };

    let id = ConstraintHandle::from_entity(entity);
    match engine.add_constraint(id, body_handle, target_handle, &constraint.options, &frames) {
        Ok(handle) => {
            constraint.handle = Resolution::Resolved(handle);
            registry.register_constraint(entity, handle);
            debug!(?entity, ?target, ?handle, "created constraint");
        }
        Err(err) => {
            warn!(?entity, ?target, %err, "constraint creation failed, retrying next tick");
        }
    }
}
