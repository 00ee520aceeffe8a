//! Reactions to removed descriptors.
//!
//! Removal is planned after every creation pass of the tick and always in
//! dependency order: constraints, then shapes, then bodies. A descriptor that
//! never got a handle has nothing registered and produces no command.

use bevy::{ecs::entity::EntityHashSet, prelude::*};
use tracing::{debug, warn};

use crate::{
    body::PhysicsBody,
    command::{SyncCommand, SyncQueue},
    constraint::PhysicsConstraint,
    engine::PhysicsEngine,
    handle::{BodyHandle, ConstraintHandle},
    registry::{HandleRegistry, ShapeAttachment},
    shape::PhysicsShape,
};

pub(crate) fn plan_removed_constraints(
    mut removed: RemovedComponents<PhysicsConstraint>,
    registry: Res<HandleRegistry>,
    mut queue: ResMut<SyncQueue>,
) {
    let mut seen = EntityHashSet::default();
    for entity in removed.read() {
        if !seen.insert(entity) {
            continue;
        }
        if let Some(constraint) = registry.constraint(entity) {
            queue.push(SyncCommand::RemoveConstraint { entity, constraint });
        }
    }
}

pub(crate) fn plan_removed_shapes(
    mut removed: RemovedComponents<PhysicsShape>,
    registry: Res<HandleRegistry>,
    mut queue: ResMut<SyncQueue>,
) {
    let mut seen = EntityHashSet::default();
    for entity in removed.read() {
        if !seen.insert(entity) {
            continue;
        }
        if let Some(attachment) = registry.shape(entity) {
            queue.push(SyncCommand::DetachShape { entity, attachment });
        }
    }
}

pub(crate) fn plan_removed_bodies(
    mut removed: RemovedComponents<PhysicsBody>,
    registry: Res<HandleRegistry>,
    mut queue: ResMut<SyncQueue>,
) {
    let mut seen = EntityHashSet::default();
    for entity in removed.read() {
        if !seen.insert(entity) {
            continue;
        }
        if let Some(body) = registry.body(entity) {
            queue.push(SyncCommand::RemoveBody { entity, body });
        }
    }
}

pub(crate) fn remove_constraint<E: PhysicsEngine>(
    entity: Entity,
    handle: ConstraintHandle,
    engine: &mut E,
    registry: &mut HandleRegistry,
) {
    match engine.remove_constraint(handle) {
        Ok(()) => debug!(?entity, ?handle, "removed constraint"),
        Err(err) => warn!(?entity, ?handle, %err, "constraint removal failed"),
    }
    registry.forget_constraint(entity, handle);
}

pub(crate) fn detach_shape<E: PhysicsEngine>(
    entity: Entity,
    attachment: ShapeAttachment,
    engine: &mut E,
    registry: &mut HandleRegistry,
) {
    match engine.detach_shape(attachment.body, attachment.shape) {
        Ok(()) => debug!(?entity, ?attachment, "detached shape"),
        Err(err) => warn!(?entity, ?attachment, %err, "shape removal failed"),
    }
    registry.forget_shape(entity, attachment);
}

pub(crate) fn remove_body<E: PhysicsEngine>(
    entity: Entity,
    handle: BodyHandle,
    engine: &mut E,
    registry: &mut HandleRegistry,
) {
    match engine.remove_body(handle) {
        Ok(()) => debug!(?entity, ?handle, "removed body"),
        Err(err) => warn!(?entity, ?handle, %err, "body removal failed"),
    }
    registry.forget_body(entity, handle);
}
