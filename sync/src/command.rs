//! Sync intents and the single step that executes them.
//!
//! The planning systems never touch the engine. They push [`SyncCommand`]s
//! into the [`SyncQueue`], and [`apply_sync_commands`] runs them against the
//! engine and the [`HandleRegistry`] in phase order. Keeping the two apart
//! lets the plan of a tick be inspected without a live engine.

use bevy::{ecs::system::SystemParam, prelude::*, transform::helper::TransformHelper};

use crate::{
    body::{self, PhysicsBody},
    constraint::{self, PhysicsConstraint},
    engine::PhysicsEngine,
    handle::{BodyHandle, ConstraintHandle},
    registry::{HandleRegistry, ShapeAttachment},
    shape::{self, MeshGeometry, PhysicsShape},
    teardown,
};

/// Execution phase of a command. Commands run in ascending phase order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncPhase {
    Bodies,
    Shapes,
    Constraints,
    RemovedConstraints,
    RemovedShapes,
    RemovedBodies,
}

/// One intent produced while planning a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncCommand {
    CreateBody {
        entity: Entity,
    },
    UpdateBody {
        entity: Entity,
        body: BodyHandle,
    },
    AttachShape {
        entity: Entity,
        /// Entity carrying the owning body.
        body_entity: Entity,
        body: BodyHandle,
    },
    ResolveConstraint {
        entity: Entity,
        target: Entity,
        body: BodyHandle,
        target_body: BodyHandle,
    },
    RemoveConstraint {
        entity: Entity,
        constraint: ConstraintHandle,
    },
    DetachShape {
        entity: Entity,
        attachment: ShapeAttachment,
    },
    RemoveBody {
        entity: Entity,
        body: BodyHandle,
    },
}

impl SyncCommand {
    pub fn phase(&self) -> SyncPhase {
        match self {
            SyncCommand::CreateBody { .. } | SyncCommand::UpdateBody { .. } => SyncPhase::Bodies,
            SyncCommand::AttachShape { .. } => SyncPhase::Shapes,
            SyncCommand::ResolveConstraint { .. } => SyncPhase::Constraints,
            SyncCommand::RemoveConstraint { .. } => SyncPhase::RemovedConstraints,
            SyncCommand::DetachShape { .. } => SyncPhase::RemovedShapes,
            SyncCommand::RemoveBody { .. } => SyncPhase::RemovedBodies,
        }
    }

    /// The entity whose descriptor the command is about.
    pub fn entity(&self) -> Entity {
        match *self {
            SyncCommand::CreateBody { entity }
            | SyncCommand::UpdateBody { entity, .. }
            | SyncCommand::AttachShape { entity, .. }
            | SyncCommand::ResolveConstraint { entity, .. }
            | SyncCommand::RemoveConstraint { entity, .. }
            | SyncCommand::DetachShape { entity, .. }
            | SyncCommand::RemoveBody { entity, .. } => entity,
        }
    }
}

/// Commands planned for the current tick, drained by the apply step.
#[derive(Resource, Debug, Default)]
pub struct SyncQueue {
    commands: Vec<SyncCommand>,
}

impl SyncQueue {
    pub fn push(&mut self, command: SyncCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[SyncCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take every queued command, stable-sorted by phase.
    pub fn drain_ordered(&mut self) -> Vec<SyncCommand> {
        let mut commands = std::mem::take(&mut self.commands);
        commands.sort_by_key(SyncCommand::phase);
        commands
    }
}

/// Everything the apply step reads or writes in the world besides the engine
/// and the registry.
#[derive(SystemParam)]
pub(crate) struct SyncTargets<'w, 's> {
    bodies: Query<'w, 's, &'static mut PhysicsBody>,
    shapes: Query<'w, 's, &'static mut PhysicsShape>,
    constraints: Query<'w, 's, &'static mut PhysicsConstraint>,
    meshes: Query<'w, 's, &'static mut MeshGeometry>,
    transforms: TransformHelper<'w, 's>,
}

pub(crate) fn apply_sync_commands<E: PhysicsEngine>(
    mut queue: ResMut<SyncQueue>,
    mut engine: ResMut<E>,
    mut registry: ResMut<HandleRegistry>,
    targets: SyncTargets,
) {
    if queue.is_empty() {
        return;
    }

    let engine = &mut *engine;
    let registry = &mut *registry;
    let SyncTargets {
        mut bodies,
        mut shapes,
        mut constraints,
        mut meshes,
        transforms,
    } = targets;

    for command in queue.drain_ordered() {
        match command {
            SyncCommand::CreateBody { entity } => {
                body::create_body(entity, engine, registry, &mut bodies, &transforms);
            }
            SyncCommand::UpdateBody { entity, body } => {
                body::update_body(entity, body, engine, &mut bodies, &transforms);
            }
            SyncCommand::AttachShape {
                entity,
                body_entity,
                body,
            } => {
                shape::attach_shape(
                    entity,
                    body_entity,
                    body,
                    engine,
                    registry,
                    &mut shapes,
                    &mut meshes,
                    &transforms,
                );
            }
            SyncCommand::ResolveConstraint {
                entity,
                target,
                body,
                target_body,
            } => {
                constraint::resolve_constraint(
                    entity,
                    target,
                    body,
                    target_body,
                    engine,
                    registry,
                    &mut constraints,
                    &mut bodies,
                    &transforms,
                );
            }
            SyncCommand::RemoveConstraint { entity, constraint } => {
                teardown::remove_constraint(entity, constraint, engine, registry);
            }
            SyncCommand::DetachShape { entity, attachment } => {
                teardown::detach_shape(entity, attachment, engine, registry);
            }
            SyncCommand::RemoveBody { entity, body } => {
                teardown::remove_body(entity, body, engine, registry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ShapeHandle;

    #[test]
    fn drain_orders_by_phase_and_keeps_push_order_within_a_phase() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut queue = SyncQueue::default();

        queue.push(SyncCommand::RemoveBody {
            entity: a,
            body: BodyHandle(1),
        });
        queue.push(SyncCommand::DetachShape {
            entity: b,
            attachment: ShapeAttachment {
                shape: ShapeHandle(2),
                body: BodyHandle(1),
            },
        });
        queue.push(SyncCommand::CreateBody { entity: b });
        queue.push(SyncCommand::RemoveConstraint {
            entity: a,
            constraint: ConstraintHandle::from_entity(a),
        });
        queue.push(SyncCommand::CreateBody { entity: a });

        let phases: Vec<_> = queue
            .drain_ordered()
            .iter()
            .map(|c| (c.phase(), c.entity()))
            .collect();

        assert_eq!(
            phases,
            vec![
                (SyncPhase::Bodies, b),
                (SyncPhase::Bodies, a),
                (SyncPhase::RemovedConstraints, a),
                (SyncPhase::RemovedShapes, b),
                (SyncPhase::RemovedBodies, a),
            ]
        );
        assert!(queue.is_empty());
    }
}
