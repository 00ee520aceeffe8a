use bevy::{platform::collections::HashMap, prelude::*};

use crate::handle::{BodyHandle, ConstraintHandle, ShapeHandle};

/// Where a resolved shape lives in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeAttachment {
    pub shape: ShapeHandle,
    /// The body the shape was attached to at resolution time.
    pub body: BodyHandle,
}

/// Entity → simulation handle mappings for every realized descriptor.
///
/// Once a descriptor component is removed its fields can no longer be read, so
/// teardown looks the handles up here instead.
///
/// Only the apply step writes to the registry.
#[derive(Resource, Debug, Default)]
pub struct HandleRegistry {
    bodies: HashMap<Entity, BodyHandle>,
    shapes: HashMap<Entity, ShapeAttachment>,
    constraints: HashMap<Entity, ConstraintHandle>,
}

impl HandleRegistry {
    pub fn body(&self, entity: Entity) -> Option<BodyHandle> {
        self.bodies.get(&entity).copied()
    }

    pub fn shape(&self, entity: Entity) -> Option<ShapeAttachment> {
        self.shapes.get(&entity).copied()
    }

    pub fn constraint(&self, entity: Entity) -> Option<ConstraintHandle> {
        self.constraints.get(&entity).copied()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub(crate) fn register_body(&mut self, entity: Entity, handle: BodyHandle) {
        self.bodies.insert(entity, handle);
    }

    pub(crate) fn register_shape(&mut self, entity: Entity, attachment: ShapeAttachment) {
        self.shapes.insert(entity, attachment);
    }

    pub(crate) fn register_constraint(&mut self, entity: Entity, handle: ConstraintHandle) {
        self.constraints.insert(entity, handle);
    }

    // The `forget_*` methods only drop an entry that still points at the torn
    // down handle. A descriptor re-added on the same entity may already have
    // registered a new one earlier in the tick.

    pub(crate) fn forget_body(&mut self, entity: Entity, handle: BodyHandle) {
        if self.bodies.get(&entity) == Some(&handle) {
            self.bodies.remove(&entity);
        }
    }

    pub(crate) fn forget_shape(&mut self, entity: Entity, attachment: ShapeAttachment) {
        if self.shapes.get(&entity) == Some(&attachment) {
            self.shapes.remove(&entity);
        }
    }

    pub(crate) fn forget_constraint(&mut self, entity: Entity, handle: ConstraintHandle) {
        if self.constraints.get(&entity) == Some(&handle) {
            self.constraints.remove(&entity);
        }
    }
}
