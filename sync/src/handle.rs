//! Opaque simulation handles and the resolution state of a descriptor.

use bevy::prelude::*;

/// Handle of a rigid body realized in the physics engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Handle of a collision shape attached to a rigid body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(pub u64);

/// Handle of a constraint between two rigid bodies.
///
/// Constraints are identified by the entity that declares them, not by an id
/// the engine hands out. See [`ConstraintHandle::from_entity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u64);

impl ConstraintHandle {
    /// The constraint id owned by `entity`.
    #[inline]
    pub fn from_entity(entity: Entity) -> Self {
        Self(entity.to_bits())
    }
}

/// Whether a descriptor has been realized in the simulation yet.
///
/// A descriptor starts out `Unresolved` and is retried every tick until its
/// dependencies exist. Once `Resolved` it stays that way for the lifetime of
/// the component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution<H> {
    #[default]
    Unresolved,
    Resolved(H),
}

impl<H: Copy> Resolution<H> {
    #[inline]
    pub fn get(&self) -> Option<H> {
        match *self {
            Resolution::Unresolved => None,
            Resolution::Resolved(handle) => Some(handle),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}
