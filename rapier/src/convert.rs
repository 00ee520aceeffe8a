//! Conversions between Bevy math types and the nalgebra types Rapier uses.

use bevy::{
    math::{Quat, Vec3},
    transform::components::{GlobalTransform, Transform},
};
use nalgebra::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector, point, vector};

#[inline]
pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
pub(crate) fn to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

#[inline]
pub(crate) fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(Translation3::from(to_vector(translation)), to_rotation(rotation))
}

/// Rigid part of a world transform. Scale does not survive the conversion.
pub(crate) fn isometry_from_global(world: &GlobalTransform) -> Isometry<Real> {
    let (_, rotation, translation) = world.to_scale_rotation_translation();
    to_isometry(translation, rotation)
}

pub(crate) fn isometry_from_local(local: &Transform) -> Isometry<Real> {
    to_isometry(local.translation, local.rotation)
}
