use physics_sync::{ConstraintFrames, ConstraintOptions, EngineError, EngineResult, JointKind};
use rapier3d::prelude::*;

use crate::convert::{isometry_from_local, to_point, to_vector};

/// Build the Rapier joint for a constraint.
///
/// `frames.frame_a` is expressed in the first body's space and `frames.frame_b`
/// in the second's. Anchors sit at the frame origins.
pub fn joint_from_options(
    options: &ConstraintOptions,
    frames: &ConstraintFrames,
) -> EngineResult<GenericJoint> {
    let anchor_a = to_point(frames.frame_a.translation);
    let anchor_b = to_point(frames.frame_b.translation);

    let joint: GenericJoint = match options.kind {
        JointKind::Fixed => FixedJointBuilder::new()
            .local_frame1(isometry_from_local(&frames.frame_a))
            .local_frame2(isometry_from_local(&frames.frame_b))
            .build()
            .into(),

        JointKind::Spherical => SphericalJointBuilder::new()
            .local_anchor1(anchor_a)
            .local_anchor2(anchor_b)
            .build()
            .into(),

        JointKind::Revolute { axis } => {
            let axis = axis
                .try_normalize()
                .ok_or_else(|| EngineError::rejected("revolute axis has no direction"))?;
            // The axis is given in the first body's space. Carry it into the
            // second body's space through the relative rotation of the frames.
            let axis_b = frames.frame_b.rotation * (frames.frame_a.rotation.inverse() * axis);
            let axis_a = UnitVector::new_normalize(to_vector(axis));
            let axis_b = UnitVector::new_normalize(to_vector(axis_b));

            let mut joint = RevoluteJointBuilder::new(axis_a)
                .local_anchor1(anchor_a)
                .local_anchor2(anchor_b)
                .build()
                .data;
            joint.set_local_axis2(axis_b);
            joint
        }
    };

    Ok(joint)
}
