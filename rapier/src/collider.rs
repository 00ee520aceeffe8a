use bevy::math::Vec3;
use physics_sync::{EngineError, EngineResult, ShapeGeometry};
use rapier3d::prelude::*;

use crate::convert::to_point;

/// Build a Rapier collider for `geometry`, stretched by `scale`.
///
/// The collider is created with identity local transform; the caller places it
/// relative to its parent body. Radii only follow uniform scale, so a sphere
/// takes the largest axis and Y-aligned shapes take the largest of X and Z.
pub fn collider_from_geometry(geometry: &ShapeGeometry, scale: Vec3) -> EngineResult<ColliderBuilder> {
    let scale = scale.abs();
    let radial = scale.x.max(scale.z);

    match geometry {
        ShapeGeometry::Box { half_extents } => {
            let h = *half_extents * scale;
            ensure_positive("box half extent", h.min_element())?;
            ensure_finite("box half extent", h.max_element())?;
            Ok(ColliderBuilder::cuboid(h.x, h.y, h.z))
        }

        ShapeGeometry::Sphere { radius } => {
            let radius = radius * scale.max_element();
            ensure_positive("sphere radius", radius)?;
            Ok(ColliderBuilder::ball(radius))
        }

        ShapeGeometry::Capsule {
            radius,
            half_height,
        } => {
            let radius = radius * radial;
            let half_height = half_height * scale.y;
            ensure_positive("capsule radius", radius)?;
            ensure_non_negative("capsule half height", half_height)?;
            Ok(ColliderBuilder::capsule_y(half_height, radius))
        }

        ShapeGeometry::Cylinder {
            radius,
            half_height,
        } => {
            let radius = radius * radial;
            let half_height = half_height * scale.y;
            ensure_positive("cylinder radius", radius)?;
            ensure_positive("cylinder half height", half_height)?;
            Ok(ColliderBuilder::cylinder(half_height, radius))
        }

        ShapeGeometry::Cone {
            radius,
            half_height,
        } => {
            let radius = radius * radial;
            let half_height = half_height * scale.y;
            ensure_positive("cone radius", radius)?;
            ensure_positive("cone half height", half_height)?;
            Ok(ColliderBuilder::cone(half_height, radius))
        }

        ShapeGeometry::Hull { points } => {
            if points.len() < 4 {
                return Err(EngineError::degenerate_shape(format!(
                    "hull needs at least 4 points, got {}",
                    points.len()
                )));
            }
            if points.iter().any(|p| !p.is_finite()) {
                return Err(EngineError::degenerate_shape("hull has non-finite points"));
            }
            let points: Vec<Point<Real>> = points.iter().map(|p| to_point(*p * scale)).collect();
            ColliderBuilder::convex_hull(&points).ok_or_else(|| {
                EngineError::degenerate_shape(format!(
                    "no convex hull through {} points",
                    points.len()
                ))
            })
        }
    }
}

fn ensure_positive(what: &str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::degenerate_shape(format!("{what} must be positive, got {value}")))
    }
}

fn ensure_non_negative(what: &str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::degenerate_shape(format!("{what} must not be negative, got {value}")))
    }
}

fn ensure_finite(what: &str, value: f32) -> EngineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::degenerate_shape(format!("{what} must be finite, got {value}")))
    }
}
