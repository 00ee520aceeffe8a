//! Collision shape descriptors and their attachment to rigid bodies.
//!
//! A [`PhysicsShape`] may sit on the body's own entity or anywhere below it in
//! the hierarchy. It stays unresolved until its nearest [`PhysicsBody`]
//! ancestor has been realized, then gets attached exactly once.

use bevy::{prelude::*, transform::helper::TransformHelper};
use tracing::{debug, error, warn};

use crate::{
    ancestor::find_body_ancestor_in,
    body::PhysicsBody,
    command::{SyncCommand, SyncQueue},
    engine::{PhysicsEngine, ShapeRequest, rigid_pose},
    handle::{BodyHandle, Resolution, ShapeHandle},
    registry::{HandleRegistry, ShapeAttachment},
};

/// Collision geometry, in the shape entity's local space.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Y-aligned capsule.
    Capsule { radius: f32, half_height: f32 },
    /// Y-aligned cylinder.
    Cylinder { radius: f32, half_height: f32 },
    /// Y-aligned cone.
    Cone { radius: f32, half_height: f32 },
    /// Convex hull of a point cloud.
    Hull { points: Vec<Vec3> },
}

/// Where a shape's dimensions come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapeFit {
    /// Use the declared geometry as is.
    #[default]
    Manual,
    /// Derive the dimensions from the entity's [`MeshGeometry`]. Only the
    /// variant of the declared geometry matters.
    All,
}

/// Declares a collision shape for the nearest [`PhysicsBody`] at or above
/// this entity.
#[derive(Component, Debug)]
#[require(Transform)]
pub struct PhysicsShape {
    pub geometry: ShapeGeometry,
    pub fit: ShapeFit,
    /// Offset of the shape from the entity origin, in local space.
    pub offset: Vec3,
    attachment: Resolution<ShapeAttachment>,
}

impl PhysicsShape {
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            fit: ShapeFit::Manual,
            offset: Vec3::ZERO,
            attachment: Resolution::Unresolved,
        }
    }

    /// A shape of the same kind as `geometry`, sized from the entity's mesh.
    pub fn fit_to_mesh(geometry: ShapeGeometry) -> Self {
        Self {
            fit: ShapeFit::All,
            ..Self::new(geometry)
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ShapeGeometry::Box { half_extents })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ShapeGeometry::Sphere { radius })
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    #[inline]
    pub fn attachment(&self) -> Option<ShapeAttachment> {
        self.attachment.get()
    }

    #[inline]
    pub fn handle(&self) -> Option<ShapeHandle> {
        self.attachment.get().map(|a| a.shape)
    }

    #[inline]
    pub fn body_handle(&self) -> Option<BodyHandle> {
        self.attachment.get().map(|a| a.body)
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.attachment.is_resolved()
    }
}

/// Axis-aligned bounds of a mesh in its local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl LocalBounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Renderable geometry of an entity, as far as shape fitting is concerned.
#[derive(Component, Clone, Debug, Default)]
pub struct MeshGeometry {
    pub positions: Vec<Vec3>,
    bounds: Option<LocalBounds>,
}

impl MeshGeometry {
    pub fn new(positions: Vec<Vec3>) -> Self {
        let bounds = LocalBounds::from_points(&positions);
        Self { positions, bounds }
    }

    /// Bounds as of the last [`MeshGeometry::recompute_bounds`].
    pub fn bounds(&self) -> Option<LocalBounds> {
        self.bounds
    }

    pub fn recompute_bounds(&mut self) -> Option<LocalBounds> {
        self.bounds = LocalBounds::from_points(&self.positions);
        self.bounds
    }
}

/// Size `kind` to a mesh. Returns the fitted geometry and the offset of its
/// center from the entity origin.
pub fn fit_geometry(kind: &ShapeGeometry, mesh: &MeshGeometry) -> Option<(ShapeGeometry, Vec3)> {
    let bounds = mesh.bounds()?;
    let center = bounds.center();
    let half = bounds.half_extents();
    let horizontal = half.x.max(half.z);

    let geometry = match kind {
        ShapeGeometry::Box { .. } => ShapeGeometry::Box { half_extents: half },
        ShapeGeometry::Sphere { .. } => ShapeGeometry::Sphere {
            radius: mesh
                .positions
                .iter()
                .map(|p| p.distance(center))
                .fold(0.0, f32::max),
        },
        ShapeGeometry::Capsule { .. } => ShapeGeometry::Capsule {
            radius: horizontal,
            half_height: (half.y - horizontal).max(0.0),
        },
        ShapeGeometry::Cylinder { .. } => ShapeGeometry::Cylinder {
            radius: horizontal,
            half_height: half.y,
        },
        ShapeGeometry::Cone { .. } => ShapeGeometry::Cone {
            radius: horizontal,
            half_height: half.y,
        },
        // Hull points keep their own positions, no recentering.
        ShapeGeometry::Hull { .. } => {
            return Some((
                ShapeGeometry::Hull {
                    points: mesh.positions.clone(),
                },
                Vec3::ZERO,
            ));
        }
    };

    Some((geometry, center))
}

pub(crate) fn plan_shapes(
    shapes: Query<(Entity, &PhysicsShape)>,
    bodies: Query<&PhysicsBody>,
    parents: Query<&ChildOf>,
    mut queue: ResMut<SyncQueue>,
) {
    for (entity, shape) in &shapes {
        if shape.is_resolved() {
            continue;
        }

        // No body in the hierarchy (yet): try again next tick.
        let Some(body_entity) = find_body_ancestor_in(entity, &parents, &bodies) else {
            continue;
        };
        let Some(body) = bodies.get(body_entity).ok().and_then(PhysicsBody::handle) else {
            continue;
        };

        queue.push(SyncCommand::AttachShape {
            entity,
            body_entity,
            body,
        });
    }
}

pub(crate) fn attach_shape<E: PhysicsEngine>(
    entity: Entity,
    body_entity: Entity,
    body: BodyHandle,
    engine: &mut E,
    registry: &mut HandleRegistry,
    shapes: &mut Query<&mut PhysicsShape>,
    meshes: &mut Query<&mut MeshGeometry>,
    transforms: &TransformHelper,
) {
    let Ok(mut shape) = shapes.get_mut(entity) else {
        return;
    };
    if shape.is_resolved() {
        return;
    }

    let (geometry, center) = match shape.fit {
        ShapeFit::Manual => (shape.geometry.clone(), Vec3::ZERO),
        ShapeFit::All => match meshes.get_mut(entity) {
            Ok(mut mesh) => {
                mesh.recompute_bounds();
                fit_geometry(&shape.geometry, &mesh).unwrap_or_else(|| {
                    warn!(?entity, "mesh geometry is empty, using declared shape");
                    (shape.geometry.clone(), Vec3::ZERO)
                })
            }
            Err(_) => {
                error!(?entity, "cannot fit shape to mesh: entity has no mesh geometry");
                (shape.geometry.clone(), Vec3::ZERO)
            }
        },
    };

    let (shape_world, body_world) = match (
        transforms.compute_global_transform(entity),
        transforms.compute_global_transform(body_entity),
    ) {
        (Ok(shape_world), Ok(body_world)) => (shape_world, body_world),
        (Err(err), _) | (_, Err(err)) => {
            warn!(?entity, %err, "shape has no world transform yet, retrying next tick");
            return;
        }
    };

    let mut local = shape_world.reparented_to(&rigid_pose(&body_world));
    local.translation = local.transform_point(shape.offset + center);

    let request = ShapeRequest {
        entity,
        geometry,
        local,
    };

    match engine.attach_shape(body, &request) {
        Ok(handle) => {
            let attachment = ShapeAttachment {
                shape: handle,
                body,
            };
            shape.attachment = Resolution::Resolved(attachment);
            registry.register_shape(entity, attachment);
            debug!(?entity, ?body_entity, ?handle, "attached shape");
        }
        Err(err) => {
            warn!(?entity, %err, "shape attachment failed, retrying next tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube_at(center: Vec3) -> MeshGeometry {
        let mut positions = Vec::new();
        for x in [-0.5, 0.5] {
            for y in [-0.5, 0.5] {
                for z in [-0.5, 0.5] {
                    positions.push(center + Vec3::new(x, y, z));
                }
            }
        }
        MeshGeometry::new(positions)
    }

    #[test]
    fn bounds_cover_all_points() {
        let points = [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 4.0)];

        let bounds = LocalBounds::from_points(&points).unwrap();

        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 4.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 0.5, 2.0));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let mut mesh = MeshGeometry::default();

        assert_eq!(mesh.recompute_bounds(), None);
        assert!(fit_geometry(&ShapeGeometry::Sphere { radius: 1.0 }, &mesh).is_none());
    }

    #[test]
    fn recompute_picks_up_edited_positions() {
        let mut mesh = unit_cube_at(Vec3::ZERO);
        mesh.positions.push(Vec3::new(0.0, 5.0, 0.0));

        // Stale until recomputed.
        assert_eq!(mesh.bounds().unwrap().max.y, 0.5);
        assert_eq!(mesh.recompute_bounds().unwrap().max.y, 5.0);
    }

    #[test]
    fn box_fits_mesh_bounds() {
        let mesh = unit_cube_at(Vec3::new(0.0, 2.0, 0.0));

        let (geometry, center) = fit_geometry(
            &ShapeGeometry::Box {
                half_extents: Vec3::splat(10.0),
            },
            &mesh,
        )
        .unwrap();

        assert_eq!(
            geometry,
            ShapeGeometry::Box {
                half_extents: Vec3::splat(0.5)
            }
        );
        assert_eq!(center, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn sphere_reaches_farthest_vertex() {
        let mesh = unit_cube_at(Vec3::ZERO);

        let (geometry, _) = fit_geometry(&ShapeGeometry::Sphere { radius: 0.0 }, &mesh).unwrap();

        let ShapeGeometry::Sphere { radius } = geometry else {
            panic!("expected a sphere");
        };
        assert!((radius - Vec3::splat(0.5).length()).abs() < 1.0e-6);
    }

    #[test]
    fn capsule_height_never_negative() {
        let mesh = MeshGeometry::new(vec![Vec3::new(-2.0, -0.5, -2.0), Vec3::new(2.0, 0.5, 2.0)]);

        let (geometry, _) = fit_geometry(
            &ShapeGeometry::Capsule {
                radius: 0.0,
                half_height: 0.0,
            },
            &mesh,
        )
        .unwrap();

        assert_eq!(
            geometry,
            ShapeGeometry::Capsule {
                radius: 2.0,
                half_height: 0.0
            }
        );
    }

    #[test]
    fn hull_takes_mesh_points_verbatim() {
        let mesh = unit_cube_at(Vec3::new(3.0, 0.0, 0.0));

        let (geometry, center) =
            fit_geometry(&ShapeGeometry::Hull { points: vec![] }, &mesh).unwrap();

        assert_eq!(
            geometry,
            ShapeGeometry::Hull {
                points: mesh.positions.clone()
            }
        );
        assert_eq!(center, Vec3::ZERO);
    }
}
