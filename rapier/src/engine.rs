//! A [`PhysicsEngine`] backed by an in-memory Rapier simulation.
//!
//! Handles given out to the sync layer are plain ids from a counter. The
//! engine keeps the maps between those ids and Rapier's own handles, so
//! nothing of Rapier leaks through the trait.

use bevy::{
    math::Vec3,
    platform::collections::HashMap,
    prelude::Resource,
    transform::components::GlobalTransform,
};
use physics_sync::{
    BodyFrameResult, BodyHandle, BodyKind, ConstraintFrames, ConstraintHandle, ConstraintOptions,
    EngineError, EngineResult, PhysicsBody, PhysicsEngine, ShapeHandle, ShapeRequest,
};
use rapier3d::prelude::*;
use tracing::trace;

use crate::{
    collider::collider_from_geometry,
    config::RapierConfig,
    convert::{from_vector, isometry_from_global, isometry_from_local, to_vector},
    joint::joint_from_options,
};

#[derive(Resource)]
pub struct RapierEngine {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    body_handles: HashMap<BodyHandle, RigidBodyHandle>,
    body_ids: HashMap<RigidBodyHandle, BodyHandle>,
    shape_handles: HashMap<ShapeHandle, ColliderHandle>,
    shape_ids: HashMap<ColliderHandle, ShapeHandle>,
    joint_handles: HashMap<ConstraintHandle, ImpulseJointHandle>,
    frame_results: HashMap<BodyHandle, BodyFrameResult>,
    next_id: u64,
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self::new(&RapierConfig::default())
    }
}

impl RapierEngine {
    pub fn new(config: &RapierConfig) -> Self {
        let mut engine = Self {
            gravity: to_vector(config.gravity),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_handles: HashMap::default(),
            body_ids: HashMap::default(),
            shape_handles: HashMap::default(),
            shape_ids: HashMap::default(),
            joint_handles: HashMap::default(),
            frame_results: HashMap::default(),
            next_id: 1,
        };
        engine.apply_config(config);
        engine
    }

    pub fn apply_config(&mut self, config: &RapierConfig) {
        self.gravity = to_vector(config.gravity);
        self.integration_parameters.dt = config.timestep;
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn body_count(&self) -> usize {
        self.body_handles.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shape_handles.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.joint_handles.len()
    }

    /// The Rapier body behind `handle`.
    pub fn rigid_body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(*self.body_handles.get(&handle)?)
    }

    /// The Rapier collider behind `handle`.
    pub fn collider(&self, handle: ShapeHandle) -> Option<&Collider> {
        self.colliders.get(*self.shape_handles.get(&handle)?)
    }

    /// World-space position of a body, as last integrated.
    pub fn body_translation(&self, handle: BodyHandle) -> Option<Vec3> {
        self.rigid_body(handle).map(|rb| from_vector(rb.translation()))
    }

    /// Advance the simulation by one timestep and refresh every frame result.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );

        self.refresh_frame_results();
    }

    fn refresh_frame_results(&mut self) {
        self.frame_results.clear();

        for (&id, &rb_handle) in &self.body_handles {
            let Some(rb) = self.bodies.get(rb_handle) else {
                continue;
            };
            let shapes = rb
                .colliders()
                .iter()
                .filter_map(|c| self.shape_ids.get(c).copied())
                .collect();
            self.frame_results.insert(
                id,
                BodyFrameResult {
                    linear_velocity: from_vector(rb.linvel()),
                    angular_velocity: from_vector(rb.angvel()),
                    collisions: Vec::new(),
                    shapes,
                },
            );
        }

        for pair in self.narrow_phase.contact_pairs() {
            if !pair.manifolds.iter().any(|m| !m.points.is_empty()) {
                continue;
            }
            let (Some(a), Some(b)) = (
                self.owning_body(pair.collider1),
                self.owning_body(pair.collider2),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }

            for (this, other) in [(a, b), (b, a)] {
                if let Some(result) = self.frame_results.get_mut(&this)
                    && !result.collisions.contains(&other)
                {
                    result.collisions.push(other);
                }
            }
        }
    }

    fn owning_body(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        self.body_ids.get(&parent).copied()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn rapier_body(&self, handle: BodyHandle) -> EngineResult<RigidBodyHandle> {
        self.body_handles
            .get(&handle)
            .copied()
            .ok_or(EngineError::UnknownBody(handle))
    }
}

fn body_type(kind: BodyKind) -> RigidBodyType {
    match kind {
        BodyKind::Static => RigidBodyType::Fixed,
        BodyKind::Dynamic => RigidBodyType::Dynamic,
        BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
    }
}

fn ensure_finite_pose(world: &GlobalTransform) -> EngineResult<()> {
    if world.translation().is_finite() && world.rotation().is_finite() {
        Ok(())
    } else {
        Err(EngineError::rejected("body pose is not finite"))
    }
}

impl PhysicsEngine for RapierEngine {
    fn create_body(
        &mut self,
        body: &PhysicsBody,
        world: &GlobalTransform,
    ) -> EngineResult<BodyHandle> {
        ensure_finite_pose(world)?;

        let rb = RigidBodyBuilder::new(body_type(body.kind))
            .pose(isometry_from_global(world))
            .can_sleep(body.activation.can_sleep())
            .enabled(body.activation.is_enabled())
            .linear_damping(body.linear_damping)
            .angular_damping(body.angular_damping)
            .gravity_scale(body.gravity_scale)
            .additional_mass(body.mass.max(0.0))
            .build();
        let rb_handle = self.bodies.insert(rb);

        let handle = BodyHandle(self.next_id());
        self.body_handles.insert(handle, rb_handle);
        self.body_ids.insert(rb_handle, handle);
        trace!(?handle, ?rb_handle, "inserted rigid body");
        Ok(handle)
    }

    fn update_body(
        &mut self,
        handle: BodyHandle,
        body: &PhysicsBody,
        world: &GlobalTransform,
    ) -> EngineResult<()> {
        let rb_handle = self.rapier_body(handle)?;
        let rb = self
            .bodies
            .get_mut(rb_handle)
            .ok_or(EngineError::UnknownBody(handle))?;

        rb.set_body_type(body_type(body.kind), true);
        *rb.activation_mut() = if body.activation.can_sleep() {
            RigidBodyActivation::active()
        } else {
            RigidBodyActivation::cannot_sleep()
        };
        rb.set_enabled(body.activation.is_enabled());
        rb.set_linear_damping(body.linear_damping);
        rb.set_angular_damping(body.angular_damping);
        rb.set_gravity_scale(body.gravity_scale, true);
        rb.set_additional_mass(body.mass.max(0.0), true);

        // The scene drives kinematic and static bodies, the solver drives
        // dynamic ones.
        if world.translation().is_finite() && world.rotation().is_finite() {
            match body.kind {
                BodyKind::Kinematic => rb.set_next_kinematic_position(isometry_from_global(world)),
                BodyKind::Static => rb.set_position(isometry_from_global(world), true),
                BodyKind::Dynamic => {}
            }
        }

        if body.activation.is_enabled() {
            rb.wake_up(true);
        }
        Ok(())
    }

    fn remove_body(&mut self, handle: BodyHandle) -> EngineResult<()> {
        let rb_handle = self
            .body_handles
            .remove(&handle)
            .ok_or(EngineError::UnknownBody(handle))?;
        self.body_ids.remove(&rb_handle);
        self.frame_results.remove(&handle);

        let attached: Vec<ColliderHandle> = self
            .bodies
            .get(rb_handle)
            .map(|rb| rb.colliders().to_vec())
            .unwrap_or_default();

        self.bodies.remove(
            rb_handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );

        // Rapier took the colliders and joints down with the body.
        for collider in attached {
            if let Some(shape) = self.shape_ids.remove(&collider) {
                self.shape_handles.remove(&shape);
            }
        }
        let joints = &self.impulse_joints;
        self.joint_handles
            .retain(|_, joint| joints.get(*joint).is_some());

        trace!(?handle, ?rb_handle, "removed rigid body");
        Ok(())
    }

    fn attach_shape(
        &mut self,
        body: BodyHandle,
        request: &ShapeRequest,
    ) -> EngineResult<ShapeHandle> {
        let rb_handle = self.rapier_body(body)?;

        let local = isometry_from_local(&request.local);
        let collider = collider_from_geometry(&request.geometry, request.local.scale)?
            .translation(local.translation.vector)
            .rotation(local.rotation.scaled_axis())
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, rb_handle, &mut self.bodies);

        let handle = ShapeHandle(self.next_id());
        self.shape_handles.insert(handle, collider_handle);
        self.shape_ids.insert(collider_handle, handle);
        trace!(?handle, ?collider_handle, entity = ?request.entity, "inserted collider");
        Ok(handle)
    }

    fn detach_shape(&mut self, body: BodyHandle, shape: ShapeHandle) -> EngineResult<()> {
        let collider_handle = self
            .shape_handles
            .get(&shape)
            .copied()
            .ok_or(EngineError::UnknownShape(shape))?;
        if let Some(rb_handle) = self.colliders.get(collider_handle).and_then(Collider::parent)
            && self.body_ids.get(&rb_handle) != Some(&body)
        {
            return Err(EngineError::rejected(format!(
                "shape {shape:?} is not attached to body {body:?}"
            )));
        }

        self.shape_handles.remove(&shape);
        self.shape_ids.remove(&collider_handle);
        self.colliders
            .remove(collider_handle, &mut self.islands, &mut self.bodies, true);
        Ok(())
    }

    fn add_constraint(
        &mut self,
        id: ConstraintHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        options: &ConstraintOptions,
        frames: &ConstraintFrames,
    ) -> EngineResult<ConstraintHandle> {
        if self.joint_handles.contains_key(&id) {
            return Err(EngineError::rejected(format!("constraint {id:?} already exists")));
        }
        let rb_a = self.rapier_body(body_a)?;
        let rb_b = self.rapier_body(body_b)?;
        let joint = joint_from_options(options, frames)?;

        let joint_handle = self.impulse_joints.insert(rb_a, rb_b, joint, true);
        self.joint_handles.insert(id, joint_handle);
        trace!(?id, ?joint_handle, "inserted impulse joint");
        Ok(id)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> EngineResult<()> {
        let joint_handle = self
            .joint_handles
            .remove(&handle)
            .ok_or(EngineError::UnknownConstraint(handle))?;
        self.impulse_joints.remove(joint_handle, true);
        Ok(())
    }

    fn frame_result(&self, handle: BodyHandle) -> Option<&BodyFrameResult> {
        self.frame_results.get(&handle)
    }
}
