//! An in-memory engine that records what the sync layer asks of it.

use bevy::{platform::collections::HashMap, prelude::*};

use crate::{
    body::{Activation, BodyKind, PhysicsBody},
    constraint::ConstraintOptions,
    engine::{
        BodyFrameResult, ConstraintFrames, EngineError, EngineResult, PhysicsEngine, ShapeRequest,
    },
    handle::{BodyHandle, ConstraintHandle, ShapeHandle},
    shape::ShapeGeometry,
};

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    CreateBody {
        handle: BodyHandle,
        kind: BodyKind,
        activation: Activation,
        translation: Vec3,
    },
    UpdateBody {
        handle: BodyHandle,
        kind: BodyKind,
        activation: Activation,
    },
    RemoveBody(BodyHandle),
    AttachShape {
        body: BodyHandle,
        shape: ShapeHandle,
        entity: Entity,
        geometry: ShapeGeometry,
        local: Transform,
    },
    DetachShape {
        body: BodyHandle,
        shape: ShapeHandle,
    },
    AddConstraint {
        id: ConstraintHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        options: ConstraintOptions,
        frames: ConstraintFrames,
    },
    RemoveConstraint(ConstraintHandle),
}

impl EngineCall {
    pub fn is_create_body(&self) -> bool {
        matches!(self, EngineCall::CreateBody { .. })
    }

    pub fn is_attach_shape(&self) -> bool {
        matches!(self, EngineCall::AttachShape { .. })
    }

    pub fn is_add_constraint(&self) -> bool {
        matches!(self, EngineCall::AddConstraint { .. })
    }
}

#[derive(Resource, Debug)]
pub struct RecordingEngine {
    pub calls: Vec<EngineCall>,
    pub ready: bool,
    /// Reject every body creation while set.
    pub fail_creation: bool,
    pub fail_update: bool,
    pub fail_attach: bool,
    pub frame_results: HashMap<BodyHandle, BodyFrameResult>,
    next_id: u64,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            ready: true,
            fail_creation: false,
            fail_update: false,
            fail_attach: false,
            frame_results: HashMap::default(),
            next_id: 1,
        }
    }
}

impl RecordingEngine {
    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl PhysicsEngine for RecordingEngine {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn create_body(
        &mut self,
        body: &PhysicsBody,
        world: &GlobalTransform,
    ) -> EngineResult<BodyHandle> {
        if self.fail_creation {
            return Err(EngineError::rejected("creation disabled"));
        }
        let handle = BodyHandle(self.next_id());
        self.calls.push(EngineCall::CreateBody {
            handle,
            kind: body.kind,
            activation: body.activation,
            translation: world.translation(),
        });
        Ok(handle)
    }

    fn update_body(
        &mut self,
        handle: BodyHandle,
        body: &PhysicsBody,
        _world: &GlobalTransform,
    ) -> EngineResult<()> {
        if self.fail_update {
            return Err(EngineError::rejected("updates disabled"));
        }
        self.calls.push(EngineCall::UpdateBody {
            handle,
            kind: body.kind,
            activation: body.activation,
        });
        Ok(())
    }

    fn remove_body(&mut self, handle: BodyHandle) -> EngineResult<()> {
        self.calls.push(EngineCall::RemoveBody(handle));
        Ok(())
    }

    fn attach_shape(
        &mut self,
        body: BodyHandle,
        request: &ShapeRequest,
    ) -> EngineResult<ShapeHandle> {
        if self.fail_attach {
            return Err(EngineError::rejected("attachment disabled"));
        }
        let shape = ShapeHandle(self.next_id());
        self.calls.push(EngineCall::AttachShape {
            body,
            shape,
            entity: request.entity,
            geometry: request.geometry.clone(),
            local: request.local,
        });
        Ok(shape)
    }

    fn detach_shape(&mut self, body: BodyHandle, shape: ShapeHandle) -> EngineResult<()> {
        self.calls.push(EngineCall::DetachShape { body, shape });
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
        self.calls.push(EngineCall::AddConstraint {
            id,
            body_a,
            body_b,
            options: *options,
            frames: *frames,
        });
        Ok(id)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> EngineResult<()> {
        self.calls.push(EngineCall::RemoveConstraint(handle));
        Ok(())
    }

    fn frame_result(&self, handle: BodyHandle) -> Option<&BodyFrameResult> {
        self.frame_results.get(&handle)
    }
}
