//! Scheduling of the per-tick sync pass.

use std::marker::PhantomData;

use bevy::{
    ecs::{intern::Interned, schedule::ScheduleLabel},
    prelude::*,
};

use crate::{
    body::{plan_bodies, pull_frame_results},
    command::{SyncQueue, apply_sync_commands},
    constraint::plan_constraints,
    engine::PhysicsEngine,
    registry::HandleRegistry,
    shape::plan_shapes,
    teardown::{plan_removed_bodies, plan_removed_constraints, plan_removed_shapes},
};

/// The whole sync pass. Order your own systems against this set.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsSyncSystems;

/// Steps of the sync pass, run in order inside [`PhysicsSyncSystems`].
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    /// Inspect descriptors and queue commands. Never touches the engine.
    Plan,
    /// Execute the queued commands against the engine.
    Apply,
    /// Copy simulation results back onto the descriptors.
    Pull,
}

/// Keeps descriptors of the scene and the physics engine `E` in lockstep.
///
/// The engine resource must be inserted separately. Until it exists and
/// reports [`PhysicsEngine::is_ready`], the whole pass is skipped.
pub struct PhysicsSyncPlugin<E: PhysicsEngine> {
    schedule: Interned<dyn ScheduleLabel>,
    _engine: PhantomData<fn() -> E>,
}

impl<E: PhysicsEngine> PhysicsSyncPlugin<E> {
    /// Run the sync pass in `schedule`. The default is `PostUpdate`.
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
            _engine: PhantomData,
        }
    }
}

impl<E: PhysicsEngine> Default for PhysicsSyncPlugin<E> {
    fn default() -> Self {
        Self::new(PostUpdate)
    }
}

impl<E: PhysicsEngine> Plugin for PhysicsSyncPlugin<E> {
    fn build(&self, app: &mut App) {
        let schedule = self.schedule;

        app.init_resource::<HandleRegistry>()
            .init_resource::<SyncQueue>();

        app.configure_sets(
            schedule,
            (SyncStep::Plan, SyncStep::Apply, SyncStep::Pull)
                .chain()
                .in_set(PhysicsSyncSystems),
        )
        .configure_sets(schedule, PhysicsSyncSystems.run_if(engine_ready::<E>));

        // Removals are planned last so every creation pass of the tick sees
        // the same start-of-tick state.
        app.add_systems(
            schedule,
            (
                plan_bodies,
                plan_shapes,
                plan_constraints,
                plan_removed_constraints,
                plan_removed_shapes,
                plan_removed_bodies,
            )
                .chain()
                .in_set(SyncStep::Plan),
        )
        .add_systems(schedule, apply_sync_commands::<E>.in_set(SyncStep::Apply))
        .add_systems(schedule, pull_frame_results::<E>.in_set(SyncStep::Pull));
    }
}

fn engine_ready<E: PhysicsEngine>(engine: Option<Res<E>>) -> bool {
    engine.is_some_and(|engine| engine.is_ready())
}
