use bevy::{
    ecs::{intern::Interned, schedule::ScheduleLabel},
    prelude::*,
};
use physics_sync::{PhysicsSyncPlugin, PhysicsSyncSystems};

use crate::{config::RapierConfig, engine::RapierEngine};

/// Steps the [`RapierEngine`] once per run of `schedule`, right before the
/// sync pass, and adds the [`PhysicsSyncPlugin`] for it if it is missing.
pub struct RapierEnginePlugin {
    schedule: Interned<dyn ScheduleLabel>,
}

impl RapierEnginePlugin {
    /// The default schedule is `PostUpdate`.
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
        }
    }
}

impl Default for RapierEnginePlugin {
    fn default() -> Self {
        Self::new(PostUpdate)
    }
}

impl Plugin for RapierEnginePlugin {
    fn build(&self, app: &mut App) {
        let config = *app.world_mut().get_resource_or_init::<RapierConfig>();
        app.insert_resource(RapierEngine::new(&config));

        if !app.is_plugin_added::<PhysicsSyncPlugin<RapierEngine>>() {
            app.add_plugins(PhysicsSyncPlugin::<RapierEngine>::new(self.schedule));
        }

        app.add_systems(
            self.schedule,
            (
                apply_config.run_if(resource_changed::<RapierConfig>),
                step_engine,
            )
                .chain()
                .before(PhysicsSyncSystems),
        );
    }
}

fn apply_config(config: Res<RapierConfig>, mut engine: ResMut<RapierEngine>) {
    engine.apply_config(&config);
}

fn step_engine(mut engine: ResMut<RapierEngine>) {
    engine.step();
}

#[cfg(test)]
mod tests {
    use physics_sync::{PhysicsBody, PhysicsShape};

    use super::*;

    #[test]
    fn default_config_is_inserted() {
        let mut app = App::new();
        app.add_plugins(RapierEnginePlugin::default());

        assert_eq!(
            *app.world().resource::<RapierConfig>(),
            RapierConfig::default()
        );
        assert_eq!(
            app.world().resource::<RapierEngine>().timestep(),
            RapierConfig::default().timestep
        );
    }

    #[test]
    fn config_changes_reach_the_engine() {
        let mut app = App::new();
        app.insert_resource(RapierConfig {
            gravity: Vec3::ZERO,
            ..default()
        })
        .add_plugins(RapierEnginePlugin::default());
        assert_eq!(app.world().resource::<RapierEngine>().gravity(), Vec3::ZERO);

        app.world_mut().resource_mut::<RapierConfig>().gravity = Vec3::NEG_Y;
        app.update();

        assert_eq!(app.world().resource::<RapierEngine>().gravity(), Vec3::NEG_Y);
    }

    #[test]
    fn scene_bodies_fall_under_gravity() {
        let mut app = App::new();
        app.add_plugins(RapierEnginePlugin::default());
        let body = app
            .world_mut()
            .spawn((PhysicsBody::dynamic(), Transform::from_xyz(0.0, 5.0, 0.0)))
            .id();
        let shape = app
            .world_mut()
            .spawn((PhysicsShape::sphere(0.5), ChildOf(body)))
            .id();

        // Created, attached, then reported by a step.
        for _ in 0..3 {
            app.update();
        }

        let shape_handle = app.world().get::<PhysicsShape>(shape).unwrap().handle();
        let body = app.world().get::<PhysicsBody>(body).unwrap();
        assert!(body.linear_velocity().y < 0.0);
        assert_eq!(body.shapes().len(), 1);
        assert_eq!(body.shapes().first().copied(), shape_handle);
        assert_eq!(app.world().resource::<RapierEngine>().body_count(), 1);
    }

    #[test]
    fn colliders_follow_body_scale() {
        let mut app = App::new();
        app.add_plugins(RapierEnginePlugin::default());
        let body = app
            .world_mut()
            .spawn((PhysicsBody::fixed(), Transform::from_scale(Vec3::splat(2.0))))
            .id();
        let shape = app
            .world_mut()
            .spawn((
                PhysicsShape::sphere(0.5),
                Transform::from_xyz(1.0, 0.0, 0.0),
                ChildOf(body),
            ))
            .id();
        app.update();
        app.update();

        let handle = app
            .world()
            .get::<PhysicsShape>(shape)
            .unwrap()
            .handle()
            .unwrap();
        let engine = app.world().resource::<RapierEngine>();
        let collider = engine.collider(handle).unwrap();
        let offset = collider.position_wrt_parent().unwrap().translation.vector;
        assert!((offset.x - 2.0).abs() < 1.0e-5);
        assert!((collider.shape().as_ball().unwrap().radius - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn despawned_bodies_leave_the_simulation() {
        let mut app = App::new();
        app.add_plugins(RapierEnginePlugin::default());
        let body = app
            .world_mut()
            .spawn((PhysicsBody::dynamic(), PhysicsShape::cuboid(Vec3::splat(0.5))))
            .id();
        app.update();
        app.update();
        assert_eq!(app.world().resource::<RapierEngine>().shape_count(), 1);

        app.world_mut().despawn(body);
        app.update();

        let engine = app.world().resource::<RapierEngine>();
        assert_eq!(engine.body_count(), 0);
        assert_eq!(engine.shape_count(), 0);
    }
}
