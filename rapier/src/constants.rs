use bevy::math::Vec3;

/// Gravity applied to every dynamic body, in meters per second squared.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Length of one simulation step in seconds.
///
/// The engine advances by exactly one step per tick, so this should match the
/// rate of the schedule the engine runs in.
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;
