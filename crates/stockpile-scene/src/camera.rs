//! Free-flight camera

use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;
use std::f32::consts::PI;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Flight tuning
#[derive(Resource, Debug, Clone)]
pub struct FlightSettings {
    /// World units per second
    pub movement_speed: f32,
    /// Radians per second
    pub roll_speed: f32,
    /// Radians per pixel of drag
    pub look_sensitivity: f32,
}

impl Default for FlightSettings {
    fn default() -> Self {
        Self {
            movement_speed: 1000.0,
            roll_speed: PI / 24.0,
            look_sensitivity: 0.003,
        }
    }
}

/// Set while the UI has the pointer; camera and click handling stand down
#[derive(Resource, Debug, Default)]
pub struct PointerCapture(pub bool);

pub const INITIAL_POSITION: Vec3 = Vec3::new(3126.94, 3356.79, 3210.10);

pub fn initial_transform() -> Transform {
    Transform::from_translation(INITIAL_POSITION)
        .with_rotation(Quat::from_xyzw(0.191_458_82, 0.4884, 0.7728, 0.3570).normalize())
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FlightSettings>()
            .init_resource::<PointerCapture>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, fly_camera);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 75f32.to_radians(),
            near: 0.1,
            far: 1_000_000.0,
            ..default()
        }),
        initial_transform(),
        MainCamera,
    ));
}

/// Local-space translation direction and roll direction from held keys
pub fn flight_axes(keys: &ButtonInput<KeyCode>) -> (Vec3, f32) {
    let axis = |positive: KeyCode, negative: KeyCode| {
        keys.pressed(positive) as i8 as f32 - keys.pressed(negative) as i8 as f32
    };

    let movement = Vec3::new(
        axis(KeyCode::KeyD, KeyCode::KeyA),
        axis(KeyCode::KeyR, KeyCode::KeyF),
        axis(KeyCode::KeyS, KeyCode::KeyW),
    );
    let roll = axis(KeyCode::KeyQ, KeyCode::KeyE);
    (movement, roll)
}

fn fly_camera(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    capture: Res<PointerCapture>,
    settings: Res<FlightSettings>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    let (movement, roll) = flight_axes(&keys);
    if movement != Vec3::ZERO {
        let step = transform.rotation * movement.normalize() * settings.movement_speed * dt;
        transform.translation += step;
    }
    if roll != 0.0 {
        transform.rotate_local_z(roll * settings.roll_speed * dt);
    }

    // Drag to look
    if capture.0 || !mouse_button.pressed(MouseButton::Left) {
        return;
    }
    let delta = mouse_motion.delta;
    if delta != Vec2::ZERO {
        transform.rotate_local_y(-delta.x * settings.look_sensitivity);
        transform.rotate_local_x(-delta.y * settings.look_sensitivity);
    }
}
