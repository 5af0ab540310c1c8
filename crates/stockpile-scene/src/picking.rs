//! Click routing: labels first, then the surface

use bevy::prelude::*;

use crate::builders::LabelSprite;
use crate::camera::{MainCamera, PointerCapture};
use crate::manager::{ActiveSurvey, SceneManager};
use crate::messages::SectionSelected;
use crate::stage::Stage;

/// Pointer travel beyond which a press counts as a drag, not a click
pub const CLICK_SLOP: f32 = 4.0;
const EPSILON: f32 = 1e-8;

/// Möller–Trumbore; returns the ray parameter of the hit
pub fn ray_triangle_intersection(origin: Vec3, direction: Vec3, triangle: &[Vec3; 3]) -> Option<f32> {
    let [a, b, c] = *triangle;
    let edge1 = b - a;
    let edge2 = c - a;

    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Hit test against a rectangle centered on `center` spanning `right`/`up`
pub fn ray_rectangle_intersection(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    half_size: Vec2,
    right: Vec3,
    up: Vec3,
) -> Option<f32> {
    let normal = right.cross(up);
    let denom = direction.dot(normal);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (center - origin).dot(normal) / denom;
    if t <= 0.0 {
        return None;
    }
    let local = origin + direction * t - center;
    (local.dot(right).abs() <= half_size.x && local.dot(up).abs() <= half_size.y).then_some(t)
}

/// Closest surface hit along the ray
pub fn nearest_surface_hit(origin: Vec3, direction: Vec3, triangles: &[[Vec3; 3]]) -> Option<Vec3> {
    triangles
        .iter()
        .filter_map(|t| ray_triangle_intersection(origin, direction, t))
        .min_by(f32::total_cmp)
        .map(|t| origin + direction * t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickTarget {
    Label(Entity),
    Surface(Vec3),
    Nothing,
}

/// A label hit wins over any surface hit
pub fn route_click(
    ray: Ray3d,
    labels: impl IntoIterator<Item = (Entity, Vec3, Vec2)>,
    basis: (Vec3, Vec3),
    triangles: &[[Vec3; 3]],
) -> ClickTarget {
    let origin = ray.origin;
    let direction = *ray.direction;
    let (right, up) = basis;

    let label = labels
        .into_iter()
        .filter_map(|(entity, center, half_size)| {
            ray_rectangle_intersection(origin, direction, center, half_size, right, up).map(|t| (t, entity))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((_, entity)) = label {
        return ClickTarget::Label(entity);
    }

    match nearest_surface_hit(origin, direction, triangles) {
        Some(point) => ClickTarget::Surface(point),
        None => ClickTarget::Nothing,
    }
}

/// Where the left button went down, if it is still down
#[derive(Resource, Debug, Default)]
pub struct ClickTracker {
    pressed_at: Option<Vec2>,
}

impl ClickTracker {
    pub fn press(&mut self, position: Vec2) {
        self.pressed_at = Some(position);
    }

    /// Release; yields the click position unless the pointer wandered
    pub fn release(&mut self, position: Vec2) -> Option<Vec2> {
        self.pressed_at
            .take()
            .filter(|start| start.distance(position) <= CLICK_SLOP)
            .map(|_| position)
    }
}

pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ClickTracker>()
            .add_systems(Update, handle_clicks);
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_clicks(
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    labels: Query<(Entity, &GlobalTransform, &LabelSprite)>,
    capture: Res<PointerCapture>,
    survey: Res<ActiveSurvey>,
    mut tracker: ResMut<ClickTracker>,
    mut manager: ResMut<SceneManager>,
    mut stage: Stage,
    mut selected: MessageWriter<SectionSelected>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    if mouse_button.just_pressed(MouseButton::Left) {
        if capture.0 {
            return;
        }
        tracker.press(cursor);
    }
    if !mouse_button.just_released(MouseButton::Left) {
        return;
    }
    let Some(position) = tracker.release(cursor) else {
        return;
    };

    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, position) else {
        return;
    };

    let basis = (*camera_transform.right(), *camera_transform.up());
    let candidates = labels
        .iter()
        .map(|(entity, transform, sprite)| (entity, transform.translation(), sprite.half_size));

    let target = route_click(ray, candidates, basis, manager.surface_triangles());
    match target {
        ClickTarget::Label(entity) => {
            manager.handle_sprite_click(&mut stage, entity);
        }
        ClickTarget::Surface(point) => {
            manager.handle_mesh_click(&survey.grid, point.x as f64, |x| {
                selected.write(SectionSelected(Some(x)));
            });
        }
        ClickTarget::Nothing => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_ray(x: f32, y: f32) -> Ray3d {
        Ray3d::new(Vec3::new(x, y, 100.0), Dir3::NEG_Z)
    }

    const FLOOR: [Vec3; 3] = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(0.0, 10.0, 0.0),
    ];

    #[test]
    fn test_triangle_hit_and_miss() {
        let t = ray_triangle_intersection(Vec3::new(2.0, 2.0, 5.0), Vec3::NEG_Z, &FLOOR).unwrap();
        assert!((t - 5.0).abs() < 1e-4);

        assert_eq!(ray_triangle_intersection(Vec3::new(8.0, 8.0, 5.0), Vec3::NEG_Z, &FLOOR), None);
        // Parallel
        assert_eq!(ray_triangle_intersection(Vec3::new(2.0, 2.0, 5.0), Vec3::X, &FLOOR), None);
        // Behind the origin
        assert_eq!(ray_triangle_intersection(Vec3::new(2.0, 2.0, -5.0), Vec3::NEG_Z, &FLOOR), None);
    }

    #[test]
    fn test_nearest_surface_hit() {
        let upper = FLOOR.map(|v| v + Vec3::Z * 3.0);
        let hit = nearest_surface_hit(Vec3::new(1.0, 1.0, 10.0), Vec3::NEG_Z, &[FLOOR, upper]).unwrap();
        assert!(hit.distance(Vec3::new(1.0, 1.0, 3.0)) < 1e-4);
    }

    #[test]
    fn test_rectangle_hit_respects_extent() {
        let hit = |x: f32| {
            ray_rectangle_intersection(
                Vec3::new(x, 0.0, 10.0),
                Vec3::NEG_Z,
                Vec3::ZERO,
                Vec2::new(250.0, 125.0),
                Vec3::X,
                Vec3::Y,
            )
        };
        assert_eq!(hit(200.0), Some(10.0));
        assert_eq!(hit(300.0), None);
    }

    #[test]
    fn test_labels_take_priority() {
        let label = World::new().spawn_empty().id();
        let labels = [(label, Vec3::new(2.0, 2.0, -50.0), Vec2::splat(0.5))];

        // Label sits behind the surface and still wins
        let target = route_click(down_ray(2.0, 2.0), labels, (Vec3::X, Vec3::Y), &[FLOOR]);
        assert_eq!(target, ClickTarget::Label(label));

        let target = route_click(down_ray(1.0, 1.0), labels, (Vec3::X, Vec3::Y), &[FLOOR]);
        let ClickTarget::Surface(point) = target else {
            panic!("expected a surface hit, got {target:?}");
        };
        assert!(point.distance(Vec3::new(1.0, 1.0, 0.0)) < 1e-3);

        let target = route_click(down_ray(50.0, 50.0), labels, (Vec3::X, Vec3::Y), &[FLOOR]);
        assert_eq!(target, ClickTarget::Nothing);
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut tracker = ClickTracker::default();
        tracker.press(Vec2::new(10.0, 10.0));
        assert_eq!(tracker.release(Vec2::new(12.0, 13.0)), Some(Vec2::new(12.0, 13.0)));

        tracker.press(Vec2::new(10.0, 10.0));
        assert_eq!(tracker.release(Vec2::new(30.0, 10.0)), None);

        // Release without a press
        assert_eq!(tracker.release(Vec2::ZERO), None);
    }
}
