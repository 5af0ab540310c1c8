//! Decorative indicators: the unloading arrow and the conveyor ramp

use bevy::prelude::*;

use crate::stage::{hex_color, quad_mesh, translucent, triangle_mesh, SceneNode, Stage, StageBuilder};

const MARKER_COLOR: u32 = 0xfa4d56;
const RAMP_COLOR: u32 = 0x0a49be;
const RAMP_GRID_COLOR: u32 = 0xc2c2c2;

const SHAFT_RADIUS: f32 = 16.0;
const TIP_RADIUS: f32 = 12.0;
const TIP_LENGTH: f32 = 300.0;
const CYLINDER_SEGMENTS: u32 = 8;

const RAMP_HALF_WIDTH: f32 = 250.0;

fn base_x(scale: f32) -> f32 {
    (3764.0 * scale + 3764.0) / 2.0
}

/// Cylinder running from `from` to `to`
fn segment(stage: &mut Stage, from: Vec3, to: Vec3, radius: f32, material: StandardMaterial) -> SceneNode {
    let span = to - from;
    let mesh = Cylinder::new(radius, span.length())
        .mesh()
        .resolution(CYLINDER_SEGMENTS)
        .build();
    let transform = Transform::from_translation((from + to) / 2.0)
        .with_rotation(Quat::from_rotation_arc(Vec3::Y, span.normalize()));
    stage.spawn_mesh(mesh, material, transform)
}

/// Red unloading marker with an arrow from the ramp to it
pub struct Arrow {
    scale: f32,
    nodes: Vec<SceneNode>,
}

impl Arrow {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            nodes: Vec::new(),
        }
    }

    /// Shaft endpoints and the two tip endpoints
    pub fn geometry(&self) -> (Vec3, Vec3, [Vec3; 2]) {
        let start = Vec3::new(base_x(self.scale), 1565.0, -30.0);
        let end = Vec3::new(-1000.0, 1565.0, -30.0);
        let direction = (end - start).normalize();
        let perpendicular = Vec3::new(-direction.z, 0.0, direction.x).normalize();
        let back = end - direction * TIP_LENGTH;
        let spread = perpendicular * TIP_LENGTH * 0.6;
        (start, end, [back + spread, back - spread])
    }
}

impl StageBuilder for Arrow {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let color = hex_color(MARKER_COLOR);
        let marker = stage.spawn_mesh(
            quad_mesh(Vec3::new(0.0, 1565.0, -60.0), Vec3::X * 1000.0, Vec3::Z * 350.0),
            translucent(color, 0.5),
            Transform::IDENTITY,
        );

        let (start, end, tips) = self.geometry();
        let mut parts = vec![segment(stage, start, end, SHAFT_RADIUS, translucent(color, 0.9))];
        for tip in tips {
            parts.push(segment(stage, end, tip, TIP_RADIUS, translucent(color, 0.9)));
        }
        let arrow = stage.spawn_group(Transform::IDENTITY, parts);

        vec![marker, arrow]
    }

    fn owned(&self) -> &[SceneNode] {
        &self.nodes
    }

    fn owned_mut(&mut self) -> &mut Vec<SceneNode> {
        &mut self.nodes
    }
}

/// Conveyor ramp: a sloped plate ending in a box, plus tapered cross slats
pub struct Ramp {
    scale: f32,
    nodes: Vec<SceneNode>,
}

impl Ramp {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            nodes: Vec::new(),
        }
    }

    pub fn body_vertices(&self) -> Vec<[f32; 3]> {
        let near = base_x(self.scale) + RAMP_HALF_WIDTH;
        let far = base_x(self.scale) - RAMP_HALF_WIDTH;

        // Two triangles per face, split along a-c
        let face = |a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3]| [a, b, c, a, c, d];
        [
            // Sloped plate
            face([near, -1560.0, 2100.0], [near, 1560.0, 400.0], [far, 1560.0, 400.0], [far, -1560.0, 2100.0]),
            // Box top
            face([near, 1760.0, 400.0], [near, 1760.0, 0.0], [far, 1760.0, 0.0], [far, 1760.0, 400.0]),
            // Box bottom
            face([near, 1570.0, 400.0], [near, 1570.0, 0.0], [far, 1570.0, 0.0], [far, 1570.0, 400.0]),
            // Box front
            face([near, 1760.0, 400.0], [near, 1570.0, 400.0], [far, 1570.0, 400.0], [far, 1760.0, 400.0]),
            // Box back
            face([near, 1760.0, 0.0], [near, 1570.0, 0.0], [far, 1570.0, 0.0], [far, 1570.0, 400.0]),
            // Box sides
            face([near, 1760.0, 400.0], [near, 1760.0, 0.0], [near, 1570.0, 0.0], [near, 1570.0, 400.0]),
            face([far, 1760.0, 400.0], [far, 1760.0, 0.0], [far, 1570.0, 0.0], [far, 1570.0, 400.0]),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Tapered slats every 150 units along the slope
    pub fn slat_vertices(&self) -> Vec<[f32; 3]> {
        const MIN_Y: f32 = -1560.0;
        const MAX_Y: f32 = 1560.0;
        const STEP: f32 = 150.0;
        const HIGH_Z: f32 = 2100.0;
        const LOW_Z: f32 = 405.0;
        const SLAT_HEIGHT: f32 = 100.0;
        const TAPER: f32 = 0.3;

        let near_x = base_x(self.scale) + RAMP_HALF_WIDTH;
        let far_x = base_x(self.scale) - RAMP_HALF_WIDTH;
        let taper = (far_x - near_x).abs() * TAPER / 2.0;
        let inward = if far_x > near_x { 1.0 } else { -1.0 };

        let mut vertices = Vec::new();
        let mut y = MIN_Y;
        while y <= MAX_Y {
            let t = (y - MIN_Y) / (MAX_Y - MIN_Y);
            let z = HIGH_Z + t * (LOW_Z - HIGH_Z);

            let near = [near_x, y, z];
            let far = [far_x, y, z];
            let top_near = [near_x + inward * taper, y, z + SLAT_HEIGHT];
            let top_far = [far_x - inward * taper, y, z + SLAT_HEIGHT];

            vertices.extend([near, far, top_near, far, top_far, top_near]);
            y += STEP;
        }
        vertices
    }
}

impl StageBuilder for Ramp {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let body = stage.spawn_mesh(
            triangle_mesh(self.body_vertices()),
            translucent(hex_color(RAMP_COLOR), 0.8),
            Transform::IDENTITY,
        );
        let slats = stage.spawn_mesh(
            triangle_mesh(self.slat_vertices()),
            translucent(hex_color(RAMP_GRID_COLOR), 0.3),
            Transform::IDENTITY,
        );
        vec![body, slats]
    }

    fn owned(&self) -> &[SceneNode] {
        &self.nodes
    }

    fn owned_mut(&mut self) -> &mut Vec<SceneNode> {
        &mut self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::*;
    use crate::stage::SCALE;

    #[derive(Resource)]
    struct Held(Arrow, Ramp);

    #[test]
    fn test_arrow_tip_is_symmetric() {
        let (start, end, [a, b]) = Arrow::new(SCALE).geometry();
        assert_eq!(start.x, -3764.0);
        assert_eq!(end.x, -1000.0);
        assert!((a.distance(end) - b.distance(end)).abs() < 1e-3);
        assert!((a.x - (end.x - TIP_LENGTH)).abs() < 1e-3);
        assert!((a.z - b.z).abs() > 300.0);
    }

    #[test]
    fn test_ramp_vertex_counts() {
        let ramp = Ramp::new(SCALE);
        assert_eq!(ramp.body_vertices().len(), 7 * 6);
        // y = -1560, -1410, ..., 1440 gives 21 slats
        assert_eq!(ramp.slat_vertices().len(), 21 * 6);
    }

    #[test]
    fn test_arrow_group_disposes_children() {
        let mut world = stage_world();
        world.insert_resource(Held(Arrow::new(SCALE), Ramp::new(SCALE)));

        with_stage::<Held, _, _>(&mut world, |held, stage| {
            held.0.add_to_scene(stage);
            held.1.add_to_scene(stage);
        });
        assert_eq!(world.resource::<Held>().0.owned()[1].children().len(), 3);
        assert_eq!(
            retained(&mut world),
            Retained {
                entities: 7,
                meshes: 6,
                materials: 6,
                images: 0
            }
        );

        with_stage::<Held, _, _>(&mut world, |held, stage| {
            held.0.remove_from_scene(stage);
            held.1.remove_from_scene(stage);
        });
        assert_eq!(retained(&mut world), Retained::NONE);
    }
}
