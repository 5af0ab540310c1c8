//! Static stage: floor, walls and the floor ramp

use bevy::prelude::*;

use crate::stage::{hex_color, indexed_mesh, quad_mesh, translucent, triangle_mesh, SceneNode, Stage, StageBuilder};

const STAGE_LENGTH: f32 = 3764.0;
const FLOOR_COLOR: u32 = 0xcccccc;
const WALL_COLOR: u32 = 0xccccff;

pub struct Enclosure {
    scale: f32,
    nodes: Vec<SceneNode>,
}

impl Enclosure {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            nodes: Vec::new(),
        }
    }

    /// Center of the stage along x
    pub fn base_x(&self) -> f32 {
        (STAGE_LENGTH * self.scale + STAGE_LENGTH) / 2.0
    }

    /// Full stage length along x
    pub fn width(&self) -> f32 {
        (STAGE_LENGTH * self.scale).abs()
    }

    fn floor(&self) -> Mesh {
        quad_mesh(
            Vec3::new(self.base_x(), -1560.0, 1050.0),
            Vec3::X * self.width() / 2.0,
            Vec3::Z * 1050.0,
        )
    }

    fn main_wall(&self) -> Mesh {
        let far_x = -1870.0 * -(self.scale - 2.0);
        triangle_mesh(vec![
            [far_x, -1560.0, 0.0],
            [1882.0, -1560.0, 0.0],
            [far_x, 1560.0, 280.0],
            [1882.0, -1560.0, 0.0],
            [1882.0, 1560.0, 280.0],
            [far_x, 1560.0, 280.0],
        ])
    }

    fn left_wall(&self) -> Mesh {
        let x = -1870.0 * -(self.scale - 3.0);
        indexed_mesh(
            &[
                [x, -1560.0, -1050.0],
                [x, -1560.0, 1050.0],
                [x, 1560.0, -770.0],
                [x, 1560.0, 1050.0],
            ],
            &[0, 1, 2, 2, 1, 3],
        )
    }

    fn back_wall(&self) -> Mesh {
        quad_mesh(
            Vec3::new(self.base_x(), -1760.0, 2100.0),
            Vec3::X * self.width() / 2.0,
            Vec3::Y * 200.0,
        )
    }

    fn floor_ramp(&self) -> Mesh {
        quad_mesh(
            Vec3::new(self.base_x(), 1560.0, -60.0),
            Vec3::X * self.width() / 2.0,
            Vec3::Z * 340.0,
        )
    }
}

impl StageBuilder for Enclosure {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let floor = hex_color(FLOOR_COLOR);
        let wall = hex_color(WALL_COLOR);

        vec![
            stage.spawn_mesh(self.floor(), translucent(floor, 0.3), Transform::IDENTITY),
            stage.spawn_mesh(self.main_wall(), translucent(wall, 0.2), Transform::IDENTITY),
            stage.spawn_mesh(
                self.left_wall(),
                translucent(wall, 0.2),
                Transform::from_xyz(1882.0, 0.0, 1050.0),
            ),
            stage.spawn_mesh(self.back_wall(), translucent(wall, 0.2), Transform::IDENTITY),
            stage.spawn_mesh(self.floor_ramp(), translucent(floor, 0.3), Transform::IDENTITY),
        ]
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
    struct Held(Enclosure);

    #[test]
    fn test_stage_dimensions_follow_scale() {
        let enclosure = Enclosure::new(SCALE);
        assert_eq!(enclosure.base_x(), -3764.0);
        assert_eq!(enclosure.width(), 11292.0);
    }

    #[test]
    fn test_add_and_remove() {
        let mut world = stage_world();
        world.insert_resource(Held(Enclosure::new(SCALE)));

        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));
        assert_eq!(
            retained(&mut world),
            Retained {
                entities: 5,
                meshes: 5,
                materials: 5,
                images: 0
            }
        );

        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.remove_from_scene(stage));
        assert_eq!(retained(&mut world), Retained::NONE);
        assert!(!world.resource::<Held>().0.is_on_stage());
    }
}
