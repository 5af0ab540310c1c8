//! Volumetric fog over the part of the stage no survey reaches
//!
//! Particles live on the CPU in [`FogField`]; every frame they are written out
//! as camera-facing quads into a single additive mesh.

use bevy::asset::RenderAssetUsages;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stage::{SceneNode, Stage, StageBuilder};

pub const DEFAULT_PARTICLES: usize = 20_000;
pub const DEFAULT_SEED: u64 = 0x5eed_f09;

/// x of the data boundary; fog fills everything beyond it
pub const DATA_BOUNDARY_X: f32 = -2000.0;
const MIN_Y: f32 = -1560.0;
const MAX_Y: f32 = 1560.0;
const FLOOR_Z: f32 = 100.0;
const CEILING_Z: f32 = 3000.0;

/// Converts a particle size into a world-space quad width at typical viewing distance
const SIZE_TO_WORLD: f32 = 0.77;
const OPACITY: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParticle {
    pub position: Vec3,
    pub base_size: f32,
    pub size: f32,
    pub color: [f32; 3],
}

/// Region bounds for a given stage scale
#[derive(Debug, Clone, Copy)]
pub struct FogRegion {
    pub min: Vec3,
    pub max: Vec3,
}

impl FogRegion {
    pub fn for_scale(scale: f32) -> Self {
        Self {
            min: Vec3::new(3764.0 * scale, MIN_Y, FLOOR_Z),
            max: Vec3::new(DATA_BOUNDARY_X, MAX_Y, CEILING_Z),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }
}

#[derive(Debug, Clone)]
pub struct FogField {
    region: FogRegion,
    particles: Vec<FogParticle>,
}

impl FogField {
    pub fn new(scale: f32, count: usize, seed: u64) -> Self {
        let region = FogRegion::for_scale(scale);
        let mut rng = StdRng::seed_from_u64(seed);
        let width = region.width();
        let height = region.max.z - region.min.z;

        let particles = (0..count)
            .map(|_| {
                // Distance from the data boundary, biased outward
                let distance: f32 = rng.gen::<f32>().powf(0.7);
                // Closeness to the floor, biased downward
                let floor: f32 = rng.gen::<f32>().powf(0.25);

                let x = region.max.x - distance * width;
                let y = rng.gen_range(region.min.y..=region.max.y);
                let z = region.min.z + (1.0 - floor) * height;

                let density = distance * distance;
                let base_size = 18.0 + density * 18.0 + floor * 10.0;
                let intensity = 0.6 + density * 0.8 + floor * 0.3;

                FogParticle {
                    position: Vec3::new(x, y, z),
                    base_size,
                    size: base_size,
                    color: [0.2 + intensity * 0.4, 0.2 + intensity * 0.4, 0.25 + intensity * 0.5],
                }
            })
            .collect();

        Self { region, particles }
    }

    pub fn region(&self) -> FogRegion {
        self.region
    }

    pub fn particles(&self) -> &[FogParticle] {
        &self.particles
    }

    /// Slow drift in y and z plus a slight size pulse
    pub fn update(&mut self, now_ms: f64) {
        let now = now_ms as f32;
        for (index, particle) in self.particles.iter_mut().enumerate() {
            let k = (index * 3) as f32;
            particle.position.y += (now * 0.0002 + k * 0.001).sin() * 0.1;
            particle.position.z += (now * 0.0001 + k * 0.0008).cos() * 0.05;
            particle.size = particle.base_size * (1.0 + 0.02 * (now * 0.0003 + k * 0.002).sin());
        }
    }

    /// Two triangles per particle spanning `right` and `up`
    pub fn write_quads(&self, right: Vec3, up: Vec3) -> (Vec<[f32; 3]>, Vec<[f32; 4]>) {
        let mut positions = Vec::with_capacity(self.particles.len() * 6);
        let mut colors = Vec::with_capacity(self.particles.len() * 6);

        for particle in &self.particles {
            let half = particle.size * SIZE_TO_WORLD / 2.0;
            let (r, u) = (right * half, up * half);
            let c = particle.position;
            let corners = [c - r - u, c + r - u, c + r + u, c - r + u];
            for i in [0, 1, 2, 0, 2, 3] {
                positions.push(corners[i].to_array());
            }
            let [red, green, blue] = particle.color;
            colors.extend([[red, green, blue, OPACITY]; 6]);
        }

        (positions, colors)
    }
}

pub fn fog_mesh(positions: Vec<[f32; 3]>, colors: Vec<[f32; 4]>) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

pub struct Fog {
    field: FogField,
    visible: bool,
    nodes: Vec<SceneNode>,
}

impl Fog {
    pub fn new(scale: f32, count: usize, seed: u64) -> Self {
        Self {
            field: FogField::new(scale, count, seed),
            visible: true,
            nodes: Vec::new(),
        }
    }

    pub fn field(&self) -> &FogField {
        &self.field
    }

    pub fn update(&mut self, now_ms: f64) {
        self.field.update(now_ms);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, stage: &mut Stage, visible: bool) {
        self.visible = visible;
        if let Some(node) = self.nodes.first() {
            stage.set_visible(node, visible);
        }
    }

    /// Mesh the per-frame quads are written into
    pub fn mesh(&self) -> Option<&Handle<Mesh>> {
        self.nodes.first().and_then(|n| n.mesh())
    }
}

impl StageBuilder for Fog {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let (positions, colors) = self.field.write_quads(Vec3::X, Vec3::Y);
        let node = stage.spawn_mesh(
            fog_mesh(positions, colors),
            StandardMaterial {
                base_color: Color::WHITE,
                unlit: true,
                alpha_mode: AlphaMode::Add,
                double_sided: true,
                cull_mode: None,
                ..default()
            },
            Transform::IDENTITY,
        );
        if !self.visible {
            stage.set_visible(&node, false);
        }
        vec![node]
    }

    fn owned(&self) -> &[SceneNode] {
        &self.nodes
    }

    fn owned_mut(&mut self) -> &mut Vec<SceneNode> {
        &mut self.nodes
    }
}
