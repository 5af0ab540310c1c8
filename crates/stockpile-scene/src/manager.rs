//! Scene orchestration
//!
//! [`SceneManager`] owns every builder, the displayed surface and the section
//! overlay. It never reaches for global state: the grid it works against is
//! always handed in by the caller, and everything it spawns goes through a
//! [`Stage`].

use std::time::Duration;

use bevy::asset::RenderAssetUsages;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::prelude::*;
use stockpile_core::{
    nearest_column_x, GridError, MeshDocument, Point, PointGrid, SceneObjectDocument, SurveyPayload,
};

use crate::builders::fog::{DATA_BOUNDARY_X, DEFAULT_PARTICLES, DEFAULT_SEED};
use crate::builders::{Arrow, Enclosure, Fog, Follower, GuideLines, LabelInfo, Ramp, Trolley};
use crate::stage::{polyline_mesh, SceneNode, Stage, StageBuilder, SCALE};

const SECTION_DEPTH_BIAS: f32 = 1_000_000.0;
const SECTION_OPACITY: f32 = 0.5;

/// Tunables for the scene and its feed
#[derive(Resource, Debug, Clone)]
pub struct SceneConfig {
    pub scale: f32,
    pub fog_particles: usize,
    pub fog_seed: u64,
    pub trolley_speed: f32,
    pub poll_interval: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            scale: SCALE,
            fog_particles: DEFAULT_PARTICLES,
            fog_seed: DEFAULT_SEED,
            trolley_speed: Follower::DEFAULT_SPEED,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// The survey currently on screen
#[derive(Resource, Debug, Default)]
pub struct ActiveSurvey {
    pub id: Option<String>,
    pub grid: PointGrid,
    pub avg_disappeared_quality: Option<f64>,
    /// Column x whose section is highlighted
    pub selection: Option<f64>,
}

impl ActiveSurvey {
    /// Take in a snapshot: a present column document replaces the grid, then
    /// the surface samples are applied on top of it.
    ///
    /// Returns how many surface samples were dropped as non-numeric. On a
    /// malformed column document nothing changes.
    pub fn absorb(&mut self, id: &str, payload: &SurveyPayload) -> Result<usize, GridError> {
        if !payload.array.is_null() {
            self.grid = payload.grid()?;
        }
        let (samples, dropped) = payload.surface_samples();
        self.grid.update(samples);
        self.id = Some(id.to_string());
        self.avg_disappeared_quality = payload.avg_disappeared_quality();
        Ok(dropped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOutcome {
    /// No samples; any previous surface was removed
    NoData,
    /// The document was not a mesh; the previous surface stays
    Rejected,
    Displayed,
}

struct Surface {
    node: SceneNode,
    triangles: Vec<[Vec3; 3]>,
}

#[derive(Resource)]
pub struct SceneManager {
    enclosure: Enclosure,
    arrow: Arrow,
    trolley: Trolley,
    ramp: Ramp,
    fog: Fog,
    guide_lines: GuideLines,
    surface: Option<Surface>,
    section: Option<SceneNode>,
    initialized: bool,
}

impl SceneManager {
    pub fn new(config: &SceneConfig) -> Self {
        let mut trolley = Trolley::new();
        trolley.set_animation_speed(config.trolley_speed);

        Self {
            enclosure: Enclosure::new(config.scale),
            arrow: Arrow::new(config.scale),
            trolley,
            ramp: Ramp::new(config.scale),
            fog: Fog::new(config.scale, config.fog_particles, config.fog_seed),
            guide_lines: GuideLines::new(),
            surface: None,
            section: None,
            initialized: false,
        }
    }

    fn builders_mut(&mut self) -> [&mut dyn StageBuilder; 6] {
        [
            &mut self.enclosure,
            &mut self.arrow,
            &mut self.trolley,
            &mut self.ramp,
            &mut self.fog,
            &mut self.guide_lines,
        ]
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn trolley(&self) -> &Trolley {
        &self.trolley
    }

    pub fn fog(&self) -> &Fog {
        &self.fog
    }

    pub fn guide_lines(&self) -> &GuideLines {
        &self.guide_lines
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// World-space triangles of the displayed surface
    pub fn surface_triangles(&self) -> &[[Vec3; 3]] {
        self.surface.as_ref().map(|s| s.triangles.as_slice()).unwrap_or(&[])
    }

    pub fn section_overlay(&self) -> Option<&SceneNode> {
        self.section.as_ref()
    }

    /// Put every builder on stage. Repeated calls do nothing.
    pub fn initialize_scene(&mut self, stage: &mut Stage) {
        if self.initialized {
            return;
        }
        for builder in self.builders_mut() {
            builder.add_to_scene(stage);
        }
        self.initialized = true;
        tracing::debug!("Scene initialized");
    }

    pub fn update_surface(
        &mut self,
        stage: &mut Stage,
        samples: &[Point],
        document: SceneObjectDocument,
    ) -> SurfaceOutcome {
        if samples.is_empty() {
            self.clear_surface(stage);
            self.fog.set_visible(stage, true);
            return SurfaceOutcome::NoData;
        }

        // Fog follows the samples, not the document: a rejected surface
        // still uncovers the region its samples reach
        let data_in_fog = samples.iter().any(|p| p.x < DATA_BOUNDARY_X as f64);
        self.fog.set_visible(stage, !data_in_fog);

        let mesh = match document.into_mesh() {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::warn!("Surface not displayed: {}", e);
                return SurfaceOutcome::Rejected;
            }
        };

        self.clear_surface(stage);
        let triangles = mesh
            .triangles()
            .into_iter()
            .map(|t| t.map(Vec3::from_array))
            .collect();
        let node = stage.spawn_mesh(
            surface_mesh(&mesh),
            StandardMaterial {
                base_color: Color::WHITE,
                double_sided: true,
                cull_mode: None,
                perceptual_roughness: 0.9,
                ..default()
            },
            Transform::IDENTITY,
        );
        tracing::debug!("Displaying surface {:?} ({} triangles)", mesh.name, mesh.triangle_count());
        self.surface = Some(Surface { node, triangles });
        SurfaceOutcome::Displayed
    }

    fn clear_surface(&mut self, stage: &mut Stage) {
        if let Some(surface) = self.surface.take() {
            stage.dispose(surface.node);
        }
    }

    /// Replace the section overlay with the top profile of column `selection`
    pub fn update_section_lines(&mut self, stage: &mut Stage, grid: &PointGrid, selection: Option<f64>) {
        if let Some(previous) = self.section.take() {
            stage.dispose(previous);
        }
        let Some(x) = selection else {
            return;
        };

        let mut profile: Vec<Point> = grid.top().into_iter().filter(|p| p.x == x).collect();
        if profile.len() < 2 {
            return;
        }
        profile.sort_by(|a, b| a.y.total_cmp(&b.y));

        let vertices: Vec<Vec3> = profile
            .iter()
            .map(|p| Vec3::new(p.x as f32, p.y as f32, p.z as f32))
            .collect();
        let line = stage.spawn_mesh(
            polyline_mesh(&vertices),
            StandardMaterial {
                base_color: Color::WHITE.with_alpha(SECTION_OPACITY),
                unlit: true,
                alpha_mode: AlphaMode::Blend,
                depth_bias: SECTION_DEPTH_BIAS,
                ..default()
            },
            Transform::IDENTITY,
        );
        self.section = Some(stage.spawn_group(Transform::IDENTITY, vec![line]));
    }

    /// Move the trolley to a guide-line label and highlight its line
    pub fn handle_sprite_click(&mut self, stage: &mut Stage, label: Entity) -> bool {
        let Some(LabelInfo { x, .. }) = self.guide_lines.label(label) else {
            return false;
        };
        if self.trolley.is_on_stage() {
            self.trolley.move_to_x(x);
        }
        self.guide_lines.select_line(stage, label)
    }

    /// Resolve a surface hit to the nearest column x
    pub fn handle_mesh_click(&self, grid: &PointGrid, world_x: f64, on_select: impl FnOnce(f64)) {
        if let Some(x) = nearest_column_x(&grid.top(), world_x) {
            on_select(x);
        }
    }

    /// Advance animations by one frame
    pub fn update(&mut self, now_ms: f64) {
        self.trolley.update();
        self.fog.update(now_ms);
    }

    /// Take everything off stage: builders, then the surface, then the overlay
    pub fn dispose(&mut self, stage: &mut Stage) {
        for builder in self.builders_mut() {
            builder.remove_from_scene(stage);
        }
        self.clear_surface(stage);
        if let Some(section) = self.section.take() {
            stage.dispose(section);
        }
        self.initialized = false;
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}

/// Vertex-colored triangle list for a surface document
pub fn surface_mesh(document: &MeshDocument) -> Mesh {
    let (positions, colors) = document.expanded();
    let colors: Vec<[f32; 4]> = match colors {
        Some(colors) => colors
            .into_iter()
            .map(|[r, g, b]| {
                let linear = Color::srgb(r, g, b).to_linear();
                [linear.red, linear.green, linear.blue, 1.0]
            })
            .collect(),
        None => vec![[1.0; 4]; positions.len()],
    };

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
        .with_computed_flat_normals()
}
