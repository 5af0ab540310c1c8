//! Stage primitives and their ownership
//!
//! Every renderable a builder creates is tracked as a [`SceneNode`]: the
//! spawned entity plus the mesh and material assets only it uses. Disposing
//! a node walks its children first, releases the assets, and only then
//! despawns the entity.

use bevy::asset::RenderAssetUsages;
use bevy::ecs::system::SystemParam;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::prelude::*;

/// Global scene scale; stage lengths along x are multiples of it
pub const SCALE: f32 = -3.0;

/// Marker for every entity spawned through [`Stage`]
#[derive(Component)]
pub struct StagePrimitive;

/// Everything a builder needs to put primitives on stage or take them off
#[derive(SystemParam)]
pub struct Stage<'w, 's> {
    pub commands: Commands<'w, 's>,
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
}

/// One owned primitive and the primitives nested under it
#[derive(Debug)]
pub struct SceneNode {
    pub entity: Entity,
    mesh: Option<Handle<Mesh>>,
    material: Option<Handle<StandardMaterial>>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn mesh(&self) -> Option<&Handle<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn material(&self) -> Option<&Handle<StandardMaterial>> {
        self.material.as_ref()
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Take ownership of `child` without parenting its entity
    pub fn adopt(&mut self, child: SceneNode) {
        self.children.push(child);
    }
}

impl Stage<'_, '_> {
    pub fn spawn_mesh(
        &mut self,
        mesh: Mesh,
        material: StandardMaterial,
        transform: Transform,
    ) -> SceneNode {
        let mesh = self.meshes.add(mesh);
        let material = self.materials.add(material);
        let entity = self
            .commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                transform,
                StagePrimitive,
            ))
            .id();

        SceneNode {
            entity,
            mesh: Some(mesh),
            material: Some(material),
            children: Vec::new(),
        }
    }

    /// Spawn an asset-free primitive such as a UI text node
    pub fn spawn_overlay(&mut self, bundle: impl Bundle) -> SceneNode {
        let entity = self.commands.spawn((bundle, StagePrimitive)).id();
        SceneNode {
            entity,
            mesh: None,
            material: None,
            children: Vec::new(),
        }
    }

    /// Spawn an empty parent that owns `children`
    pub fn spawn_group(&mut self, transform: Transform, children: Vec<SceneNode>) -> SceneNode {
        let child_entities: Vec<Entity> = children.iter().map(|c| c.entity).collect();
        let entity = self
            .commands
            .spawn((transform, Visibility::default(), StagePrimitive))
            .add_children(&child_entities)
            .id();

        SceneNode {
            entity,
            mesh: None,
            material: None,
            children,
        }
    }

    pub fn set_visible(&mut self, node: &SceneNode, visible: bool) {
        let visibility = if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        self.commands.entity(node.entity).insert(visibility);
    }

    /// Recolor a node's material in place, keeping its opacity
    pub fn set_color(&mut self, node: &SceneNode, color: Color) {
        let Some(handle) = node.material.as_ref() else {
            return;
        };
        if let Some(material) = self.materials.get_mut(handle) {
            let alpha = material.base_color.alpha();
            material.base_color = color.with_alpha(alpha);
        }
    }

    /// Release a node tree: children first, assets before entities
    pub fn dispose(&mut self, node: SceneNode) {
        let SceneNode {
            entity,
            mesh,
            material,
            children,
        } = node;

        for child in children {
            self.dispose(child);
        }

        if let Some(mesh) = mesh {
            self.meshes.remove(&mesh);
        }
        if let Some(material) = material {
            self.materials.remove(&material);
        }

        self.commands.entity(entity).despawn();
    }
}

/// Common contract for everything that puts static or animated geometry on stage
pub trait StageBuilder {
    /// Build this builder's primitives
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode>;

    fn owned(&self) -> &[SceneNode];

    fn owned_mut(&mut self) -> &mut Vec<SceneNode>;

    /// Drop per-instance bookkeeping after the primitives are gone
    fn reset(&mut self) {}

    fn is_on_stage(&self) -> bool {
        !self.owned().is_empty()
    }

    fn add_to_scene(&mut self, stage: &mut Stage) {
        let nodes = self.create(stage);
        self.owned_mut().extend(nodes);
    }

    fn remove_from_scene(&mut self, stage: &mut Stage) {
        let nodes = std::mem::take(self.owned_mut());
        for node in nodes {
            stage.dispose(node);
        }
        self.reset();
    }
}

/// sRGB color from a `0xRRGGBB` literal
pub fn hex_color(hex: u32) -> Color {
    Color::srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// Unlit, double-sided, alpha-blended material
pub fn translucent(color: Color, opacity: f32) -> StandardMaterial {
    StandardMaterial {
        base_color: color.with_alpha(opacity),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

/// Plain triangle list with flat normals
pub fn triangle_mesh(positions: Vec<[f32; 3]>) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_computed_flat_normals()
}

/// Indexed vertices flattened into a triangle list
pub fn indexed_mesh(vertices: &[[f32; 3]], indices: &[u32]) -> Mesh {
    triangle_mesh(indices.iter().map(|&i| vertices[i as usize]).collect())
}

/// Rectangle centered on `center` spanning `±u` and `±v`
pub fn quad_mesh(center: Vec3, u: Vec3, v: Vec3) -> Mesh {
    let corners = [
        center - u - v,
        center + u - v,
        center + u + v,
        center - u + v,
    ]
    .map(|c| c.to_array());
    indexed_mesh(&corners, &[0, 1, 2, 0, 2, 3])
}

pub fn polyline_mesh(points: &[Vec3]) -> Mesh {
    let positions: Vec<[f32; 3]> = points.iter().map(|p| p.to_array()).collect();
    Mesh::new(PrimitiveTopology::LineStrip, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
}
