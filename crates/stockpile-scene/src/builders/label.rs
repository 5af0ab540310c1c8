//! Guide-line label badges
//!
//! A label is a translucent badge in the world plus a UI text node that
//! [`place_label_text`] pins over the badge's projected screen position.
//! The text node is owned by the badge's [`SceneNode`], so disposing the
//! badge takes the text with it.

use bevy::prelude::*;

use crate::camera::MainCamera;
use crate::stage::{hex_color, translucent, SceneNode, Stage};

/// World size of the pickable label area
const LABEL_SIZE: Vec2 = Vec2::new(500.0, 250.0);
const LABEL_OPACITY: f32 = 0.4;

const BADGE_RADIUS: f32 = 117.0;
const BADGE_COLOR: u32 = 0x343a3a;
const TEXT_COLOR: u32 = 0xaaacad;
const FONT_SIZE: f32 = 18.0;

/// Camera-facing label badge
#[derive(Component, Debug, Clone, Copy)]
pub struct LabelSprite {
    pub half_size: Vec2,
}

/// Screen-space text that follows a [`LabelSprite`]
#[derive(Component, Debug, Clone, Copy)]
pub struct LabelText {
    pub anchor: Entity,
}

/// Spawn a badge at `position` with `text` drawn over it
pub fn spawn_label(stage: &mut Stage, text: &str, position: Vec3) -> SceneNode {
    let mut badge = stage.spawn_mesh(
        Circle::new(BADGE_RADIUS).into(),
        translucent(hex_color(BADGE_COLOR), LABEL_OPACITY),
        Transform::from_translation(position),
    );
    stage.commands.entity(badge.entity).insert(LabelSprite {
        half_size: LABEL_SIZE / 2.0,
    });

    let overlay = stage.spawn_overlay((
        Text::new(text),
        TextFont {
            font_size: FONT_SIZE,
            ..default()
        },
        TextColor(hex_color(TEXT_COLOR)),
        Node {
            position_type: PositionType::Absolute,
            ..default()
        },
        Visibility::Hidden,
        LabelText { anchor: badge.entity },
    ));
    badge.adopt(overlay);
    badge
}

/// Top-left corner that centers a box of `size` on `anchor`
pub fn centered_corner(anchor: Vec2, size: Vec2) -> Vec2 {
    anchor - size / 2.0
}

/// Move label text over its badge, hiding it when the badge is off screen
pub(crate) fn place_label_text(
    camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    anchors: Query<&GlobalTransform, With<LabelSprite>>,
    mut texts: Query<(&LabelText, &ComputedNode, &mut Node, &mut Visibility)>,
) {
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };

    for (label, computed, mut node, mut visibility) in texts.iter_mut() {
        let screen = anchors
            .get(label.anchor)
            .ok()
            .and_then(|anchor| camera.world_to_viewport(camera_transform, anchor.translation()).ok());

        match screen {
            Some(position) => {
                let size = computed.size() * computed.inverse_scale_factor();
                let corner = centered_corner(position, size);
                node.left = Val::Px(corner.x);
                node.top = Val::Px(corner.y);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::*;
    use bevy::ecs::system::RunSystemOnce;

    #[derive(Resource, Default)]
    struct Nodes(Vec<SceneNode>);

    fn label_texts(world: &mut World) -> Vec<(String, Entity)> {
        world
            .query::<(&Text, &LabelText)>()
            .iter(world)
            .map(|(text, label)| (text.0.clone(), label.anchor))
            .collect()
    }

    #[test]
    fn test_label_keeps_full_text() {
        let mut world = stage_world();
        world.init_resource::<Nodes>();

        let badge = with_stage::<Nodes, _, _>(&mut world, |nodes, stage| {
            let node = spawn_label(stage, "Row 26 / 12.5 m", Vec3::new(1.0, 2.0, 3.0));
            let badge = node.entity;
            nodes.0.push(node);
            badge
        });

        assert_eq!(label_texts(&mut world), vec![("Row 26 / 12.5 m".to_string(), badge)]);
        assert!(world.get::<LabelSprite>(badge).is_some());
        assert_eq!(world.get::<Transform>(badge).unwrap().translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_dispose_removes_text() {
        let mut world = stage_world();
        world.init_resource::<Nodes>();

        with_stage::<Nodes, _, _>(&mut world, |nodes, stage| {
            nodes.0.push(spawn_label(stage, "20", Vec3::ZERO));
        });
        assert_eq!(
            retained(&mut world),
            Retained {
                entities: 2,
                meshes: 1,
                materials: 1,
                images: 0
            }
        );

        with_stage::<Nodes, _, _>(&mut world, |nodes, stage| {
            for node in nodes.0.drain(..) {
                stage.dispose(node);
            }
        });
        assert_eq!(retained(&mut world), Retained::NONE);
        assert!(label_texts(&mut world).is_empty());
    }

    #[test]
    fn test_text_without_camera_stays_put() {
        let mut world = stage_world();
        world.init_resource::<Nodes>();
        with_stage::<Nodes, _, _>(&mut world, |nodes, stage| {
            nodes.0.push(spawn_label(stage, "4", Vec3::ZERO));
        });

        world.run_system_once(place_label_text).unwrap();

        let mut texts = world.query_filtered::<(&Node, &Visibility), With<LabelText>>();
        let (node, visibility) = texts.single(&world).unwrap();
        assert_eq!(node.left, Val::Auto);
        assert_eq!(*visibility, Visibility::Hidden);
    }

    #[test]
    fn test_centered_corner() {
        let corner = centered_corner(Vec2::new(400.0, 300.0), Vec2::new(40.0, 20.0));
        assert_eq!(corner, Vec2::new(380.0, 290.0));
    }
}
