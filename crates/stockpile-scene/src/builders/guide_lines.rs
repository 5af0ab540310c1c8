//! Distance guide lines with clickable labels

use bevy::prelude::*;
use std::collections::HashMap;

use super::label::spawn_label;
use crate::stage::{hex_color, polyline_mesh, SceneNode, Stage, StageBuilder};

pub const LINE_COUNT: usize = 23;
pub const LINE_SPACING: f32 = 500.0;
const ORIGIN_X: f32 = 1882.0;

const ACCENT_COLOR: u32 = 0xffffff;
const NEUTRAL_COLOR: u32 = 0xa1a1a1;
const SELECTED_COLOR: u32 = 0xff0000;

/// Which line a label belongs to and where it sits along x
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelInfo {
    pub line: usize,
    pub x: f32,
}

struct Line {
    node_index: usize,
    base_color: Color,
}

#[derive(Default)]
pub struct GuideLines {
    nodes: Vec<SceneNode>,
    lines: Vec<Line>,
    labels: HashMap<Entity, LabelInfo>,
    selected: Option<usize>,
}

/// x of guide line `i`
pub fn line_x(i: usize) -> f32 {
    ORIGIN_X - LINE_SPACING * i as f32
}

impl GuideLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&self, entity: Entity) -> Option<LabelInfo> {
        self.labels.get(&entity).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = (Entity, LabelInfo)> + '_ {
        self.labels.iter().map(|(e, info)| (*e, *info))
    }

    pub fn selected_line(&self) -> Option<usize> {
        self.selected
    }

    /// Highlight the line owning `label`, restoring the previous one.
    ///
    /// Returns false if `label` is not one of ours.
    pub fn select_line(&mut self, stage: &mut Stage, label: Entity) -> bool {
        let Some(info) = self.label(label) else {
            return false;
        };

        if let Some(previous) = self.selected.filter(|p| *p != info.line) {
            let line = &self.lines[previous];
            stage.set_color(&self.nodes[line.node_index], line.base_color);
        }

        let line = &self.lines[info.line];
        stage.set_color(&self.nodes[line.node_index], hex_color(SELECTED_COLOR));
        self.selected = Some(info.line);
        true
    }

    fn add_label(&mut self, stage: &mut Stage, text: &str, position: Vec3, line: usize) -> SceneNode {
        let node = spawn_label(stage, text, position);
        self.labels.insert(node.entity, LabelInfo { line, x: position.x });
        node
    }
}

impl StageBuilder for GuideLines {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let mut created = Vec::new();

        for i in 0..LINE_COUNT {
            let x = line_x(i);
            let base_color = hex_color(if i % 4 == 0 { ACCENT_COLOR } else { NEUTRAL_COLOR });
            let profile = [
                Vec3::new(x, -1960.0, 2100.0),
                Vec3::new(x, -1560.0, 2100.0),
                Vec3::new(x, -1560.0, 0.0),
                Vec3::new(x, 1560.0, 280.0),
                Vec3::new(x, 1560.0, -400.0),
            ];

            self.lines.push(Line {
                node_index: self.nodes.len() + created.len(),
                base_color,
            });
            created.push(stage.spawn_mesh(
                polyline_mesh(&profile),
                StandardMaterial {
                    base_color,
                    unlit: true,
                    ..default()
                },
                Transform::IDENTITY,
            ));

            if i % 2 == 0 {
                let row = (26 - i as i32).to_string();
                let distance = (i * 5).to_string();
                created.push(self.add_label(stage, &row, Vec3::new(x, -1960.0, 2500.0), i));
                created.push(self.add_label(stage, &distance, Vec3::new(x, 1600.0, -600.0), i));
            }
        }

        created
    }

    fn owned(&self) -> &[SceneNode] {
        &self.nodes
    }

    fn owned_mut(&mut self) -> &mut Vec<SceneNode> {
        &mut self.nodes
    }

    fn reset(&mut self) {
        self.lines.clear();
        self.labels.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::label::LabelText;
    use crate::stage::testing::*;

    #[derive(Resource, Default)]
    struct Held(GuideLines);

    fn labels_for(lines: &GuideLines, line: usize) -> Vec<Entity> {
        let mut found: Vec<(Entity, LabelInfo)> = lines.labels().filter(|(_, i)| i.line == line).collect();
        found.sort_by_key(|(e, _)| *e);
        found.into_iter().map(|(e, _)| e).collect()
    }

    fn line_color(world: &World, line: usize) -> Color {
        let lines = &world.resource::<Held>().0;
        let node = &lines.nodes[lines.lines[line].node_index];
        material_color(world, node).unwrap()
    }

    #[test]
    fn test_creates_lines_and_labels() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));

        let held = world.resource::<Held>();
        // 23 lines plus two labels on each of the 12 even lines
        assert_eq!(held.0.owned().len(), LINE_COUNT + 24);
        assert_eq!(held.0.labels().count(), 24);
        assert_eq!(labels_for(&held.0, 4).len(), 2);
        assert!(labels_for(&held.0, 3).is_empty());
        assert_eq!(line_x(2), 882.0);
    }

    #[test]
    fn test_labels_show_row_and_distance() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));

        let anchors = labels_for(&world.resource::<Held>().0, 4);
        let mut texts: Vec<String> = world
            .query::<(&Text, &LabelText)>()
            .iter(&world)
            .filter(|(_, label)| anchors.contains(&label.anchor))
            .map(|(text, _)| text.0.clone())
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["20".to_string(), "22".to_string()]);
    }

    #[test]
    fn test_accent_every_fourth_line() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));

        assert_eq!(line_color(&world, 0), hex_color(ACCENT_COLOR));
        assert_eq!(line_color(&world, 4), hex_color(ACCENT_COLOR));
        assert_eq!(line_color(&world, 1), hex_color(NEUTRAL_COLOR));
        assert_eq!(line_color(&world, 6), hex_color(NEUTRAL_COLOR));
    }

    #[test]
    fn test_select_line_highlights_one_at_a_time() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));

        let first = labels_for(&world.resource::<Held>().0, 2)[0];
        let second = labels_for(&world.resource::<Held>().0, 4)[1];

        assert!(with_stage::<Held, _, _>(&mut world, move |held, stage| held.0.select_line(stage, first)));
        assert_eq!(line_color(&world, 2), hex_color(SELECTED_COLOR));

        with_stage::<Held, _, _>(&mut world, move |held, stage| held.0.select_line(stage, second));
        assert_eq!(line_color(&world, 2), hex_color(NEUTRAL_COLOR));
        assert_eq!(line_color(&world, 4), hex_color(SELECTED_COLOR));
        assert_eq!(world.resource::<Held>().0.selected_line(), Some(4));

        let highlighted = (0..LINE_COUNT)
            .filter(|&i| line_color(&world, i) == hex_color(SELECTED_COLOR))
            .count();
        assert_eq!(highlighted, 1);
    }

    #[test]
    fn test_select_unknown_label() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));

        let stranger = world.spawn_empty().id();
        assert!(!with_stage::<Held, _, _>(&mut world, move |held, stage| held.0.select_line(stage, stranger)));
        assert_eq!(world.resource::<Held>().0.selected_line(), None);
    }

    #[test]
    fn test_remove_releases_everything() {
        let mut world = stage_world();
        world.init_resource::<Held>();
        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.add_to_scene(stage));
        // Every label brings a text overlay entity
        assert_eq!(retained(&mut world).entities, LINE_COUNT + 24 * 2);

        with_stage::<Held, _, _>(&mut world, |held, stage| held.0.remove_from_scene(stage));
        assert_eq!(retained(&mut world), Retained::NONE);
        assert_eq!(world.resource::<Held>().0.labels().count(), 0);
    }
}
