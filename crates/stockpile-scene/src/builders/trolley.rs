//! Moving trolley that tracks the selected guide line

use bevy::prelude::*;

use crate::stage::{hex_color, quad_mesh, translucent, SceneNode, Stage, StageBuilder};

const TROLLEY_COLOR: u32 = 0x2cd9c5;
pub const TROLLEY_HOME: Vec3 = Vec3::new(0.0, -1760.0, 2200.0);
/// Initial x of the back-wall highlight
const HIGHLIGHT_HOME_X: f32 = 400.0;

/// Exponential approach toward a target coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct Follower {
    pub position: f32,
    pub target: Option<f32>,
    pub speed: f32,
    pub epsilon: f32,
}

impl Follower {
    pub const DEFAULT_SPEED: f32 = 0.009;

    pub fn new(position: f32) -> Self {
        Self {
            position,
            target: None,
            speed: Self::DEFAULT_SPEED,
            epsilon: 1.0,
        }
    }

    /// One frame of motion; lands exactly on the target once within epsilon
    pub fn step(&mut self) -> f32 {
        if let Some(target) = self.target {
            self.position += (target - self.position) * self.speed;
            if (target - self.position).abs() < self.epsilon {
                self.position = target;
                self.target = None;
            }
        }
        self.position
    }
}

pub struct Trolley {
    follower: Follower,
    highlight_x: f32,
    body: Option<Entity>,
    highlight: Option<Entity>,
    nodes: Vec<SceneNode>,
}

impl Trolley {
    pub fn new() -> Self {
        Self {
            follower: Follower::new(TROLLEY_HOME.x),
            highlight_x: HIGHLIGHT_HOME_X,
            body: None,
            highlight: None,
            nodes: Vec::new(),
        }
    }

    pub fn move_to_x(&mut self, target: f32) {
        self.follower.target = Some(target);
    }

    pub fn set_animation_speed(&mut self, speed: f32) {
        self.follower.speed = speed;
    }

    pub fn set_highlight_x(&mut self, x: f32) {
        self.highlight_x = x;
    }

    pub fn update(&mut self) {
        self.follower.step();
    }

    pub fn position_x(&self) -> f32 {
        self.follower.position
    }

    pub fn target_x(&self) -> Option<f32> {
        self.follower.target
    }

    pub fn body_entity(&self) -> Option<Entity> {
        self.body
    }

    pub fn highlight_entity(&self) -> Option<Entity> {
        self.highlight
    }

    pub fn body_translation(&self) -> Vec3 {
        TROLLEY_HOME.with_x(self.follower.position)
    }

    pub fn highlight_translation(&self) -> Vec3 {
        Vec3::new(self.highlight_x, -1800.0, 2105.0)
    }
}

impl Default for Trolley {
    fn default() -> Self {
        Self::new()
    }
}

impl StageBuilder for Trolley {
    fn create(&mut self, stage: &mut Stage) -> Vec<SceneNode> {
        let body = stage.spawn_mesh(
            Cuboid::new(800.0, 400.0, 200.0).into(),
            translucent(hex_color(TROLLEY_COLOR), 0.5),
            Transform::from_translation(self.body_translation()),
        );
        let highlight = stage.spawn_mesh(
            quad_mesh(Vec3::ZERO, Vec3::X * 1000.0, Vec3::Y * 250.0),
            translucent(hex_color(TROLLEY_COLOR), 0.7),
            Transform::from_translation(self.highlight_translation()),
        );
        self.body = Some(body.entity);
        self.highlight = Some(highlight.entity);
        vec![body, highlight]
    }

    fn owned(&self) -> &[SceneNode] {
        &self.nodes
    }

    fn owned_mut(&mut self) -> &mut Vec<SceneNode> {
        &mut self.nodes
    }

    fn reset(&mut self) {
        self.body = None;
        self.highlight = None;
    }
}
