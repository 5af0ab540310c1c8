//! Messages into and out of the scene

use bevy::prelude::*;
use stockpile_core::{SceneObjectDocument, SurveyPayload};

/// A freshly fetched snapshot to display
#[derive(Message, Debug, Clone)]
pub struct LoadSnapshot {
    pub id: String,
    pub payload: SurveyPayload,
    pub surface: SceneObjectDocument,
}

/// Request to show (or clear) the section overlay for column x
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SelectSection(pub Option<f64>);

/// Emitted when a click on the surface picks a section
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct SectionSelected(pub Option<f64>);
