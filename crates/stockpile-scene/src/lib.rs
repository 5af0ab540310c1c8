//! Stockpile Scene - 3D stage, surface display and picking
//!
//! Builds the static stage around a stockpile, swaps in the reconstructed
//! surface for each snapshot, and turns clicks into section selections.
//! The web viewer adds networking and UI on top of [`StockpileScenePlugin`].

pub mod builders;
pub mod camera;
pub mod manager;
pub mod messages;
pub mod picking;
pub mod scene;
pub mod stage;

use bevy::prelude::*;

/// Plugin that sets up the stage, camera and click handling
pub struct StockpileScenePlugin;

impl Plugin for StockpileScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(camera::CameraPlugin)
            .add_plugins(scene::ScenePlugin)
            .add_plugins(picking::SelectionPlugin);
    }
}

// Re-export commonly used types
pub use camera::{FlightSettings, MainCamera, PointerCapture};
pub use manager::{ActiveSurvey, SceneConfig, SceneManager, SurfaceOutcome};
pub use messages::{LoadSnapshot, SectionSelected, SelectSection};
pub use stage::{Stage, StageBuilder, SCALE};
