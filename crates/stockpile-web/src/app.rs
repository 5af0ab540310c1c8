//! Application assembly

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use stockpile_scene::scene::BACKGROUND;
use stockpile_scene::StockpileScenePlugin;

use crate::network::{NetworkPlugin, ServerConfig};
use crate::ui::UiPlugin;

/// Run the Bevy application
pub fn run() {
    App::new()
        .insert_resource(ClearColor(BACKGROUND))
        .insert_resource(ServerConfig::from_browser())
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Stockpile Viewer".to_string(),
                        canvas: Some("#stockpile-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: "".to_string(),
                    // Don't look for .meta files - server doesn't have them
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(StockpileScenePlugin)
        .add_plugins(NetworkPlugin)
        .add_plugins(UiPlugin)
        .run();
}
