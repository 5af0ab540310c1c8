//! Scene setup and per-frame systems

use bevy::prelude::*;
use tracing::{debug, info, warn};

use crate::builders::label::place_label_text;
use crate::builders::LabelSprite;
use crate::camera::MainCamera;
use crate::manager::{ActiveSurvey, SceneConfig, SceneManager, SurfaceOutcome};
use crate::messages::{LoadSnapshot, SectionSelected, SelectSection};
use crate::stage::Stage;

/// Background behind the stage
pub const BACKGROUND: Color = Color::srgb(0.125, 0.145, 0.157);

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<SceneConfig>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(SceneManager::new(&config))
            .insert_resource(config)
            .init_resource::<ActiveSurvey>()
            .add_message::<LoadSnapshot>()
            .add_message::<SelectSection>()
            .add_message::<SectionSelected>()
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (
                    apply_snapshot_loads,
                    apply_section_selection,
                    advance_animation,
                    sync_trolley,
                    sync_fog,
                    face_labels_to_camera,
                    place_label_text,
                )
                    .chain(),
            );
    }
}

fn setup_scene(mut stage: Stage, mut manager: ResMut<SceneManager>) {
    stage.commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    stage.commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(2.5, 2.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    manager.initialize_scene(&mut stage);
    info!("Scene ready");
}

pub(crate) fn apply_snapshot_loads(
    mut loads: MessageReader<LoadSnapshot>,
    mut survey: ResMut<ActiveSurvey>,
    mut manager: ResMut<SceneManager>,
    mut stage: Stage,
) {
    for load in loads.read() {
        match survey.absorb(&load.id, &load.payload) {
            Ok(0) => {}
            Ok(dropped) => warn!("{}: dropped {} invalid surface sample(s)", load.id, dropped),
            Err(e) => {
                warn!("{}: {}", load.id, e);
                continue;
            }
        }

        let top = survey.grid.top();
        match manager.update_surface(&mut stage, &top, load.surface.clone()) {
            SurfaceOutcome::Displayed => debug!("{}: {} columns on display", load.id, top.len()),
            SurfaceOutcome::NoData => debug!("{}: no samples", load.id),
            SurfaceOutcome::Rejected => {}
        }

        let selection = survey.selection;
        manager.update_section_lines(&mut stage, &survey.grid, selection);
    }
}

pub(crate) fn apply_section_selection(
    mut requests: MessageReader<SelectSection>,
    mut survey: ResMut<ActiveSurvey>,
    mut manager: ResMut<SceneManager>,
    mut stage: Stage,
) {
    let Some(SelectSection(selection)) = requests.read().last().copied() else {
        return;
    };
    survey.selection = selection;
    manager.update_section_lines(&mut stage, &survey.grid, selection);
}

fn advance_animation(time: Res<Time>, mut manager: ResMut<SceneManager>) {
    manager.update(time.elapsed_secs_f64() * 1000.0);
}

pub(crate) fn sync_trolley(manager: Res<SceneManager>, mut transforms: Query<&mut Transform>) {
    let trolley = manager.trolley();
    if let Some(mut transform) = trolley.body_entity().and_then(|e| transforms.get_mut(e).ok()) {
        transform.translation = trolley.body_translation();
    }
    if let Some(mut transform) = trolley.highlight_entity().and_then(|e| transforms.get_mut(e).ok()) {
        transform.translation = trolley.highlight_translation();
    }
}

/// Rebuild the fog quads so they face the camera
fn sync_fog(
    manager: Res<SceneManager>,
    camera: Query<&GlobalTransform, With<MainCamera>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let fog = manager.fog();
    if !fog.is_visible() {
        return;
    }
    let (Some(handle), Ok(camera)) = (fog.mesh(), camera.single()) else {
        return;
    };
    let Some(mesh) = meshes.get_mut(handle) else {
        return;
    };

    let (positions, colors) = fog.field().write_quads(*camera.right(), *camera.up());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
}

fn face_labels_to_camera(
    camera: Query<&GlobalTransform, With<MainCamera>>,
    mut labels: Query<&mut Transform, With<LabelSprite>>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };
    let rotation = camera.rotation();
    for mut transform in labels.iter_mut() {
        transform.rotation = rotation;
    }
}
