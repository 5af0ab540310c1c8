//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use stockpile_core::{parse_hex_color, QualityBucket};
use stockpile_scene::{ActiveSurvey, PointerCapture, SelectSection};

use crate::network::{submit_login, LoginDialog, PendingLogin, ServerConfig, SnapshotFeed};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Legend swatch color for a quality bucket
pub fn legend_color(bucket: QualityBucket) -> egui::Color32 {
    match parse_hex_color(bucket.legend_hex()) {
        Some([r, g, b]) => egui::Color32::from_rgb(
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        ),
        None => egui::Color32::WHITE,
    }
}

/// Legend color of the bucket a quality score falls in
pub fn quality_color(score: f64) -> egui::Color32 {
    legend_color(QualityBucket::from_score(score))
}

/// "2 / 7" style position, 1-based
pub fn position_text(position: Option<(usize, usize)>) -> String {
    match position {
        Some((index, total)) => format!("{} / {}", index + 1, total),
        None => "-".to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn ui_system(
    mut contexts: EguiContexts,
    mut feed: ResMut<SnapshotFeed>,
    survey: Res<ActiveSurvey>,
    mut login: ResMut<LoginDialog>,
    pending_login: Res<PendingLogin>,
    server: Res<ServerConfig>,
    mut capture: ResMut<PointerCapture>,
    mut selections: MessageWriter<SelectSection>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::SidePanel::left("survey_panel")
        .default_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Stockpile");
            ui.separator();

            ui.label(egui::RichText::new("Ore quality").strong());
            for bucket in QualityBucket::ALL {
                ui.horizontal(|ui| {
                    ui.colored_label(legend_color(bucket), "■");
                    ui.label(bucket.label());
                });
            }

            ui.separator();

            ui.horizontal(|ui| {
                let label = if feed.advance.is_playing() { "Pause" } else { "Play" };
                if ui.button(label).clicked() {
                    feed.advance.toggle();
                }
                if feed.advance.is_advancing() {
                    ui.spinner();
                }
            });

            egui::Grid::new("snapshot_grid").num_columns(2).show(ui, |ui| {
                ui.label("Snapshot:");
                ui.label(feed.advance.current().unwrap_or("-"));
                ui.end_row();

                ui.label("Position:");
                ui.label(position_text(feed.position));
                ui.end_row();

                ui.label("Avg. disappeared quality:");
                match survey.avg_disappeared_quality {
                    Some(quality) => ui.colored_label(quality_color(quality), format!("{:.2} %", quality)),
                    None => ui.label("-"),
                };
                ui.end_row();
            });

            if let Some(error) = feed.advance.last_error() {
                ui.colored_label(egui::Color32::RED, error.to_string());
            }

            ui.separator();

            ui.label(egui::RichText::new("Section").strong());
            match survey.selection {
                Some(x) => {
                    ui.horizontal(|ui| {
                        ui.label(format!("x = {:.1}", x));
                        if ui.button("Clear").clicked() {
                            selections.write(SelectSection(None));
                        }
                    });
                }
                None => {
                    ui.label("Click the surface to pick a section");
                }
            }
        });

    if login.open {
        egui::Window::new("Log in")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.set_min_width(300.0);

                ui.label("The snapshot server requires a password:");
                ui.add_space(8.0);

                let response = ui.add(
                    egui::TextEdit::singleline(&mut login.password)
                        .password(true)
                        .hint_text("Password")
                        .desired_width(280.0),
                );

                if let Some(error) = &login.error {
                    ui.colored_label(egui::Color32::RED, error);
                }

                ui.add_space(12.0);

                let submit = ui
                    .add_enabled(!login.submitting, egui::Button::new("Log in"))
                    .clicked()
                    || (response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
                if submit && !login.submitting {
                    if login.password.is_empty() {
                        login.error = Some("Please enter the password".to_string());
                    } else {
                        login.submitting = true;
                        login.error = None;
                        submit_login(login.password.clone(), &server.http_url, &pending_login);
                    }
                }
            });
    }

    capture.0 = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
}
