//! Viewer HUD.

use crate::math::Location;
use crate::renderer::BackendState;

const TEXT: egui::Color32 = egui::Color32::from_rgb(210, 210, 210);
const MUTED: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

/// What the HUD shows for one frame.
#[derive(Debug, Clone, Copy)]
pub struct HudInfo {
    pub backend: BackendState,
    pub complete: bool,
    pub points: usize,
    pub center: Location,
    pub fps: f64,
}

fn status(info: &HudInfo) -> (&'static str, egui::Color32) {
    match info.backend {
        BackendState::Lost => ("backend lost", egui::Color32::from_rgb(200, 100, 100)),
        BackendState::NotReady => ("loading", egui::Color32::from_rgb(200, 180, 100)),
        BackendState::Ready if !info.complete => ("loading", egui::Color32::from_rgb(200, 180, 100)),
        BackendState::Ready => ("ready", egui::Color32::from_rgb(120, 200, 120)),
    }
}

pub fn draw_hud(ctx: &egui::Context, info: &HudInfo) {
    let (label, color) = status(info);

    egui::Area::new(egui::Id::new("hud_area"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 200))
                .rounding(4.0)
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(label).color(color));
                    ui.label(
                        egui::RichText::new(format!("{} points", info.points)).color(TEXT),
                    );
                    ui.label(
                        egui::RichText::new(format!(
                            "center {:.2}°, {:.2}°",
                            info.center.lat, info.center.lng
                        ))
                        .color(MUTED),
                    );
                    ui.label(egui::RichText::new(format!("{:.0} fps", info.fps)).color(MUTED));
                });
        });
}
