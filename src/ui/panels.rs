use egui::{Align2, Color32, Context, FontId, RichText, ScrollArea, Ui};
use glam::{Vec2, Vec3};

use crate::renderer::{Camera, CameraMode};
use crate::scene::LayerStyle;
use crate::ui::state::{PickedPoint, SceneSummary, UiState};
use crate::ui::theme::*;

#[derive(Default)]
pub struct UiActions {
    pub reframe: bool,
}

pub fn draw_side_panel(ctx: &Context, state: &mut UiState, summary: &SceneSummary) -> UiActions {
    let mut actions = UiActions::default();

    if !state.show_panel {
        return actions;
    }

    egui::SidePanel::right("control_panel")
        .min_width(260.0)
        .max_width(360.0)
        .default_width(280.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("plyview").strong());
                ui.add_space(4.0);
                ui.label(RichText::new(&summary.file_name).color(TEXT_MUTED).size(11.0));
                ui.add_space(16.0);

                mesh_stats(ui, summary);
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "MESH");
                layer_controls(ui, "mesh", &mut state.style.mesh);
                ui.horizontal(|ui| {
                    ui.label("Opacity:");
                    ui.add(egui::Slider::new(&mut state.style.mesh.color[3], 0.0..=1.0));
                });
                ui.add_space(16.0);

                section_header(ui, "HIGHLIGHT");
                if summary.highlighted_cells.is_empty() {
                    ui.label(RichText::new("no cells selected").color(TEXT_MUTED).italics());
                } else {
                    layer_controls(ui, "highlight", &mut state.style.highlight);
                }
                ui.add_space(16.0);

                section_header(ui, "POINTS");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut state.style.markers.visible, "Markers");
                    ui.color_edit_button_rgba_unmultiplied(&mut state.style.markers.color);
                });
                ui.horizontal(|ui| {
                    ui.label("Size:");
                    ui.add(egui::Slider::new(&mut state.style.markers.size, 1.0..=40.0).suffix("px"));
                });
                ui.checkbox(&mut state.style.markers.labels, "Index labels");
                ui.add_space(16.0);

                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "VIEW");
                camera_controls(ui, &mut state.camera_mode);
                ui.checkbox(&mut state.vsync_enabled, "VSync");
                if ui
                    .add(egui::Button::new("Reset view").min_size(egui::vec2(ui.available_width(), 28.0)))
                    .clicked()
                {
                    actions.reframe = true;
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn layer_controls(ui: &mut Ui, id: &str, layer: &mut LayerStyle) {
    ui.push_id(id, |ui| {
        ui.horizontal(|ui| {
            ui.checkbox(&mut layer.visible, "Visible");
            ui.color_edit_button_rgba_unmultiplied(&mut layer.color);
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut layer.show_edges, "Edges");
            ui.color_edit_button_rgba_unmultiplied(&mut layer.edge_color);
        });
        ui.horizontal(|ui| {
            ui.label("Line width:");
            ui.add(egui::Slider::new(&mut layer.line_width, 1.0..=12.0).suffix("px"));
        });
    });
}

fn camera_controls(ui: &mut Ui, mode: &mut CameraMode) {
    ui.horizontal(|ui| {
        ui.label("Camera:");
        if ui.selectable_label(*mode == CameraMode::Free, "Free").clicked() {
            *mode = CameraMode::Free;
        }
        if ui.selectable_label(*mode == CameraMode::Orbital, "Orbital").clicked() {
            *mode = CameraMode::Orbital;
        }
    });
}

fn mesh_stats(ui: &mut Ui, summary: &SceneSummary) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id = Some(FontId::monospace(11.0));

            egui::Grid::new("stats").num_columns(2).spacing([20.0, 4.0]).show(ui, |ui| {
                let rows = [
                    ("Points", fmt_num(summary.points), TEXT_PRIMARY),
                    ("Cells", fmt_num(summary.cells), TEXT_PRIMARY),
                    ("Triangles", fmt_num(summary.triangles), TEXT_PRIMARY),
                    ("Edges", fmt_num(summary.edges), TEXT_PRIMARY),
                    ("Highlighted", fmt_cells(&summary.highlighted_cells), ACCENT_PINK),
                ];
                for (name, value, color) in rows {
                    ui.label(RichText::new(name).color(TEXT_MUTED));
                    ui.label(RichText::new(value).color(color));
                    ui.end_row();
                }
            });
        });
}

pub fn draw_help_overlay(ctx: &Context, camera: &Camera, picked: Option<PickedPoint>) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id = Some(FontId::monospace(11.0));
                    let controls = match camera.mode {
                        CameraMode::Orbital => "RMB+Drag - Orbit | Scroll - Zoom | LMB - Pick",
                        CameraMode::Free => "WASD - Move | RMB+Drag - Look | Scroll - Speed | LMB - Pick",
                    };
                    ui.label(RichText::new(controls).color(TEXT_MUTED));
                    ui.label(RichText::new("C - Camera | R - Reset | L - Labels | Tab - Panel").color(TEXT_MUTED));
                    let p = camera.position;
                    ui.label(
                        RichText::new(format!("Pos: ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)).color(TEXT_MUTED),
                    );
                    if let Some(picked) = picked {
                        let [x, y, z] = picked.position;
                        ui.label(
                            RichText::new(format!("Point {}: ({x:.4}, {y:.4}, {z:.4})", picked.index))
                                .color(TEXT_BRIGHT),
                        );
                    }
                });
        });
}

/// Paints each point's label next to its marker, behind every panel.
/// `viewport` is in physical pixels.
pub fn draw_point_labels(
    ctx: &Context,
    camera: &Camera,
    viewport: Vec2,
    points: &[[f32; 3]],
    labels: &[String],
    marker_size: f32,
) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("point_labels")));
    let pixels_per_point = ctx.pixels_per_point();
    let screen = ctx.screen_rect();
    let font = FontId::proportional(12.0);
    let offset = egui::vec2(marker_size * 0.5 + 2.0, -(marker_size * 0.5 + 2.0)) / pixels_per_point;

    for (point, label) in points.iter().zip(labels) {
        let Some((pixel, _)) = camera.project(Vec3::from_array(*point), viewport) else {
            continue;
        };
        let pos = egui::pos2(pixel.x / pixels_per_point, pixel.y / pixels_per_point) + offset;
        if !screen.contains(pos) {
            continue;
        }

        let galley = painter.layout_no_wrap(label.clone(), font.clone(), LABEL_TEXT);
        let rect = Align2::LEFT_BOTTOM.anchor_size(pos, galley.size()).expand(2.0);
        painter.rect_filled(rect, 2.0, LABEL_BG);
        painter.galley(rect.min + egui::vec2(2.0, 2.0), galley, LABEL_TEXT);
    }
}

/// Ring around the picked marker.
pub fn draw_pick_marker(ctx: &Context, camera: &Camera, viewport: Vec2, picked: PickedPoint, marker_size: f32) {
    let Some((pixel, _)) = camera.project(Vec3::from_array(picked.position), viewport) else {
        return;
    };
    let pixels_per_point = ctx.pixels_per_point();
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("pick_marker")));
    painter.circle_stroke(
        egui::pos2(pixel.x / pixels_per_point, pixel.y / pixels_per_point),
        (marker_size * 0.5 + 4.0) / pixels_per_point,
        egui::Stroke::new(2.0, PICK_RING),
    );
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}

fn fmt_cells(cells: &[usize]) -> String {
    match cells {
        [] => "none".to_string(),
        [one] => one.to_string(),
        [first, rest @ ..] if rest.len() < 4 => {
            rest.iter().fold(first.to_string(), |acc, c| format!("{acc}, {c}"))
        }
        many => format!("{} cells", many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_abbreviated() {
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(12_345), "12.3K");
        assert_eq!(fmt_num(2_500_000), "2.50M");
    }

    #[test]
    fn cell_lists() {
        assert_eq!(fmt_cells(&[]), "none");
        assert_eq!(fmt_cells(&[0]), "0");
        assert_eq!(fmt_cells(&[1, 4, 9]), "1, 4, 9");
        assert_eq!(fmt_cells(&[0, 1, 2, 3, 4, 5]), "6 cells");
    }
}
