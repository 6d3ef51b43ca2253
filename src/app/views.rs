//! View rendering (photo rows, status text)

use super::App;
use crate::gallery::{arrange, display_order};
use crate::layout::{LayoutParams, RenderRow};
use crate::types::FileRecord;
use eframe::egui;

/// Screen rectangles for every image, rows stacked from `origin`.
///
/// `origin` is the container's top-left corner; every image keeps `margin`
/// on each side, so neighbours and consecutive rows sit `2 * margin` apart.
fn place_rows(rows: &[RenderRow<'_>], origin: egui::Pos2, margin: f32) -> Vec<(String, egui::Rect)> {
    let mut placed = Vec::new();
    let mut y = origin.y + margin;
    for row in rows {
        let mut x = origin.x + margin;
        for image in &row.images {
            let size = egui::vec2(image.width as f32, image.height as f32);
            placed.push((image.file.name.clone(), egui::Rect::from_min_size(egui::pos2(x, y), size)));
            x += size.x + 2.0 * margin;
        }
        y += row.height as f32 + 2.0 * margin;
    }
    placed
}

impl App {
    pub(crate) fn has_displayable_files(&self) -> bool {
        self.files.iter().any(FileRecord::is_displayable)
    }

    pub(crate) fn render_grid(&mut self, ui: &mut egui::Ui) {
        let area = ui.max_rect();
        let margin = self.settings.images_margin;
        let params = LayoutParams {
            images_per_row: self.settings.images_per_row,
            margin,
            container_width: (area.width() as u32).saturating_sub(2 * margin).max(1),
        };

        let placed = {
            let ordered = display_order(&self.files);
            let rows = arrange(
                &ordered,
                &params,
                self.settings.number_of_rows,
                self.settings.row_type,
                self.seed,
            );
            place_rows(&rows, area.min, margin as f32)
        };

        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        for (name, rect) in placed {
            if let Some(texture) = self.load_thumbnail(ui.ctx(), &name) {
                ui.painter()
                    .image(texture.id(), rect, uv, egui::Color32::WHITE);
            }
        }
    }

    pub(crate) fn render_status(&self, ui: &mut egui::Ui) {
        let text = self.error_message.as_deref().unwrap_or("Loading ...");
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new(text)
                    .size(20.0)
                    .color(egui::Color32::from_gray(200)),
            );
        });
    }
}
