use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::{AppState, LogEntry};

// ---------------------------------------------------------------------------
// Central panel – run log and data preview
// ---------------------------------------------------------------------------

/// Render the central panel.
pub fn central_view(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV or Excel file to start  (File → Open…)");
        });
        return;
    };

    if !state.log.is_empty() {
        egui::CollapsingHeader::new(RichText::new("Processing log").strong())
            .default_open(true)
            .show(ui, |ui: &mut Ui| run_log(ui, state));
        ui.separator();
    }

    ui.strong("Data");
    if dataset.is_empty() {
        ui.label("The file has a header but no rows.");
    }
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        let columns = &dataset.column_names;
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(Column::auto().at_least(80.0).clip(true), columns.len())
            .header(20.0, |mut header| {
                for col in columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(col);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, dataset.len(), |mut row| {
                    let idx = row.index();
                    for col in columns {
                        row.col(|ui: &mut Ui| {
                            let text = dataset.cell(idx, col).map(|v| v.to_string()).unwrap_or_default();
                            ui.label(text);
                        });
                    }
                });
            });
    });
}

fn run_log(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical()
        .id_salt("run_log")
        .max_height(ui.available_height() * 0.45)
        .stick_to_bottom(true)
        .show(ui, |ui: &mut Ui| {
            if state.log.hidden_rows > 0 {
                ui.label(
                    RichText::new(format!("{} earlier row result(s) not shown", state.log.hidden_rows))
                        .italics()
                        .weak(),
                );
            }
            for (i, entry) in state.log.entries.iter().enumerate() {
                match entry {
                    LogEntry::Spec { spec, model, total_rows } => {
                        ui.add_space(6.0);
                        ui.label(
                            RichText::new(format!(
                                "Processed data for {} (model: {model})",
                                spec.new_column_name
                            ))
                            .heading(),
                        );
                        egui::Grid::new(spec_grid_id(i, &spec.new_column_name))
                            .num_columns(2)
                            .striped(true)
                            .show(ui, |ui: &mut Ui| {
                                ui.label("Selected column");
                                ui.label(&spec.source_column);
                                ui.end_row();
                                ui.label("Labels");
                                ui.horizontal_wrapped(|ui: &mut Ui| {
                                    for label in &spec.labels {
                                        let shown = if label.is_empty() { "\"\"" } else { label.as_str() };
                                        ui.label(
                                            RichText::new(shown)
                                                .color(state.label_colors.color_for(label))
                                                .strong(),
                                        );
                                    }
                                });
                                ui.end_row();
                                ui.label("Threshold");
                                ui.label(format!("{:.2}", spec.threshold));
                                ui.end_row();
                            });
                        ui.label(format!("Number of total data: {total_rows}"));
                    }
                    LogEntry::Row { row, text, result } => {
                        ui.label(format!("Text {}: {text}", row + 1));
                        ui.label(RichText::new(format!("Result: {result}")).monospace());
                    }
                    LogEntry::Warning(msg) => {
                        ui.label(RichText::new(msg).color(Color32::YELLOW));
                    }
                    LogEntry::Error(msg) => {
                        ui.label(RichText::new(msg).color(Color32::RED));
                    }
                    LogEntry::Success(msg) => {
                        ui.label(RichText::new(msg).color(Color32::GREEN));
                    }
                }
            }
        });
}

/// Overwrite runs may log two specs with the same output column.
fn spec_grid_id(log_index: usize, column: &str) -> egui::Id {
    egui::Id::new(("spec", log_index, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_grids_for_the_same_column_get_distinct_ids() {
        assert_ne!(spec_grid_id(0, "entities"), spec_grid_id(3, "entities"));
        assert_eq!(spec_grid_id(3, "entities"), spec_grid_id(3, "entities"));
    }
}
