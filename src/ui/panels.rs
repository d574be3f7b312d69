use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export::DOWNLOAD_FILE_NAME;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – model, file and column forms
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("NER Annotation");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            model_picker(ui, state);
            ui.separator();

            let running = state.is_running();
            if ui
                .add_enabled(!running, egui::Button::new("Open CSV / Excel…"))
                .on_hover_text("Upload your data file (in CSV or Excel format)")
                .clicked()
            {
                open_file_dialog(state);
            }
            if let Some(name) = &state.file_name {
                ui.label(RichText::new(name).italics());
            }

            if state.dataset.is_none() {
                ui.label("No dataset loaded.");
                return;
            }
            ui.separator();

            column_forms(ui, state);
            ui.separator();

            ui.horizontal(|ui: &mut Ui| {
                if ui
                    .add_enabled(!running, egui::Button::new("Process Data"))
                    .clicked()
                {
                    let ctx = ui.ctx().clone();
                    state.start_processing(&ctx);
                }
                if running {
                    let cancelling = state.job.as_ref().is_some_and(|j| j.is_cancelling());
                    if ui
                        .add_enabled(!cancelling, egui::Button::new("Cancel"))
                        .clicked()
                    {
                        state.cancel_processing();
                    }
                    ui.spinner();
                }
            });

            ui.separator();
            download_buttons(ui, state);
        });
}

fn model_picker(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Model");
    let models = state.settings.models.clone();
    egui::ComboBox::from_id_salt("model")
        .selected_text(&state.selected_model)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for model in &models {
                ui.selectable_value(&mut state.selected_model, model.clone(), model);
            }
        });
}

fn column_forms(ui: &mut Ui, state: &mut AppState) {
    let mut count = state.forms.len().max(1);
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Number of new columns");
        ui.add(egui::DragValue::new(&mut count).range(1..=64))
            .on_hover_text("Number of new columns to be created with NER");
    });
    if count != state.forms.len() {
        state.set_column_count(count);
    }

    let Some(dataset) = state.dataset.as_ref() else {
        return;
    };
    let columns = &dataset.column_names;

    for (i, form) in state.forms.iter_mut().enumerate() {
        egui::CollapsingHeader::new(RichText::new(format!("New Column {} Details", i + 1)).strong())
            .id_salt(("column_form", i))
            .default_open(i == 0)
            .show(ui, |ui: &mut Ui| {
                ui.label("Source column");
                egui::ComboBox::from_id_salt(("source_column", i))
                    .selected_text(&form.source_column)
                    .show_ui(ui, |ui: &mut Ui| {
                        for col in columns {
                            ui.selectable_value(&mut form.source_column, col.clone(), col);
                        }
                    });

                ui.label("New column name");
                ui.text_edit_singleline(&mut form.new_column_name)
                    .on_hover_text("Name of the new column to be created.");
                if form.new_column_name.is_empty() {
                    ui.label(RichText::new("Enter a name for the new column.").color(Color32::YELLOW));
                } else if form.collides_with(dataset) {
                    ui.label(
                        RichText::new("This column name already exists in the dataset.")
                            .color(Color32::YELLOW),
                    );
                }

                ui.label("Labels");
                ui.text_edit_singleline(&mut form.labels).on_hover_text(
                    "One label, or several separated by commas. Entries are used exactly as typed.",
                );

                ui.add(
                    egui::Slider::new(&mut form.threshold, 0.0..=1.0)
                        .step_by(0.01)
                        .text("threshold"),
                );
            });
    }
}

fn download_buttons(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Download");
    let running = state.is_running();
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .add_enabled(!running, egui::Button::new("Save as…"))
            .clicked()
        {
            save_file_dialog(state);
        }
        if ui
            .add_enabled(!running, egui::Button::new("Copy download link"))
            .on_hover_text("Copies a base64 data URI of the workbook to the clipboard")
            .clicked()
        {
            if let Some(uri) = state.download_link() {
                ui.ctx().copy_text(uri);
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.add_enabled(!state.is_running(), egui::Button::new("Open…")).clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Save as…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} rows, {} columns",
                ds.len(),
                ds.column_names.len()
            ));
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open data file")
        .add_filter("Supported files", &["csv", "xlsx"])
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save annotated data")
        .set_file_name(DOWNLOAD_FILE_NAME)
        .add_filter("Excel", &["xlsx"])
        .save_file();

    if let Some(path) = file {
        state.save_to(&path);
    }
}
