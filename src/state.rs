use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use eframe::egui;

use crate::annotate::pipeline::{Annotator, JobEvent, RunSummary};
use crate::annotate::spec::{collect_specs, resize_forms, AnnotationRequest, ColumnForm, ColumnSpec};
use crate::color::LabelColors;
use crate::config::Settings;
use crate::data::export;
use crate::data::loader::FileCache;
use crate::data::model::Dataset;
use crate::error::{AnnotateError, SheetError};
use crate::ner::{self, ModelCache};

// ---------------------------------------------------------------------------
// Run log
// ---------------------------------------------------------------------------

/// Row results kept in the run log. Older ones are dropped so a long sheet
/// does not grow the log without bound.
pub const MAX_LOG_ROWS: usize = 200;

/// One line of the processing log shown in the central panel.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Spec { spec: ColumnSpec, model: String, total_rows: usize },
    Row { row: usize, text: String, result: String },
    Warning(String),
    Error(String),
    Success(String),
}

/// Translate a pipeline event into log lines.
pub fn log_entries(event: JobEvent, model: &str) -> Vec<LogEntry> {
    match event {
        JobEvent::ColumnStarted { spec, total_rows } => vec![LogEntry::Spec {
            spec,
            model: model.to_string(),
            total_rows,
        }],
        JobEvent::RowAnnotated { row, text, result, .. } => vec![LogEntry::Row { row, text, result }],
        JobEvent::RetryScheduled { row, attempt, delay, error, .. } => vec![LogEntry::Warning(format!(
            "Row {}: attempt {attempt} failed ({error}); retrying in {:.1}s",
            row + 1,
            delay.as_secs_f32()
        ))],
        JobEvent::ColumnSkipped { reason, .. } => vec![LogEntry::Error(reason)],
        JobEvent::ColumnFinished { column, .. } => {
            vec![LogEntry::Success(format!("Data processing completed for {column}."))]
        }
    }
}

/// Entries of the current run, with the number of row results kept capped.
#[derive(Debug, Default)]
pub struct RunLog {
    pub entries: Vec<LogEntry>,
    rows: usize,
    /// Row results dropped from the front.
    pub hidden_rows: usize,
}

impl RunLog {
    /// Append an entry, dropping the oldest row result once `MAX_LOG_ROWS`
    /// are kept.
    pub fn push(&mut self, entry: LogEntry) {
        if matches!(entry, LogEntry::Row { .. }) {
            if self.rows < MAX_LOG_ROWS {
                self.rows += 1;
            } else if let Some(oldest) = self.entries.iter().position(|e| matches!(e, LogEntry::Row { .. })) {
                self.entries.remove(oldest);
                self.hidden_rows += 1;
            }
        }
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.rows = 0;
        self.hidden_rows = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Background job
// ---------------------------------------------------------------------------

enum JobMessage {
    Event(JobEvent),
    Done {
        dataset: Dataset,
        outcome: Result<RunSummary, AnnotateError>,
    },
}

/// A request running on a worker thread. The thread owns a copy of the
/// dataset and hands it back in `JobMessage::Done`.
pub struct Job {
    rx: Receiver<JobMessage>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    model: String,
}

impl Job {
    fn spawn(
        ctx: egui::Context,
        annotator: Annotator,
        mut dataset: Dataset,
        request: AnnotationRequest,
        model: String,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            let events = tx.clone();
            let repaint = ctx.clone();
            let outcome = annotator.run(
                &mut dataset,
                &request,
                &mut |event| {
                    let _ = events.send(JobMessage::Event(event));
                    repaint.request_repaint();
                },
                &flag,
            );
            let _ = tx.send(JobMessage::Done { dataset, outcome });
            ctx.request_repaint();
        });

        Self {
            rx,
            cancel,
            handle: Some(handle),
            model,
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Parsed files by content hash.
    pub file_cache: FileCache,

    /// Loaded predictors by model id.
    pub model_cache: ModelCache,

    /// Working copy of the opened table (None until user opens a file).
    pub dataset: Option<Dataset>,

    /// Name of the opened file.
    pub file_name: Option<String>,

    pub selected_model: String,

    /// One form per requested new column.
    pub forms: Vec<ColumnForm>,

    /// Running request, if any.
    pub job: Option<Job>,

    pub log: RunLog,

    pub label_colors: LabelColors,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            selected_model: settings.default_model.clone(),
            settings,
            file_cache: FileCache::default(),
            model_cache: ModelCache::default(),
            dataset: None,
            file_name: None,
            forms: Vec::new(),
            job: None,
            log: RunLog::default(),
            label_colors: LabelColors::new(std::iter::empty()),
            status_message: None,
        }
    }

    /// Read and parse a file, replacing the current dataset.
    pub fn open_file(&mut self, path: &Path) {
        if self.is_running() {
            self.status_message = Some("Wait for processing to finish before opening a file.".to_string());
            return;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let loaded = std::fs::read(path)
            .map_err(SheetError::from)
            .and_then(|bytes| self.file_cache.get_or_load(&name, &bytes));
        match loaded {
            Ok(dataset) => self.set_dataset(name, dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and reset the forms.
    pub fn set_dataset(&mut self, file_name: String, dataset: Dataset) {
        self.forms.clear();
        resize_forms(&mut self.forms, 1, &dataset, self.settings.default_threshold);
        self.dataset = Some(dataset);
        self.file_name = Some(file_name);
        self.log.clear();
        self.status_message = None;
    }

    pub fn set_column_count(&mut self, count: usize) {
        if let Some(ds) = &self.dataset {
            resize_forms(&mut self.forms, count, ds, self.settings.default_threshold);
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// Build the request from the forms and start it on a worker thread.
    pub fn start_processing(&mut self, ctx: &egui::Context) {
        if self.job.is_some() {
            return;
        }
        let Some(dataset) = &self.dataset else {
            self.status_message = Some("Open a file first.".to_string());
            return;
        };
        let specs = match collect_specs(&self.forms) {
            Ok(specs) => specs,
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };
        let request = AnnotationRequest {
            specs,
            collision: self.settings.collision,
        };
        if let Err(e) = request.check_collisions(dataset) {
            self.status_message = Some(format!("Error: {e}"));
            return;
        }

        let settings = &self.settings;
        let predictor = match self
            .model_cache
            .get_or_load(&self.selected_model, |id| ner::load_predictor(settings, id))
        {
            Ok(p) => p,
            Err(e) => {
                log::error!("Failed to load model {}: {e:#}", self.selected_model);
                self.status_message = Some(format!("Error: {e:#}"));
                return;
            }
        };

        self.label_colors = LabelColors::new(
            request
                .specs
                .iter()
                .flat_map(|s| s.labels.iter().map(String::as_str)),
        );
        self.log.clear();
        self.status_message = None;

        let annotator = Annotator::new(predictor, self.settings.retry.policy());
        self.job = Some(Job::spawn(
            ctx.clone(),
            annotator,
            dataset.clone(),
            request,
            self.selected_model.clone(),
        ));
    }

    pub fn cancel_processing(&mut self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }

    /// Drain pending job messages. Called once per frame.
    pub fn poll_job(&mut self) {
        let Some(job) = &mut self.job else {
            return;
        };
        loop {
            match job.rx.try_recv() {
                Ok(JobMessage::Event(event)) => {
                    for entry in log_entries(event, &job.model) {
                        self.log.push(entry);
                    }
                }
                Ok(JobMessage::Done { dataset, outcome }) => {
                    if let Some(handle) = job.handle.take() {
                        let _ = handle.join();
                    }
                    self.dataset = Some(dataset);
                    self.finish(outcome);
                    return;
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.job = None;
                    self.status_message = Some("Error: processing thread stopped unexpectedly".to_string());
                    return;
                }
            }
        }
    }

    fn finish(&mut self, outcome: Result<RunSummary, AnnotateError>) {
        self.job = None;
        match outcome {
            Ok(summary) => {
                log::info!(
                    "Run finished: {} column(s), {} row(s)",
                    summary.columns_written.len(),
                    summary.rows_annotated
                );
            }
            Err(e) => {
                log::error!("Run failed: {e}");
                self.log.push(LogEntry::Error(e.to_string()));
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Serialise the current table as `.xlsx`.
    pub fn export_bytes(&self) -> Result<Vec<u8>, SheetError> {
        let empty = Dataset::default();
        export::to_xlsx_bytes(self.dataset.as_ref().unwrap_or(&empty))
    }

    pub fn save_to(&mut self, path: &Path) {
        let Some(ds) = &self.dataset else {
            return;
        };
        if let Err(e) = export::save_xlsx(ds, path) {
            log::error!("Export failed: {e}");
            self.status_message = Some(format!("Error: {e}"));
        }
    }

    /// Data URI of the current table for pasting into a browser.
    pub fn download_link(&mut self) -> Option<String> {
        match self.export_bytes() {
            Ok(bytes) => Some(export::data_uri(&bytes)),
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                None
            }
        }
    }
}
