use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::reduce::{filter_by_threshold, reduce_entities, UNKNOWN};
use super::retry::{sleep_unless_cancelled, RetryPolicy};
use super::spec::{AnnotationRequest, ColumnSpec};
use crate::data::model::{CellValue, Dataset};
use crate::error::AnnotateError;
use crate::ner::{Entity, EntityPredictor};

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Progress reported while a request runs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    ColumnStarted {
        spec: ColumnSpec,
        total_rows: usize,
    },
    RowAnnotated {
        column: String,
        row: usize,
        text: String,
        result: String,
    },
    RetryScheduled {
        column: String,
        row: usize,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    ColumnSkipped {
        column: String,
        reason: String,
    },
    ColumnFinished {
        column: String,
        rows: usize,
    },
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub columns_written: Vec<String>,
    pub columns_skipped: Vec<String>,
    pub rows_annotated: usize,
}

// ---------------------------------------------------------------------------
// Annotator
// ---------------------------------------------------------------------------

/// Runs an [`AnnotationRequest`] over a dataset, one prediction call per row
/// and spec, strictly in order.
pub struct Annotator {
    predictor: Arc<dyn EntityPredictor>,
    retry: RetryPolicy,
}

impl Annotator {
    pub fn new(predictor: Arc<dyn EntityPredictor>, retry: RetryPolicy) -> Self {
        Self { predictor, retry }
    }

    /// Annotate `dataset` in place.
    ///
    /// Collisions are checked before anything is written. A spec whose source
    /// column is missing is skipped. A row that still fails after the retry
    /// budget ends the run; rows written up to then are kept.
    pub fn run(
        &self,
        dataset: &mut Dataset,
        request: &AnnotationRequest,
        observer: &mut dyn FnMut(JobEvent),
        cancel: &AtomicBool,
    ) -> Result<RunSummary, AnnotateError> {
        request.check_collisions(dataset)?;

        let mut summary = RunSummary::default();
        for spec in &request.specs {
            if !dataset.has_column(&spec.source_column) {
                let reason = AnnotateError::MissingColumn {
                    column: spec.source_column.clone(),
                }
                .to_string();
                log::error!("Skipping '{}': {reason}", spec.new_column_name);
                observer(JobEvent::ColumnSkipped {
                    column: spec.new_column_name.clone(),
                    reason,
                });
                summary.columns_skipped.push(spec.new_column_name.clone());
                continue;
            }

            log::info!(
                "Annotating '{}' from '{}' with labels {:?} (threshold {})",
                spec.new_column_name,
                spec.source_column,
                spec.labels,
                spec.threshold
            );
            observer(JobEvent::ColumnStarted {
                spec: spec.clone(),
                total_rows: dataset.len(),
            });

            for row in 0..dataset.len() {
                if cancel.load(Ordering::Relaxed) {
                    return Err(AnnotateError::Cancelled);
                }
                let text = dataset
                    .cell(row, &spec.source_column)
                    .map(CellValue::as_text)
                    .unwrap_or_default();
                let result = self.annotate_row(spec, row, &text, observer, cancel)?;
                log::debug!("row {row}: {result}");

                dataset.set_cell(row, &spec.new_column_name, CellValue::String(result.clone()));
                observer(JobEvent::RowAnnotated {
                    column: spec.new_column_name.clone(),
                    row,
                    text,
                    result,
                });
                summary.rows_annotated += 1;
            }

            log::info!("Finished '{}' ({} rows)", spec.new_column_name, dataset.len());
            observer(JobEvent::ColumnFinished {
                column: spec.new_column_name.clone(),
                rows: dataset.len(),
            });
            summary.columns_written.push(spec.new_column_name.clone());
        }
        Ok(summary)
    }

    fn annotate_row(
        &self,
        spec: &ColumnSpec,
        row: usize,
        text: &str,
        observer: &mut dyn FnMut(JobEvent),
        cancel: &AtomicBool,
    ) -> Result<String, AnnotateError> {
        // Empty cells never reach the model.
        if text.is_empty() {
            return Ok(UNKNOWN.to_string());
        }
        let entities = self.predict_with_retry(spec, row, text, observer, cancel)?;
        let kept = filter_by_threshold(entities, spec.threshold);
        Ok(reduce_entities(&kept, spec.labels.len()))
    }

    fn predict_with_retry(
        &self,
        spec: &ColumnSpec,
        row: usize,
        text: &str,
        observer: &mut dyn FnMut(JobEvent),
        cancel: &AtomicBool,
    ) -> Result<Vec<Entity>, AnnotateError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self
                .predictor
                .predict_entities(text, &spec.labels, spec.threshold)
            {
                Ok(entities) => return Ok(entities),
                Err(e) => e,
            };

            if attempt >= self.retry.max_attempts {
                log::error!(
                    "'{}' row {row}: giving up after {attempt} attempt(s): {err:#}",
                    spec.new_column_name
                );
                return Err(AnnotateError::Inference {
                    column: spec.new_column_name.clone(),
                    row,
                    attempts: attempt,
                    message: format!("{err:#}"),
                });
            }

            let delay = self.retry.delay_after(attempt);
            log::warn!(
                "'{}' row {row}: attempt {attempt} failed ({err:#}); retrying in {delay:?}",
                spec.new_column_name
            );
            observer(JobEvent::RetryScheduled {
                column: spec.new_column_name.clone(),
                row,
                attempt,
                delay,
                error: format!("{err:#}"),
            });
            if !sleep_unless_cancelled(delay, cancel) {
                return Err(AnnotateError::Cancelled);
            }
        }
    }
}
