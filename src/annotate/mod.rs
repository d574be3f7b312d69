//! Column annotation: turn a table plus a list of [`spec::ColumnSpec`]s into
//! new columns of entity strings.
//!
//! ```text
//!  ColumnForm (UI) ──collect──▶ AnnotationRequest
//!                                     │
//!   Dataset ──────────────────▶  Annotator::run ──▶ EntityPredictor (per row)
//!                                     │
//!                                 reduce → Dataset::set_cell
//! ```

pub mod pipeline;
pub mod reduce;
pub mod retry;
pub mod spec;
