use std::collections::HashSet;

use serde::Deserialize;

use crate::data::model::Dataset;
use crate::error::AnnotateError;

// ---------------------------------------------------------------------------
// ColumnSpec – one requested output column
// ---------------------------------------------------------------------------

/// Instruction for producing one annotated column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column whose text is sent to the model.
    pub source_column: String,
    /// Column receiving the result string.
    pub new_column_name: String,
    /// Entity labels in input order. May contain empty strings.
    pub labels: Vec<String>,
    /// Minimum score for an entity to be kept, in `[0.0, 1.0]`.
    pub threshold: f32,
}

impl ColumnSpec {
    pub fn new(
        source_column: impl Into<String>,
        new_column_name: impl Into<String>,
        labels_input: &str,
        threshold: f32,
    ) -> Result<Self, AnnotateError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnnotateError::InvalidThreshold(threshold));
        }
        // A blank header does not survive an export round trip.
        let new_column_name = new_column_name.into();
        if new_column_name.is_empty() {
            return Err(AnnotateError::EmptyColumnName);
        }
        Ok(Self {
            source_column: source_column.into(),
            new_column_name,
            labels: split_labels(labels_input),
            threshold,
        })
    }
}

/// Split the label input on commas. Entries are neither trimmed nor dropped
/// when empty: `"person,"` gives `["person", ""]`.
pub fn split_labels(input: &str) -> Vec<String> {
    input.split(',').map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What happens when a new column name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Refuse the whole request before any row is written.
    #[default]
    Reject,
    /// Replace the existing values row by row.
    Overwrite,
}

/// One click of "Process Data": every spec, fixed for the duration of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRequest {
    pub specs: Vec<ColumnSpec>,
    pub collision: CollisionPolicy,
}

impl AnnotationRequest {
    /// Under `Reject`, fail on the first spec whose output column exists in
    /// the dataset or is produced by an earlier spec of the same request.
    pub fn check_collisions(&self, dataset: &Dataset) -> Result<(), AnnotateError> {
        if self.collision == CollisionPolicy::Overwrite {
            return Ok(());
        }
        let mut produced: HashSet<&str> = HashSet::new();
        for spec in &self.specs {
            let name = spec.new_column_name.as_str();
            if dataset.has_column(name) || !produced.insert(name) {
                return Err(AnnotateError::ColumnCollision {
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ColumnForm – editable form state behind one ColumnSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnForm {
    pub source_column: String,
    pub new_column_name: String,
    pub labels: String,
    pub threshold: f32,
}

impl ColumnForm {
    pub fn new(source_column: &str, threshold: f32) -> Self {
        Self {
            source_column: source_column.to_string(),
            new_column_name: String::new(),
            labels: String::new(),
            threshold,
        }
    }

    /// Non-blocking warning shown while the user types.
    pub fn collides_with(&self, dataset: &Dataset) -> bool {
        dataset.has_column(&self.new_column_name)
    }

    pub fn to_spec(&self) -> Result<ColumnSpec, AnnotateError> {
        ColumnSpec::new(
            self.source_column.clone(),
            self.new_column_name.clone(),
            &self.labels,
            self.threshold,
        )
    }
}

/// Grow or shrink the form list to `count` (at least one) entries. Existing
/// entries keep their contents; new ones point at the first column.
pub fn resize_forms(forms: &mut Vec<ColumnForm>, count: usize, dataset: &Dataset, threshold: f32) {
    let count = count.max(1);
    let first = dataset.column_names.first().map(String::as_str).unwrap_or("");
    forms.truncate(count);
    while forms.len() < count {
        forms.push(ColumnForm::new(first, threshold));
    }
}

/// Build every spec from the current form state.
pub fn collect_specs(forms: &[ColumnForm]) -> Result<Vec<ColumnSpec>, AnnotateError> {
    forms.iter().map(ColumnForm::to_spec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn dataset() -> Dataset {
        Dataset::from_records(
            vec!["comment".into(), "entities".into()],
            vec![vec![CellValue::from("x"), CellValue::Null]],
        )
    }

    #[test]
    fn labels_keep_order_and_empty_entries() {
        assert_eq!(split_labels("person,location"), vec!["person", "location"]);
        assert_eq!(split_labels("person,"), vec!["person", ""]);
        assert_eq!(split_labels(" person , org"), vec![" person ", " org"]);
        assert_eq!(split_labels(""), vec![""]);
    }

    #[test]
    fn threshold_must_be_in_unit_interval() {
        assert!(ColumnSpec::new("a", "b", "x", 0.0).is_ok());
        assert!(ColumnSpec::new("a", "b", "x", 1.0).is_ok());
        assert!(matches!(
            ColumnSpec::new("a", "b", "x", 1.01),
            Err(AnnotateError::InvalidThreshold(_))
        ));
        assert!(ColumnSpec::new("a", "b", "x", f32::NAN).is_err());
    }

    #[test]
    fn new_column_name_is_required() {
        assert!(matches!(
            ColumnSpec::new("comment", "", "person", 0.5),
            Err(AnnotateError::EmptyColumnName)
        ));
        let form = ColumnForm::new("comment", 0.5);
        assert!(matches!(collect_specs(&[form]), Err(AnnotateError::EmptyColumnName)));
    }

    #[test]
    fn existing_column_is_rejected_by_default() {
        let request = AnnotationRequest {
            specs: vec![ColumnSpec::new("comment", "entities", "person", 0.5).unwrap()],
            collision: CollisionPolicy::default(),
        };
        let err = request.check_collisions(&dataset()).unwrap_err();
        assert!(matches!(err, AnnotateError::ColumnCollision { ref column } if column == "entities"));

        let overwrite = AnnotationRequest {
            collision: CollisionPolicy::Overwrite,
            ..request
        };
        assert!(overwrite.check_collisions(&dataset()).is_ok());
    }

    #[test]
    fn duplicate_names_within_a_request_are_rejected() {
        let request = AnnotationRequest {
            specs: vec![
                ColumnSpec::new("comment", "people", "person", 0.5).unwrap(),
                ColumnSpec::new("comment", "people", "org", 0.5).unwrap(),
            ],
            collision: CollisionPolicy::Reject,
        };
        assert!(request.check_collisions(&dataset()).is_err());
    }

    #[test]
    fn forms_resize_and_keep_contents() {
        let ds = dataset();
        let mut forms = Vec::new();
        resize_forms(&mut forms, 0, &ds, 0.5);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].source_column, "comment");

        forms[0].new_column_name = "entities".into();
        assert!(forms[0].collides_with(&ds));
        resize_forms(&mut forms, 3, &ds, 0.5);
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[0].new_column_name, "entities");
        resize_forms(&mut forms, 2, &ds, 0.5);
        assert_eq!(forms.len(), 2);
    }

    #[test]
    fn specs_are_built_from_forms() {
        let mut form = ColumnForm::new("comment", 0.3);
        form.new_column_name = "ner".into();
        form.labels = "person,location".into();
        let specs = collect_specs(&[form]).unwrap();
        assert_eq!(specs[0].labels, vec!["person", "location"]);
        assert_eq!(specs[0].threshold, 0.3);
    }
}
