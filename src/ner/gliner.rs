//! Local GLiNER inference through gline-rs (span mode, ONNX Runtime).
//!
//! Only compiled with the `gliner` feature.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use gliner::model::input::text::TextInput;
use gliner::model::params::Parameters;
use gliner::model::pipeline::span::SpanMode;
use gliner::model::GLiNER;
use orp::params::RuntimeParameters;

use super::{Entity, EntityPredictor};

/// Wraps a `GLiNER<SpanMode>` behind a Mutex since inference requires
/// `&mut self`.
pub struct GlinerPredictor {
    model: Mutex<GLiNER<SpanMode>>,
}

impl GlinerPredictor {
    /// Load `<model_dir>/<model_id>/tokenizer.json` and
    /// `<model_dir>/<model_id>/onnx/model.onnx`.
    ///
    /// The model decodes with a zero threshold and the per-call threshold is
    /// applied afterwards. Greedy span decoding visits spans by descending
    /// score, so this keeps the same spans as decoding at the call threshold.
    pub fn load(model_dir: &Path, model_id: &str) -> Result<Self> {
        let dir = model_dir.join(model_id);
        let tokenizer = dir.join("tokenizer.json");
        let onnx = dir.join("onnx").join("model.onnx");
        if !onnx.exists() {
            return Err(anyhow!("model file not found: {}", onnx.display()));
        }

        let params = Parameters::default().with_threshold(0.0);
        let model = GLiNER::<SpanMode>::new(params, RuntimeParameters::default(), &tokenizer, &onnx)
            .map_err(|e| anyhow!("failed to load GLiNER model {model_id}: {e}"))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl EntityPredictor for GlinerPredictor {
    fn predict_entities(&self, text: &str, labels: &[String], threshold: f32) -> Result<Vec<Entity>> {
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let input = TextInput::from_str(&[text], &labels).map_err(|e| anyhow!("input error: {e}"))?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow!("model lock poisoned: {e}"))?;
        let output = model
            .inference(input)
            .map_err(|e| anyhow!("inference error: {e}"))
            .context("running GLiNER")?;

        Ok(output
            .spans
            .iter()
            .flat_map(|batch| batch.iter())
            .filter(|span| span.probability() >= threshold)
            .map(|span| Entity {
                text: span.text().to_string(),
                label: span.class().to_string(),
                score: span.probability(),
            })
            .collect())
    }
}
