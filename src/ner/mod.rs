//! Entity-prediction boundary.
//!
//! The annotator only knows [`EntityPredictor`]; model selection and loading
//! live here, behind an explicit [`ModelCache`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::config::{Backend, Settings};

#[cfg(feature = "gliner")]
pub mod gliner;
pub mod http;

/// A matched span as returned by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub score: f32,
}

/// Zero-shot NER: find spans of `text` belonging to any of `labels` with a
/// score of at least `threshold`.
pub trait EntityPredictor: Send + Sync {
    fn predict_entities(&self, text: &str, labels: &[String], threshold: f32) -> Result<Vec<Entity>>;
}

/// Loaded predictors keyed by model id; each model is built at most once.
#[derive(Default)]
pub struct ModelCache {
    entries: HashMap<String, Arc<dyn EntityPredictor>>,
}

impl ModelCache {
    pub fn get_or_load<F>(&mut self, model_id: &str, load: F) -> Result<Arc<dyn EntityPredictor>>
    where
        F: FnOnce(&str) -> Result<Arc<dyn EntityPredictor>>,
    {
        if let Some(p) = self.entries.get(model_id) {
            return Ok(Arc::clone(p));
        }
        log::info!("Loading model {model_id}");
        let predictor = load(model_id)?;
        self.entries.insert(model_id.to_string(), Arc::clone(&predictor));
        Ok(predictor)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Build the predictor for `model_id` with the configured backend.
pub fn load_predictor(settings: &Settings, model_id: &str) -> Result<Arc<dyn EntityPredictor>> {
    match settings.backend {
        Backend::Http => Ok(Arc::new(http::HttpPredictor::new(
            &settings.endpoint,
            model_id,
            settings.request_timeout(),
        )?)),
        #[cfg(feature = "gliner")]
        Backend::Gliner => Ok(Arc::new(gliner::GlinerPredictor::load(
            &settings.model_dir,
            model_id,
        )?)),
        #[cfg(not(feature = "gliner"))]
        Backend::Gliner => anyhow::bail!(
            "backend \"gliner\" needs a build with `--features gliner`"
        ),
    }
}
