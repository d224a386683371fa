//! Prediction - rank labels for a text against a registered model.
//!
//! The service looks the model up in the registry, hands the decoded training
//! request to a [`ScoringRoutine`], and ranks the labels by score. Ties keep
//! label-set order so identical scores always rank the same way.
//!
//! ## Example
//!
//! ```ignore
//! let service = PredictionService::new(registry, HashScorer, LabelSet::default());
//! let ranked = service.predict("tc-01", "overdraft fee again", Some(3))?;
//! assert_eq!(ranked.len(), 3);
//! ```

mod labels;
mod scorer;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::model::{ModelStatus, TrainingRequest, MISSING_PARAMETERS, WRONG_PARAMETERS};
use crate::registry::ModelRegistry;
use crate::store::RecordStore;

pub use labels::{LabelSet, DEFAULT_LABELS};
pub use scorer::{HashScorer, ScoringError, ScoringRoutine};

/// Number of labels returned when the request does not say.
pub const DEFAULT_N_TOP: usize = 5;

/// A label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// `n_top` as clients send it: an integer, a float, or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopN {
    Number(i64),
    /// Truncated toward zero.
    Float(f64),
    Text(String),
}

/// Raw prediction input, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub n_top: Option<TopN>,
}

/// A validated prediction request, echoed back in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub model_id: String,
    pub text: String,
    pub n_top: usize,
}

/// Prediction result: the request, the model it ran against, the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction_request: PredictionRequest,
    pub model: TrainingRequest,
    pub prediction: Vec<LabelScore>,
}

/// Reads models from the registry and ranks labels for a text.
pub struct PredictionService<S, C> {
    registry: ModelRegistry<S>,
    scorer: C,
    labels: LabelSet,
    default_n_top: usize,
    require_active: bool,
}

impl<S: RecordStore, C: ScoringRoutine> PredictionService<S, C> {
    pub fn new(registry: ModelRegistry<S>, scorer: C, labels: LabelSet) -> Self {
        Self {
            registry,
            scorer,
            labels,
            default_n_top: DEFAULT_N_TOP,
            require_active: false,
        }
    }

    /// Set the number of labels returned when a request omits `n_top`.
    pub fn with_default_n_top(mut self, n_top: usize) -> Self {
        self.default_n_top = n_top.max(1);
        self
    }

    /// Only serve predictions from models whose training has finished.
    pub fn require_active(mut self, require: bool) -> Self {
        self.require_active = require;
        self
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Rank labels for `text` against `model_id`, returning at most `n_top`.
    pub fn predict(
        &self,
        model_id: &str,
        text: &str,
        n_top: Option<usize>,
    ) -> Result<Vec<LabelScore>, RegistryError> {
        let request = self.validate(model_id, text, n_top)?;
        let (_, ranked) = self.run(&request)?;
        Ok(ranked)
    }

    /// Validate raw input and predict, returning the full response.
    pub fn predict_input(&self, input: PredictionInput) -> Result<PredictionResponse, RegistryError> {
        let n_top = match input.n_top {
            None => None,
            Some(TopN::Number(n)) => Some(n),
            Some(TopN::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
            Some(TopN::Float(_)) => {
                return Err(RegistryError::Validation(WRONG_PARAMETERS.into()));
            }
            Some(TopN::Text(s)) => Some(
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| RegistryError::Validation(WRONG_PARAMETERS.into()))?,
            ),
        };
        let n_top = match n_top {
            None => None,
            Some(n) if n > 0 => Some(n as usize),
            Some(_) => {
                return Err(RegistryError::Validation(
                    "n_top must be a positive integer".into(),
                ))
            }
        };

        let request = self.validate(
            input.model_id.as_deref().unwrap_or_default(),
            input.text.as_deref().unwrap_or_default(),
            n_top,
        )?;
        let (model, prediction) = self.run(&request)?;

        Ok(PredictionResponse {
            prediction_request: request,
            model,
            prediction,
        })
    }

    fn validate(
        &self,
        model_id: &str,
        text: &str,
        n_top: Option<usize>,
    ) -> Result<PredictionRequest, RegistryError> {
        if model_id.trim().is_empty() || text.trim().is_empty() {
            return Err(RegistryError::Validation(MISSING_PARAMETERS.into()));
        }
        let n_top = match n_top {
            Some(0) => {
                return Err(RegistryError::Validation(
                    "n_top must be a positive integer".into(),
                ))
            }
            Some(n) => n,
            None => self.default_n_top,
        };

        Ok(PredictionRequest {
            model_id: model_id.to_string(),
            text: text.to_string(),
            n_top: n_top.min(self.labels.len()),
        })
    }

    fn run(
        &self,
        request: &PredictionRequest,
    ) -> Result<(TrainingRequest, Vec<LabelScore>), RegistryError> {
        let record = self
            .registry
            .find(&request.model_id)?
            .ok_or_else(|| RegistryError::ModelNotFound {
                id: request.model_id.clone(),
            })?;

        if self.require_active && record.status != ModelStatus::Active {
            return Err(RegistryError::ModelNotReady {
                id: record.id,
                status: record.status,
            });
        }

        let model = record.request().map_err(|e| RegistryError::CorruptRecord {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;

        let scores = self
            .scorer
            .score(&model, &self.labels, &request.text)
            .map_err(|e| RegistryError::Scoring(e.to_string()))?;

        if scores.len() != self.labels.len() {
            return Err(RegistryError::Scoring(format!(
                "expected {} scores, got {}",
                self.labels.len(),
                scores.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(RegistryError::Scoring("scores must be finite".into()));
        }

        let ranked = rank(&self.labels, &scores, request.n_top);
        debug!(model_id = %request.model_id, status = %record.status, returned = ranked.len(), "prediction ranked");
        Ok((model, ranked))
    }
}

/// Sort labels by descending score, keeping label order on ties, and keep
/// the first `n_top`.
pub fn rank(labels: &LabelSet, scores: &[f64], n_top: usize) -> Vec<LabelScore> {
    let mut ranked: Vec<LabelScore> = labels
        .iter()
        .zip(scores.iter())
        .map(|(label, score)| LabelScore {
            label: label.to_string(),
            score: *score,
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(n_top);
    ranked
}
