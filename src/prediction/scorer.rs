//! The pluggable scoring body.

use thiserror::Error;

use super::LabelSet;
use crate::model::TrainingRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScoringError {
    pub message: String,
}

impl ScoringError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Scores `text` against every label for a model.
///
/// Must return exactly one score per label, in label-set order.
pub trait ScoringRoutine: Send + Sync {
    fn score(
        &self,
        model: &TrainingRequest,
        labels: &LabelSet,
        text: &str,
    ) -> Result<Vec<f64>, ScoringError>;
}

impl<F> ScoringRoutine for F
where
    F: Fn(&TrainingRequest, &LabelSet, &str) -> Result<Vec<f64>, ScoringError> + Send + Sync,
{
    fn score(
        &self,
        model: &TrainingRequest,
        labels: &LabelSet,
        text: &str,
    ) -> Result<Vec<f64>, ScoringError> {
        self(model, labels, text)
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a over `parts`, with a `0xff` byte between parts. The
/// separator never occurs in UTF-8, so `("ab", "c")` and `("a", "bc")` differ.
fn fnv1a64(parts: &[&[u8]]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hash = (hash ^ 0xff).wrapping_mul(FNV_PRIME);
        }
        for &byte in part.iter() {
            hash = (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Stand-in scorer: derives a score in `[0, 1)` for each label from an
/// FNV-1a hash of the model id, the label and the text. The hash is fixed,
/// so scores are stable across processes, platforms and compiler releases.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashScorer;

impl ScoringRoutine for HashScorer {
    fn score(
        &self,
        model: &TrainingRequest,
        labels: &LabelSet,
        text: &str,
    ) -> Result<Vec<f64>, ScoringError> {
        Ok(labels
            .iter()
            .map(|label| {
                let hash = fnv1a64(&[model.id.as_bytes(), label.as_bytes(), text.as_bytes()]);
                (hash % 10_000) as f64 / 10_000.0
            })
            .collect())
    }
}
