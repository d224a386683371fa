use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Labels the default deployment classifies into, in their canonical order.
pub const DEFAULT_LABELS: [&str; 8] = [
    "CHARGES",
    "SAVING",
    "DEBT",
    "INSURANCE",
    "ACCOUNT_LINKING",
    "BILLS",
    "SPENDING",
    "BUDGET",
];

/// A fixed, ordered set of labels.
///
/// The order is significant: when two labels score the same, the one that
/// comes first here ranks first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Build a label set. Labels must be non-empty and unique.
    pub fn new<I, L>(labels: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(RegistryError::Validation("label set is empty".into()));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(RegistryError::Validation("label names must not be blank".into()));
            }
            if labels[..i].contains(label) {
                return Err(RegistryError::Validation(format!("duplicate label {}", label)));
            }
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for LabelSet {
    type Error = RegistryError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels
    }
}
