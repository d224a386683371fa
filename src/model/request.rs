//! Training requests and the client-facing create/update input.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

pub const DEFAULT_N_TEXTS: u32 = 2000;
pub const DEFAULT_N_ITER: u32 = 20;

/// Message returned when a required create field is missing or blank.
pub(crate) const MISSING_PARAMETERS: &str = "Required parameters not supplied";

/// Message returned when a field is present but has the wrong type.
pub(crate) const WRONG_PARAMETERS: &str = "Wrong parameters";

fn default_n_texts() -> u32 {
    DEFAULT_N_TEXTS
}

fn default_n_iter() -> u32 {
    DEFAULT_N_ITER
}

/// A validated training request.
///
/// This is the payload stored in a record's `data` attribute and the
/// immutable snapshot carried by a training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub id: String,
    pub s3bucket: String,
    pub training_object: String,
    #[serde(default)]
    pub spacy_model: Option<String>,
    #[serde(default = "default_n_texts")]
    pub n_texts: u32,
    #[serde(default = "default_n_iter")]
    pub n_iter: u32,
}

impl TrainingRequest {
    /// Build a request with default hyperparameters and no base model.
    pub fn new(
        id: impl Into<String>,
        s3bucket: impl Into<String>,
        training_object: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            s3bucket: s3bucket.into(),
            training_object: training_object.into(),
            spacy_model: None,
            n_texts: DEFAULT_N_TEXTS,
            n_iter: DEFAULT_N_ITER,
        }
    }

    pub fn with_spacy_model(mut self, name: impl Into<String>) -> Self {
        self.spacy_model = Some(name.into());
        self
    }

    pub fn with_n_texts(mut self, n_texts: u32) -> Self {
        self.n_texts = n_texts;
        self
    }

    pub fn with_n_iter(mut self, n_iter: u32) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Check required fields and hyperparameter ranges.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if [&self.id, &self.s3bucket, &self.training_object]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(RegistryError::Validation(MISSING_PARAMETERS.into()));
        }
        if self.n_texts == 0 {
            return Err(RegistryError::Validation(
                "n_texts must be a positive integer".into(),
            ));
        }
        if self.n_iter == 0 {
            return Err(RegistryError::Validation(
                "n_iter must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// The `force_update` flag as clients send it.
///
/// Older clients send the string `"True"`; newer ones send a JSON boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForceFlag {
    Bool(bool),
    Text(String),
}

impl ForceFlag {
    pub fn is_set(&self) -> bool {
        match self {
            ForceFlag::Bool(value) => *value,
            ForceFlag::Text(value) => value.eq_ignore_ascii_case("true"),
        }
    }
}

/// Raw create/update input, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateModelInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub s3bucket: Option<String>,
    #[serde(default)]
    pub training_object: Option<String>,
    #[serde(default)]
    pub spacy_model: Option<String>,
    #[serde(default)]
    pub n_texts: Option<i64>,
    #[serde(default)]
    pub n_iter: Option<i64>,
    #[serde(default)]
    pub force_update: Option<ForceFlag>,
}

impl CreateModelInput {
    pub fn force_update(&self) -> bool {
        self.force_update.as_ref().is_some_and(ForceFlag::is_set)
    }

    /// Validate the input and produce the request snapshot plus the force flag.
    pub fn into_request(self) -> Result<(TrainingRequest, bool), RegistryError> {
        let force = self.force_update();

        let required = |field: Option<String>| -> Result<String, RegistryError> {
            match field {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(RegistryError::Validation(MISSING_PARAMETERS.into())),
            }
        };

        let id = required(self.id)?;
        let s3bucket = required(self.s3bucket)?;
        let training_object = required(self.training_object)?;

        let request = TrainingRequest {
            id,
            s3bucket,
            training_object,
            spacy_model: self.spacy_model.filter(|name| !name.trim().is_empty()),
            n_texts: positive("n_texts", self.n_texts, DEFAULT_N_TEXTS)?,
            n_iter: positive("n_iter", self.n_iter, DEFAULT_N_ITER)?,
        };
        request.validate()?;

        Ok((request, force))
    }
}

fn positive(name: &str, value: Option<i64>, default: u32) -> Result<u32, RegistryError> {
    match value {
        None => Ok(default),
        Some(n) if n > 0 => u32::try_from(n).map_err(|_| {
            RegistryError::Validation(format!("{} is out of range", name))
        }),
        Some(_) => Err(RegistryError::Validation(format!(
            "{} must be a positive integer",
            name
        ))),
    }
}
