use serde::Serialize;

use crate::model::{ModelRecord, ModelStatus, TrainingRequest};

/// A model as presented to clients: id, status and the decoded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub status: ModelStatus,
    /// The decoded training request, absent if the payload is malformed.
    pub data: Option<TrainingRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Why `data` could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
}

impl ModelEntry {
    pub fn from_record(record: ModelRecord) -> Self {
        let (data, decode_error) = match record.request() {
            Ok(request) => (Some(request), None),
            Err(e) => {
                tracing::warn!(model_id = %record.id, error = %e, "model payload is malformed");
                (None, Some(e.to_string()))
            }
        };

        Self {
            id: record.id,
            status: record.status,
            data,
            task_id: record.task_id,
            decode_error,
        }
    }
}
