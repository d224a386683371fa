use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Error when encoding or decoding a job payload.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("payload error: {message}")]
pub struct PayloadError {
    pub message: String,
}

/// A unit of work carried by the queue.
///
/// The payload is opaque bytes (bitcode for typed payloads). In its JSON form
/// the payload is base64-encoded so jobs can be dumped or forwarded through
/// text-based brokers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier (the task id handed back to clients).
    pub id: String,
    /// Job type, e.g. `"model.train"`.
    pub job_type: String,
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,
    /// Number of times this job has been handed to a listener.
    #[serde(default)]
    pub deliveries: u32,
}

mod payload_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(payload: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(payload).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl Job {
    pub fn new(id: impl Into<String>, job_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            payload,
            deliveries: 0,
        }
    }

    /// Create a job with a bitcode-serialized payload.
    pub fn encode<T: Serialize>(
        id: impl Into<String>,
        job_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, PayloadError> {
        let bytes = bitcode::serialize(payload).map_err(|e| PayloadError {
            message: e.to_string(),
        })?;
        Ok(Self::new(id, job_type, bytes))
    }

    /// Decode the payload from bitcode.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        bitcode::deserialize(&self.payload).map_err(|e| PayloadError {
            message: e.to_string(),
        })
    }

    pub fn with_string_payload(
        id: impl Into<String>,
        job_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(id, job_type, payload.into().into_bytes())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
