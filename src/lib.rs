mod config;
mod error;
mod model;
mod prediction;
pub mod queue;
mod registry;
mod service;
mod store;
mod training;

#[cfg(feature = "http")]
pub mod http;

pub use config::ServiceConfig;
pub use error::RegistryError;
pub use model::{
    CreateModelInput, ForceFlag, ModelRecord, ModelStatus, TrainingRequest, Transition,
    DEFAULT_N_ITER, DEFAULT_N_TEXTS, PARTITION_KEY,
};
pub use prediction::{
    rank, HashScorer, LabelScore, LabelSet, PredictionInput, PredictionRequest,
    PredictionResponse, PredictionService, ScoringError, ScoringRoutine, TopN, DEFAULT_LABELS,
    DEFAULT_N_TOP,
};
pub use queue::{InMemoryJobQueue, Job, JobListener, JobSender, QueueError};
pub use registry::{ModelEntry, ModelRegistry, PutOutcome};
pub use service::{InMemoryModelService, ModelService};
pub use store::{InMemoryRecordStore, PutCondition, RecordStore, StoreError};
pub use training::{
    ImmediateTrainer, JobOutcome, TrainingFailure, TrainingJob, TrainingOrchestrator,
    TrainingRoutine, TrainingTicket, TrainingWorker, TrainingWorkerPool, WorkerStats,
    TRAINING_STARTED, TRAIN_JOB_TYPE,
};
