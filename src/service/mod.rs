//! Model service - the registry, orchestrator and prediction service wired
//! together from a [`ServiceConfig`].
//!
//! This is what a transport (the HTTP router, a test, the server binary)
//! holds on to. Every operation goes straight through to the component that
//! owns it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use textcat_registry::{ImmediateTrainer, ModelService, ServiceConfig};
//!
//! let service = ModelService::in_memory(&ServiceConfig::default());
//! let pool = service.spawn_workers(ImmediateTrainer, service.sender().clone())?;
//!
//! let ticket = service.create_model(serde_json::from_str(
//!     r#"{"id": "tc-01", "s3bucket": "albert-textcats", "training_object": "trainingSet.json"}"#,
//! )?)?;
//!
//! let stats = pool.stop();
//! ```

use std::io;
use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::error::RegistryError;
use crate::model::{CreateModelInput, ModelRecord};
use crate::prediction::{
    HashScorer, LabelScore, PredictionInput, PredictionResponse, PredictionService,
    ScoringRoutine,
};
use crate::queue::{InMemoryJobQueue, JobListener, JobSender};
use crate::registry::{ModelEntry, ModelRegistry};
use crate::store::{InMemoryRecordStore, RecordStore};
use crate::training::{
    TrainingOrchestrator, TrainingRoutine, TrainingTicket, TrainingWorker, TrainingWorkerPool,
};

/// The service as the server binary and tests run it.
pub type InMemoryModelService = ModelService<InMemoryRecordStore, InMemoryJobQueue, HashScorer>;

/// Every registry operation behind one handle.
pub struct ModelService<S, Q, C> {
    orchestrator: TrainingOrchestrator<S, Q>,
    prediction: PredictionService<S, C>,
    config: ServiceConfig,
}

impl<S, Q, C> ModelService<S, Q, C>
where
    S: RecordStore + Clone,
    Q: JobSender,
    C: ScoringRoutine,
{
    pub fn new(store: S, sender: Q, scorer: C, config: &ServiceConfig) -> Self {
        let orchestrator = TrainingOrchestrator::new(
            ModelRegistry::new(store.clone()),
            sender,
            config.queue_name.clone(),
        );
        let prediction = PredictionService::new(
            ModelRegistry::new(store),
            scorer,
            config.labels.clone(),
        )
        .with_default_n_top(config.default_n_top)
        .require_active(config.require_active_model);

        Self {
            orchestrator,
            prediction,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry<S> {
        self.orchestrator.registry()
    }

    pub fn orchestrator(&self) -> &TrainingOrchestrator<S, Q> {
        &self.orchestrator
    }

    pub fn prediction(&self) -> &PredictionService<S, C> {
        &self.prediction
    }

    /// Validate a create request, write the record and queue training.
    pub fn create_model(&self, input: CreateModelInput) -> Result<TrainingTicket, RegistryError> {
        self.orchestrator.submit(input)
    }

    pub fn get_model(&self, id: &str) -> Result<ModelEntry, RegistryError> {
        self.registry().describe(id)
    }

    pub fn list_models(&self) -> Result<Vec<ModelEntry>, RegistryError> {
        self.registry().list()
    }

    pub fn delete_model(&self, id: &str) -> Result<ModelRecord, RegistryError> {
        self.registry().delete(id)
    }

    pub fn predict(&self, input: PredictionInput) -> Result<PredictionResponse, RegistryError> {
        self.prediction.predict_input(input)
    }

    /// Rank labels for `text` against `model_id`.
    pub fn rank(
        &self,
        model_id: &str,
        text: &str,
        n_top: Option<usize>,
    ) -> Result<Vec<LabelScore>, RegistryError> {
        self.prediction.predict(model_id, text, n_top)
    }

    /// Start `worker_count` training workers on the configured queue.
    pub fn spawn_workers<T, L>(&self, routine: T, listener: L) -> io::Result<TrainingWorkerPool>
    where
        S: 'static,
        T: TrainingRoutine + 'static,
        L: JobListener + Clone + 'static,
    {
        let worker = Arc::new(TrainingWorker::new(self.registry().clone(), routine));
        let pool = TrainingWorkerPool::spawn(
            worker,
            &self.config.queue_name,
            listener,
            self.config.worker_count,
            self.config.poll_interval(),
        )?;
        info!(queue = %self.config.queue_name, workers = pool.size(), "training workers started");
        Ok(pool)
    }
}

impl<S, Q, C> ModelService<S, Q, C> {
    pub fn sender(&self) -> &Q {
        self.orchestrator.sender()
    }
}

impl InMemoryModelService {
    /// In-memory store and queue with the hash scorer.
    pub fn in_memory(config: &ServiceConfig) -> Self {
        Self::new(
            InMemoryRecordStore::new(),
            InMemoryJobQueue::new(),
            HashScorer,
            config,
        )
    }
}
