//! Asynchronous fine-tuning job lifecycle.
//!
//! `submit` validates the prepared dataset, registers the job
//! (`Created` then immediately `Running`), and hands the run to a named
//! background thread so the call returns the job id without blocking
//! concurrent scoring. The run trains a private copy of the base model;
//! on success the best snapshot is registered under the job id, on any
//! error the job is marked `Failed` and the serving path is untouched.
//! No cancellation of an in-flight job is supported.

mod registry;

pub use registry::{JobRegistry, JobSnapshot, JobState};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use uuid::Uuid;

use crate::config::TrainConfig;
use crate::data::Dataset;
use crate::error::{Result, SugerirError};
use crate::model::HybridRanker;
use crate::train;

/// Orchestrates background fine-tuning runs against a shared registry.
#[derive(Debug)]
pub struct FineTuneManager {
    base: Arc<HybridRanker>,
    registry: Arc<JobRegistry>,
    config: TrainConfig,
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl FineTuneManager {
    /// Create a manager training copies of `base` and publishing into
    /// `registry`.
    #[must_use]
    pub fn new(base: Arc<HybridRanker>, registry: Arc<JobRegistry>) -> Self {
        Self {
            base,
            registry,
            config: TrainConfig::default(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the training configuration.
    #[must_use]
    pub fn with_config(mut self, config: TrainConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry this manager publishes into.
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Submit a fine-tuning run over preprocessed data.
    ///
    /// Fails fast, before any thread is spawned, when the antecedent
    /// preprocessing step has not produced data, or when the data
    /// violates the model contract.
    ///
    /// # Errors
    ///
    /// `PreconditionFailed` for missing data, the usual contract errors
    /// for invalid rows, `Other` if the thread cannot be spawned.
    pub fn submit(&self, data: Dataset) -> Result<String> {
        if data.is_empty() {
            return Err(SugerirError::PreconditionFailed {
                message: "run preprocessing first".to_string(),
            });
        }
        self.config.validate()?;
        data.validate(self.base.config())?;

        let job_id = Uuid::new_v4().simple().to_string();
        self.registry.create(&job_id);
        self.registry.mark_running(&job_id);
        tracing::info!(job_id = %job_id, rows = data.len(), "fine-tune job submitted");

        let base = Arc::clone(&self.base);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        let thread_job_id = job_id.clone();

        let handle = thread::Builder::new()
            .name(format!("fine-tune-{job_id}"))
            .spawn(move || match train::fine_tune(&base, &data, &config) {
                Ok((model, report)) => {
                    tracing::info!(
                        job_id = %thread_job_id,
                        best_auc = report.best_auc,
                        "fine-tune job succeeded"
                    );
                    registry.complete(&thread_job_id, Arc::new(model), report.best_auc);
                }
                Err(err) => {
                    tracing::error!(job_id = %thread_job_id, error = %err, "fine-tune job failed");
                    registry.fail(&thread_job_id, err.to_string());
                }
            })
            .map_err(|e| SugerirError::Other(format!("failed to spawn fine-tune thread: {e}")))?;

        self.handles
            .lock()
            .expect("job handle lock poisoned")
            .insert(job_id.clone(), handle);
        Ok(job_id)
    }

    /// Snapshot of a job, if known.
    #[must_use]
    pub fn get_job(&self, id: &str) -> Option<JobSnapshot> {
        self.registry.get_job(id)
    }

    /// Block until the given job's thread finishes. Used by callers
    /// that need a completed result (tests, graceful shutdown).
    pub fn join(&self, id: &str) {
        let handle = self
            .handles
            .lock()
            .expect("job handle lock poisoned")
            .remove(id);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
