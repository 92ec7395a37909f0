//! In-memory job and model registry.
//!
//! A single injectable, thread-safe collaborator created at process
//! start. Job snapshots are updated through the lifecycle; the job-id to
//! model map is append-only (entries are never removed; eviction is
//! process restart). The registry also holds the
//! *active* serving model; installing a fine-tuned state is an atomic
//! `Arc` replacement, so concurrent readers see either the old or the
//! new state, never a partial one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SugerirError};
use crate::model::HybridRanker;

/// Lifecycle state of a fine-tune job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Accepted, not yet handed to the background thread.
    Created,
    /// Training in progress.
    Running,
    /// Finished; the resulting model is registered under the job id.
    Succeeded,
    /// Aborted; no model was registered, prior states are untouched.
    Failed,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    /// Job identifier
    pub id: String,
    /// Current lifecycle state
    pub state: JobState,
    /// Best validation AUC, present once the job succeeded
    pub best_auc: Option<f32>,
    /// Failure message, present once the job failed
    pub error: Option<String>,
}

#[derive(Debug)]
struct JobRecord {
    state: JobState,
    best_auc: Option<f32>,
    error: Option<String>,
}

/// Thread-safe registry of jobs, fine-tuned models, and the active
/// serving model.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
    models: RwLock<HashMap<String, Arc<HybridRanker>>>,
    active: RwLock<Arc<HybridRanker>>,
}

impl JobRegistry {
    /// Create a registry serving `base` until a fine-tuned state is
    /// installed.
    #[must_use]
    pub fn new(base: Arc<HybridRanker>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            models: RwLock::new(HashMap::new()),
            active: RwLock::new(base),
        }
    }

    pub(crate) fn create(&self, id: &str) {
        self.jobs
            .write()
            .expect("job registry lock poisoned")
            .insert(
                id.to_string(),
                JobRecord {
                    state: JobState::Created,
                    best_auc: None,
                    error: None,
                },
            );
    }

    pub(crate) fn mark_running(&self, id: &str) {
        if let Some(record) = self
            .jobs
            .write()
            .expect("job registry lock poisoned")
            .get_mut(id)
        {
            record.state = JobState::Running;
        }
    }

    pub(crate) fn complete(&self, id: &str, model: Arc<HybridRanker>, best_auc: f32) {
        self.models
            .write()
            .expect("job registry lock poisoned")
            .insert(id.to_string(), model);
        if let Some(record) = self
            .jobs
            .write()
            .expect("job registry lock poisoned")
            .get_mut(id)
        {
            record.state = JobState::Succeeded;
            record.best_auc = Some(best_auc);
        }
    }

    pub(crate) fn fail(&self, id: &str, message: String) {
        if let Some(record) = self
            .jobs
            .write()
            .expect("job registry lock poisoned")
            .get_mut(id)
        {
            record.state = JobState::Failed;
            record.error = Some(message);
        }
    }

    /// Snapshot of a job, if known.
    #[must_use]
    pub fn get_job(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .expect("job registry lock poisoned")
            .get(id)
            .map(|record| JobSnapshot {
                id: id.to_string(),
                state: record.state,
                best_auc: record.best_auc,
                error: record.error.clone(),
            })
    }

    /// The fine-tuned model of a succeeded job, if any.
    #[must_use]
    pub fn model(&self, id: &str) -> Option<Arc<HybridRanker>> {
        self.models
            .read()
            .expect("job registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// The currently active serving model.
    #[must_use]
    pub fn active(&self) -> Arc<HybridRanker> {
        Arc::clone(&self.active.read().expect("job registry lock poisoned"))
    }

    /// Atomically install a succeeded job's model as the active one.
    ///
    /// # Errors
    ///
    /// Returns `UnknownJob` when no model is registered under `id`.
    pub fn install(&self, id: &str) -> Result<()> {
        let model = self.model(id).ok_or_else(|| SugerirError::UnknownJob {
            id: id.to_string(),
        })?;
        *self.active.write().expect("job registry lock poisoned") = model;
        Ok(())
    }

    /// Number of jobs ever submitted.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.read().expect("job registry lock poisoned").len()
    }
}
