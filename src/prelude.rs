//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use sugerir::prelude::*;
//! ```

pub use crate::config::{ModelConfig, RetrievalConfig, TrainConfig};
pub use crate::data::{pad_history, Dataset, FeatureTable, Interaction};
pub use crate::error::{Result, SugerirError};
pub use crate::jobs::{FineTuneManager, JobRegistry, JobSnapshot, JobState};
pub use crate::metrics::{accuracy, roc_auc_score};
pub use crate::model::HybridRanker;
pub use crate::primitives::{Matrix, Vector};
pub use crate::retrieve::{HybridRetriever, Recommendation};
pub use crate::train::{evaluate, fine_tune, TrainReport};
