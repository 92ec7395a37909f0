//! Sugerir: hybrid sequence-aware recommendation engine in pure Rust.
//!
//! Sugerir scores the likelihood that a user will engage with an item
//! and produces ranked top-K recommendations, blending a learned
//! sequence-aware neural model with nearest-neighbor collaborative
//! signals. Fine-tuning runs as a background job against an in-memory
//! model registry, so the serving path stays available while a new
//! state trains.
//!
//! # Quick Start
//!
//! ```
//! use sugerir::prelude::*;
//!
//! // 3 users, 4 items, feature width 3, history window 5.
//! let config = ModelConfig::new(3, 4, 3)
//!     .with_emb_dim(8)
//!     .with_hidden_dim(8)
//!     .with_seq_len(5);
//! let model = HybridRanker::with_seed(config, Some(42)).expect("valid config");
//!
//! // Score one (user, item, history, features) tuple. The pad token is
//! // 4 (one past the item range): user 0's history [1, 2] left-pads to
//! // [4, 4, 4, 1, 2].
//! let prob = model
//!     .score(0, 3, &[4, 4, 4, 1, 2], &[0.1, 0.2, 0.3])
//!     .expect("inputs satisfy the contract");
//! assert!((0.0..=1.0).contains(&prob));
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`config`]: Model, retrieval, and training configuration
//! - [`data`]: Interaction records, datasets, history padding, feature tables
//! - [`nn`]: Layers of the hybrid model (linear, batch norm, dropout, GRU/AUGRU)
//! - [`model`]: Interest encoder, content tower, and the fusion scoring head
//! - [`optim`]: Adam over the flattened adaptive parameter group
//! - [`metrics`]: ROC AUC and accuracy
//! - [`train`]: Fine-tuning loop with best-checkpoint retention
//! - [`retrieve`]: Hybrid top-K retrieval with cold-start handling
//! - [`jobs`]: Background fine-tune jobs and the model registry

pub mod config;
pub mod data;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod model;
pub mod nn;
pub mod optim;
pub mod prelude;
pub mod primitives;
pub mod retrieve;
pub mod train;

pub use error::{Result, SugerirError};
