//! The hybrid scoring model.
//!
//! Three pieces, mirroring the two-tower-plus-gate architecture:
//!
//! - [`InterestEncoder`]: the collaborative tower. Embeds a user's item
//!   history, runs a GRU over it, and evolves an interest state whose
//!   per-step updates are scaled by attention against the target item.
//!   Frozen during fine-tuning.
//! - [`ContentTower`]: the content tower. Maps a static feature vector
//!   to a hidden representation. Adaptive during fine-tuning.
//! - [`HybridRanker`]: gates the collaborative signal, fuses it with the
//!   content representation, and produces the click probability. The
//!   public scoring surface of the crate.

mod content;
mod fusion;
mod interest;

pub use content::{ContentCache, ContentTower};
pub use fusion::{AdaptiveState, HybridRanker, TrainBatch, TrainCache};
pub use interest::{CollabSignal, InterestEncoder};
