//! Affect score and running aggregate types

use serde::{Deserialize, Serialize};

/// One frame's emotional tone as produced by the affect model.
///
/// No numeric range is guaranteed by the model contract; bounds are pinned
/// by integration testing against a specific model build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectScore {
    pub valence: f32,
    pub arousal: f32,
}

/// Running per-conversation aggregate.
///
/// `valence` and `arousal` are SUMS, not means; consumers divide by `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectAggregate {
    /// Conversation identifier (aggregate key)
    pub conversation_id: String,
    /// Sum of valence scores
    pub valence: f64,
    /// Sum of arousal scores
    pub arousal: f64,
    /// Number of scored frames
    pub count: i64,
    /// Per-frame valence history in call order
    pub valence_all: Vec<f64>,
    /// Per-frame arousal history in call order
    pub arousal_all: Vec<f64>,
}
