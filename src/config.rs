//! Policy constants for the scheduler, grouped per concern.
//!
//! Every knob lives in a param struct whose `Default` carries the
//! production value, so tests can tweak a single field without
//! restating the rest.

use serde::{Deserialize, Serialize};

/// Additive struggle-score weights and the thresholds that arm them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StruggleWeights {
    /// Points for failing the attempt outright.
    pub failed: u32,
    /// Points once `submission_attempts` exceeds `max_submissions`.
    pub excess_submissions: u32,
    /// Points once `hints_used` exceeds `max_hints`.
    pub heavy_hint_use: u32,
    /// Points once `time_ms` exceeds `slow_time_ms`.
    pub slow_completion: u32,
    /// Points per hint that left the learner still stuck.
    pub unresolved_hint_step: u32,
    /// Cap on the unresolved-hint contribution.
    pub unresolved_hint_cap: u32,
    /// Points if any hint in the trace was heavy-severity.
    pub deep_hint: u32,
    pub max_submissions: u32,
    pub max_hints: u32,
    pub slow_time_ms: i64,
    /// Scores at or above this trigger the prerequisite intervention.
    pub intervention_threshold: u8,
}

impl Default for StruggleWeights {
    fn default() -> Self {
        Self {
            failed: 30,
            excess_submissions: 25,
            heavy_hint_use: 20,
            slow_completion: 20,
            unresolved_hint_step: 10,
            unresolved_hint_cap: 20,
            deep_hint: 10,
            max_submissions: 2,
            max_hints: 1,
            slow_time_ms: 20 * 60 * 1000,
            intervention_threshold: 50,
        }
    }
}

impl StruggleWeights {
    pub fn triggers_intervention(&self, score: u8) -> bool {
        score >= self.intervention_threshold
    }
}

/// Progress-based decay of mastered concepts. Distance is measured in
/// problems worked since mastery (or since the last clean review), not
/// in wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayParams {
    pub rate_per_problem: f64,
    /// Extra decay speed for concepts mastered with help.
    pub struggle_multiplier: f64,
    pub max_decay: f64,
    /// Decay at or above this makes the concept due for review.
    pub review_threshold: f64,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            rate_per_problem: 0.05,
            struggle_multiplier: 1.4,
            max_decay: 0.8,
            review_threshold: 0.4,
        }
    }
}

/// What a mastery-challenge pass must look like to count as mastery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryCriteria {
    pub max_time_ms: i64,
    pub max_hints: u32,
    pub max_submissions: u32,
}

impl Default for MasteryCriteria {
    fn default() -> Self {
        Self {
            max_time_ms: 20 * 60 * 1000,
            max_hints: 1,
            max_submissions: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasteryConfig {
    pub struggle: StruggleWeights,
    pub decay: DecayParams,
    pub mastery: MasteryCriteria,
}
