//! Progress-based decay of mastered concepts.
//!
//! Decay is a function of how many problems the learner has worked since
//! the concept was mastered (or last cleanly reviewed), not of elapsed
//! wall-clock time. A learner away for a month comes back exactly where
//! they left off.

use crate::config::DecayParams;
use crate::types::FamilyMasteryRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decay for one record at the learner's current stream position.
/// Returns 0.0 for anything not yet mastered.
pub fn progress_decay(record: &FamilyMasteryRecord, current_index: u32, params: &DecayParams) -> f64 {
    // A clean review resets the clock; otherwise count from mastery.
    let reference = match record.last_reviewed_at_index.or(record.mastered_at_index) {
        Some(idx) if record.is_mastered => idx,
        _ => return 0.0,
    };
    let elapsed = current_index.saturating_sub(reference) as f64;
    let mut decay = elapsed * params.rate_per_problem;
    if record.used_help_on_mastery {
        decay *= params.struggle_multiplier;
    }
    decay.clamp(0.0, params.max_decay)
}

pub fn is_due_for_review(decay: f64, params: &DecayParams) -> bool {
    decay >= params.review_threshold
}

/// A mastered concept that has decayed past the review threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCandidate {
    pub family_id: String,
    pub decay: f64,
}

/// All concepts currently due for review, most-decayed first. Ties break
/// on family id so the ordering is fully deterministic.
pub fn review_candidates(
    records: &HashMap<String, FamilyMasteryRecord>,
    current_index: u32,
    params: &DecayParams,
) -> Vec<ReviewCandidate> {
    let mut due: Vec<ReviewCandidate> = records
        .values()
        .filter(|r| r.is_mastered)
        .filter_map(|r| {
            let decay = progress_decay(r, current_index, params);
            is_due_for_review(decay, params).then(|| ReviewCandidate {
                family_id: r.family_id.clone(),
                decay,
            })
        })
        .collect();
    due.sort_by(|a, b| {
        b.decay
            .total_cmp(&a.decay)
            .then_with(|| a.family_id.cmp(&b.family_id))
    });
    due
}
