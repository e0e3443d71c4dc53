//! In-process store of per-learner scheduling state.
//!
//! State is partitioned by learner id; nothing is ever shared between
//! learners. Mutations take the write lock for the duration of one
//! closure, so a record update and its queue change land together.

use crate::types::{
    AdaptiveLearningQueue, ConceptFamily, FamilyMasteryRecord, FamilyStatus, PausedFamily,
    QueueModification, QueueReason, QueuedFamily, VariationAttempt,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the scheduler tracks for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LearnerState {
    pub family_records: HashMap<String, FamilyMasteryRecord>,
    pub queue: AdaptiveLearningQueue,
    /// Ordinal position in the learner's problem stream; the decay
    /// model measures distance in these, not in wall-clock time.
    pub problem_index: u32,
    /// Derived; recomputed whenever a record changes.
    pub total_mastered: u32,
}

impl LearnerState {
    fn recount_mastered(&mut self) {
        self.total_mastered = self
            .family_records
            .values()
            .filter(|r| r.is_mastered)
            .count() as u32;
    }

    /// Apply a partial patch to one record, creating it if unseen.
    pub fn patch_record(&mut self, family_id: &str, patch: &RecordPatch) {
        let record = self
            .family_records
            .entry(family_id.to_string())
            .or_insert_with(|| FamilyMasteryRecord::new(family_id));
        patch.apply(record);
        self.recount_mastered();
    }

    /// Append an attempt to a record and roll up its aggregates.
    pub fn apply_attempt(&mut self, family_id: &str, attempt: &VariationAttempt) {
        let record = self
            .family_records
            .entry(family_id.to_string())
            .or_insert_with(|| FamilyMasteryRecord::new(family_id));
        record.used_variations.insert(attempt.variation_id.clone());
        record.total_attempts += 1;
        record.total_time_spent_ms += attempt.time_ms;
        record.total_hints_used += attempt.hints_used;
        if attempt.passed {
            record.best_time_ms = Some(match record.best_time_ms {
                Some(best) => best.min(attempt.time_ms),
                None => attempt.time_ms,
            });
        }
        record.attempts.push(attempt.clone());
    }
}

/// Partial update for one mastery record. Absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub status: Option<FamilyStatus>,
    pub is_mastered: Option<bool>,
    pub mastered_at: Option<i64>,
    pub mastered_at_index: Option<u32>,
    pub last_reviewed_at_index: Option<u32>,
    pub used_help_on_mastery: Option<bool>,
}

impl RecordPatch {
    fn apply(&self, record: &mut FamilyMasteryRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(mastered) = self.is_mastered {
            // Sticky: a patch can set mastery, never clear it.
            record.is_mastered = record.is_mastered || mastered;
        }
        if let Some(at) = self.mastered_at {
            record.mastered_at = Some(at);
        }
        if let Some(idx) = self.mastered_at_index {
            record.mastered_at_index = Some(idx);
        }
        if let Some(idx) = self.last_reviewed_at_index {
            record.last_reviewed_at_index = Some(idx);
        }
        if let Some(used) = self.used_help_on_mastery {
            record.used_help_on_mastery = used;
        }
    }
}

#[derive(Debug, Default)]
pub struct MasteryStore {
    learners: RwLock<HashMap<String, LearnerState>>,
}

impl MasteryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent per-learner setup. Seeds a record for every catalog
    /// family and appends to the queue any family that is neither
    /// queued, paused, nor already mastered — so a content update shows
    /// up for existing learners without disturbing their order. On a
    /// fresh learner this degenerates to seeding the whole queue sorted
    /// by tier, then module.
    pub fn initialize(&self, learner_id: &str, catalog: &[ConceptFamily]) {
        let mut learners = self.learners.write();
        let state = learners.entry(learner_id.to_string()).or_default();

        for family in catalog {
            state
                .family_records
                .entry(family.id.clone())
                .or_insert_with(|| FamilyMasteryRecord::new(family.id.clone()));
        }

        let mut missing: Vec<&ConceptFamily> = catalog
            .iter()
            .filter(|f| {
                !state.queue.contains(&f.id)
                    && !state.queue.is_paused(&f.id)
                    && !state
                        .family_records
                        .get(&f.id)
                        .map(|r| r.is_mastered)
                        .unwrap_or(false)
            })
            .collect();
        missing.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| a.module_id.total_cmp(&b.module_id))
                .then_with(|| a.id.cmp(&b.id))
        });
        if !missing.is_empty() {
            tracing::debug!(
                learner_id,
                count = missing.len(),
                "appending families to the queue"
            );
        }
        let now = crate::types::now_ms();
        for family in missing {
            let priority = state.queue.queue.len() as u32;
            state.queue.queue.push(QueuedFamily {
                family_id: family.id.clone(),
                priority,
                reason: QueueReason::NextInSequence,
                added_at: now,
            });
        }
        state.recount_mastered();
    }

    pub fn contains(&self, learner_id: &str) -> bool {
        self.learners.read().contains_key(learner_id)
    }

    /// Replace a learner's state wholesale, e.g. from a loaded snapshot.
    pub fn restore(&self, learner_id: &str, state: LearnerState) {
        self.learners.write().insert(learner_id.to_string(), state);
    }

    pub fn snapshot(&self, learner_id: &str) -> Option<LearnerState> {
        self.learners.read().get(learner_id).cloned()
    }

    pub fn get_record(&self, learner_id: &str, family_id: &str) -> Option<FamilyMasteryRecord> {
        self.learners
            .read()
            .get(learner_id)
            .and_then(|s| s.family_records.get(family_id).cloned())
    }

    /// Apply a partial patch to one record, creating it if unseen.
    pub fn update_record(&self, learner_id: &str, family_id: &str, patch: RecordPatch) {
        self.with_state_mut(learner_id, |state| state.patch_record(family_id, &patch));
    }

    /// Append an attempt to a record and roll up its aggregates.
    pub fn record_attempt(&self, learner_id: &str, family_id: &str, attempt: &VariationAttempt) {
        self.with_state_mut(learner_id, |state| state.apply_attempt(family_id, attempt));
    }

    pub fn set_queue(&self, learner_id: &str, queue: AdaptiveLearningQueue) {
        self.with_state_mut(learner_id, |state| state.queue = queue);
    }

    pub fn set_paused(&self, learner_id: &str, paused: Vec<PausedFamily>) {
        self.with_state_mut(learner_id, |state| state.queue.paused_families = paused);
    }

    pub fn append_history(&self, learner_id: &str, entry: QueueModification) {
        self.with_state_mut(learner_id, |state| state.queue.queue_history.push(entry));
    }

    pub fn problem_index(&self, learner_id: &str) -> u32 {
        self.learners
            .read()
            .get(learner_id)
            .map(|s| s.problem_index)
            .unwrap_or(0)
    }

    pub fn with_state<R>(&self, learner_id: &str, f: impl FnOnce(&LearnerState) -> R) -> Option<R> {
        self.learners.read().get(learner_id).map(f)
    }

    pub fn with_state_mut<R>(
        &self,
        learner_id: &str,
        f: impl FnOnce(&mut LearnerState) -> R,
    ) -> Option<R> {
        self.learners.write().get_mut(learner_id).map(f)
    }
}
