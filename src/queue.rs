//! The queue state machine: what happens to the learner's queue when an
//! attempt finishes.
//!
//! `on_attempt_complete` is a pure function over the old queue state; it
//! never mutates its inputs and never performs I/O, so every decision is
//! replayable from the attempt log.

use crate::config::MasteryConfig;
use crate::graph::DependencyGraph;
use crate::types::{
    now_ms, AdaptiveLearningQueue, FamilyMasteryRecord, PausedFamily, QueueAction,
    QueueModification, QueueReason, QueuedFamily, VariationAttempt,
};
use std::collections::HashMap;

/// Outcome of one queue evaluation: the next state plus what changed,
/// so the caller can narrate it without diffing queues.
#[derive(Debug, Clone)]
pub struct QueueDecision {
    pub queue: AdaptiveLearningQueue,
    pub changed: bool,
    /// Families moved out of `paused_families` back into the queue.
    pub resumed: Vec<String>,
    /// Prerequisites newly spliced into the queue front.
    pub inserted_prerequisites: Vec<String>,
    /// The family that was paused behind its prerequisites, if any.
    pub paused: Option<String>,
}

impl QueueDecision {
    fn unchanged(queue: &AdaptiveLearningQueue) -> Self {
        Self {
            queue: queue.clone(),
            changed: false,
            resumed: Vec::new(),
            inserted_prerequisites: Vec::new(),
            paused: None,
        }
    }
}

pub struct AdaptiveQueueManager<'a> {
    graph: &'a DependencyGraph,
    config: &'a MasteryConfig,
}

impl<'a> AdaptiveQueueManager<'a> {
    pub fn new(graph: &'a DependencyGraph, config: &'a MasteryConfig) -> Self {
        Self { graph, config }
    }

    /// Evaluate a finished attempt against the queue. Exactly one of
    /// three things happens: the family graduates (mastery), the family
    /// is paused behind unmet prerequisites (major struggle), or the
    /// queue is left untouched.
    pub fn on_attempt_complete(
        &self,
        attempt: &VariationAttempt,
        family_id: &str,
        queue_state: &AdaptiveLearningQueue,
        records: &HashMap<String, FamilyMasteryRecord>,
    ) -> QueueDecision {
        if attempt.qualifies_for_mastery {
            self.on_mastery(family_id, queue_state, records)
        } else if self.config.struggle.triggers_intervention(attempt.struggle_score) {
            self.on_major_struggle(family_id, queue_state, records)
        } else {
            QueueDecision::unchanged(queue_state)
        }
    }

    fn on_mastery(
        &self,
        family_id: &str,
        queue_state: &AdaptiveLearningQueue,
        records: &HashMap<String, FamilyMasteryRecord>,
    ) -> QueueDecision {
        let mut next = queue_state.clone();
        let now = now_ms();
        let mut changed = false;

        if next.remove(family_id).is_some() {
            changed = true;
            next.queue_history.push(QueueModification::new(
                QueueAction::MarkMastered,
                vec![family_id.to_string()],
                format!("{family_id} mastered, graduated from the queue"),
            ));
            tracing::info!(family_id, "family graduated from the queue");
        }

        // The freshly mastered family counts as met even if the caller
        // has not written its record back yet.
        let is_met = |id: &str| {
            id == family_id || records.get(id).map(|r| r.is_mastered).unwrap_or(false)
        };

        let mut resumed = Vec::new();
        let mut still_paused = Vec::new();
        for mut paused in std::mem::take(&mut next.paused_families) {
            if paused.required_prerequisites.iter().any(|p| p == family_id) {
                paused
                    .prereq_progress
                    .insert(family_id.to_string(), true);
                changed = true;
            }
            if paused.required_prerequisites.iter().all(|p| is_met(p)) {
                resumed.push(paused.family_id);
            } else {
                still_paused.push(paused);
            }
        }
        next.paused_families = still_paused;

        if !resumed.is_empty() {
            changed = true;
            for (i, fid) in resumed.iter().enumerate() {
                next.queue.insert(
                    i,
                    QueuedFamily {
                        family_id: fid.clone(),
                        // Highest urgency: a learner who was blocked
                        // resumes immediately once unblocked.
                        priority: 0,
                        reason: QueueReason::RetryAfterPrereqs,
                        added_at: now,
                    },
                );
            }
            next.queue_history.push(QueueModification::new(
                QueueAction::ResumePaused,
                resumed.clone(),
                "all prerequisites mastered, resuming at the queue front",
            ));
            tracing::info!(?resumed, "paused families resumed");
        }

        QueueDecision {
            queue: next,
            changed,
            resumed,
            inserted_prerequisites: Vec::new(),
            paused: None,
        }
    }

    fn on_major_struggle(
        &self,
        family_id: &str,
        queue_state: &AdaptiveLearningQueue,
        records: &HashMap<String, FamilyMasteryRecord>,
    ) -> QueueDecision {
        let Some(prerequisites) = self.graph.prerequisites(family_id) else {
            tracing::warn!(
                family_id,
                "struggling family missing from the dependency graph, leaving queue untouched"
            );
            return QueueDecision::unchanged(queue_state);
        };

        let unmet: Vec<String> = prerequisites
            .into_iter()
            .filter(|p| !records.get(p).map(|r| r.is_mastered).unwrap_or(false))
            .collect();
        if unmet.is_empty() {
            // Nothing left to remediate with; the caller routes the
            // learner back to learning material instead.
            return QueueDecision::unchanged(queue_state);
        }

        let mut next = queue_state.clone();
        let now = now_ms();

        next.remove(family_id);
        // Re-pausing overwrites: exactly one paused entry per family.
        next.paused_families.retain(|p| p.family_id != family_id);
        next.paused_families
            .push(PausedFamily::new(family_id, unmet.clone(), now));

        let mut inserted = Vec::new();
        let mut reordered = Vec::new();
        let mut insert_at = 0usize;
        for (rank, prereq) in unmet.iter().enumerate() {
            // A prerequisite that is itself paused stays paused; putting
            // it in the queue would have it in two places at once.
            if next.is_paused(prereq) {
                continue;
            }
            if let Some(pos) = next.position(prereq) {
                if pos != insert_at {
                    let entry = next.queue.remove(pos);
                    next.queue.insert(insert_at, entry);
                    reordered.push(prereq.clone());
                }
            } else {
                next.queue.insert(
                    insert_at,
                    QueuedFamily {
                        family_id: prereq.clone(),
                        priority: rank as u32,
                        reason: QueueReason::PrerequisiteNeeded,
                        added_at: now,
                    },
                );
                inserted.push(prereq.clone());
            }
            insert_at += 1;
        }

        if !inserted.is_empty() {
            next.queue_history.push(QueueModification::new(
                QueueAction::InsertPrereqs,
                inserted.clone(),
                format!("prerequisites inserted ahead of struggling {family_id}"),
            ));
        }
        if !reordered.is_empty() {
            next.queue_history.push(QueueModification::new(
                QueueAction::Reorder,
                reordered,
                format!("queued prerequisites moved ahead for {family_id}"),
            ));
        }
        tracing::info!(
            family_id,
            prerequisites = ?unmet,
            "family paused behind unmet prerequisites"
        );

        QueueDecision {
            queue: next,
            changed: true,
            resumed: Vec::new(),
            inserted_prerequisites: inserted,
            paused: Some(family_id.to_string()),
        }
    }
}
