//! The orchestrator tying the pieces together.
//!
//! `MasteryEngine` owns the catalog, the dependency graph, the policy
//! config, the per-learner store and an optional snapshot store. One
//! call to `process_attempt` runs the whole pipeline: score the attempt,
//! decide mastery, update the record, run the queue state machine, apply
//! the mutation atomically and persist a snapshot.

use crate::config::MasteryConfig;
use crate::decay::{self, ReviewCandidate};
use crate::graph::DependencyGraph;
use crate::persistence::{SnapshotError, SnapshotStore};
use crate::queue::AdaptiveQueueManager;
use crate::store::{LearnerState, MasteryStore, RecordPatch};
use crate::struggle::StruggleAnalyzer;
use crate::types::{
    now_ms, AdaptiveLearningQueue, ConceptFamily, FamilyMasteryRecord, FamilyStatus, HintEvent,
    LearningPhase, ProblemVariation, QueueReason, VariationAttempt,
};
use crate::variation;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MasteryError {
    #[error("unknown concept family: {0}")]
    UnknownFamily(String),
    #[error("learner not initialized: {0}")]
    UnknownLearner(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What the grading layer hands over once an attempt is finished. The
/// engine derives everything else (attempt number, qualification,
/// struggle score) itself.
#[derive(Debug, Clone)]
pub struct AttemptInput {
    pub family_id: String,
    pub variation_id: String,
    pub problem_id: String,
    pub phase: LearningPhase,
    pub passed: bool,
    pub time_ms: i64,
    pub hints_used: u32,
    pub submission_attempts: u32,
    pub hint_trace: Vec<HintEvent>,
}

/// Everything the UI needs to narrate what just happened.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub attempt: VariationAttempt,
    pub status: FamilyStatus,
    pub newly_mastered: bool,
    pub struggle_reasons: Vec<String>,
    pub queue_changed: bool,
    pub inserted_prerequisites: Vec<String>,
    pub resumed_families: Vec<String>,
    pub paused_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextKind {
    /// A mastered concept due for review; reviews preempt new content.
    Review { decay: f64 },
    Queue { reason: QueueReason },
}

#[derive(Debug, Clone)]
pub struct NextExercise {
    pub family_id: String,
    pub variation: ProblemVariation,
    pub kind: NextKind,
}

pub struct MasteryEngine {
    config: MasteryConfig,
    catalog: Vec<ConceptFamily>,
    by_id: HashMap<String, usize>,
    graph: DependencyGraph,
    analyzer: StruggleAnalyzer,
    store: MasteryStore,
    persistence: Option<Box<dyn SnapshotStore>>,
}

impl MasteryEngine {
    pub fn new(config: MasteryConfig, catalog: Vec<ConceptFamily>) -> Self {
        let graph = DependencyGraph::build(&catalog);
        let by_id = catalog
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.clone(), i))
            .collect();
        let analyzer = StruggleAnalyzer::new(config.struggle.clone());
        Self {
            config,
            catalog,
            by_id,
            graph,
            analyzer,
            store: MasteryStore::new(),
            persistence: None,
        }
    }

    pub fn with_persistence(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.persistence = Some(store);
        self
    }

    pub fn config(&self) -> &MasteryConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    fn family(&self, family_id: &str) -> Result<&ConceptFamily, MasteryError> {
        self.by_id
            .get(family_id)
            .map(|&i| &self.catalog[i])
            .ok_or_else(|| MasteryError::UnknownFamily(family_id.to_string()))
    }

    /// Load the learner's snapshot if one exists, then seed/migrate the
    /// queue against the current catalog. Idempotent.
    pub fn init_learner(&self, learner_id: &str) -> Result<(), MasteryError> {
        if !self.store.contains(learner_id) {
            if let Some(persistence) = &self.persistence {
                if let Some(state) = persistence.load(learner_id)? {
                    tracing::debug!(learner_id, "restored learner snapshot");
                    self.store.restore(learner_id, state);
                }
            }
        }
        self.store.initialize(learner_id, &self.catalog);
        self.save_snapshot(learner_id);
        Ok(())
    }

    /// Run the full pipeline for one finished attempt.
    pub fn process_attempt(
        &self,
        learner_id: &str,
        input: AttemptInput,
    ) -> Result<AttemptOutcome, MasteryError> {
        self.family(&input.family_id)?;
        self.init_learner(learner_id)?;

        let (records, queue_state, current_index) = self
            .store
            .with_state(learner_id, |s| {
                (s.family_records.clone(), s.queue.clone(), s.problem_index)
            })
            .ok_or_else(|| MasteryError::UnknownLearner(learner_id.to_string()))?;
        let record = records
            .get(&input.family_id)
            .cloned()
            .unwrap_or_else(|| FamilyMasteryRecord::new(&input.family_id));

        let attempt_number = record.attempts_for(&input.variation_id) + 1;
        let is_first_attempt = attempt_number == 1;
        let criteria = &self.config.mastery;
        let qualifies_for_mastery = input.passed
            && is_first_attempt
            && input.phase == LearningPhase::MasteryChallenge
            && input.time_ms <= criteria.max_time_ms
            && input.hints_used <= criteria.max_hints
            && input.submission_attempts <= criteria.max_submissions;

        let mut attempt = VariationAttempt {
            variation_id: input.variation_id.clone(),
            problem_id: input.problem_id.clone(),
            attempt_number,
            timestamp: now_ms(),
            phase: input.phase,
            time_ms: input.time_ms,
            hints_used: input.hints_used,
            passed: input.passed,
            submission_attempts: input.submission_attempts,
            is_first_attempt,
            qualifies_for_mastery,
            struggle_score: 0,
            hint_trace: input.hint_trace.clone(),
            triggered_prerequisites: Vec::new(),
            triggered_learning_return: false,
        };
        attempt.struggle_score = self.analyzer.score(&attempt);
        let struggle_reasons = self.analyzer.reasons(&attempt);
        let intervention_fired =
            !qualifies_for_mastery && self.analyzer.triggers_intervention(attempt.struggle_score);

        let manager = AdaptiveQueueManager::new(&self.graph, &self.config);
        let decision =
            manager.on_attempt_complete(&attempt, &input.family_id, &queue_state, &records);

        attempt.triggered_prerequisites = decision.inserted_prerequisites.clone();
        attempt.triggered_learning_return = intervention_fired && decision.paused.is_none();

        let newly_mastered = qualifies_for_mastery && !record.is_mastered;
        let status = self.next_status(&input, &record, &attempt, newly_mastered, &decision);

        let mut patch = RecordPatch {
            status: Some(status),
            ..Default::default()
        };
        if newly_mastered {
            patch.is_mastered = Some(true);
            patch.mastered_at = Some(attempt.timestamp);
            patch.mastered_at_index = Some(current_index);
            patch.used_help_on_mastery = Some(input.hints_used > 0);
        } else if record.is_mastered && input.passed {
            // Review of an already-mastered concept. A first-try pass
            // resets the decay clock; a harder-won pass leaves the
            // concept decayed and flags it for faster decay.
            if input.submission_attempts <= 1 {
                patch.last_reviewed_at_index = Some(current_index);
            } else {
                patch.used_help_on_mastery = Some(true);
            }
        }

        self.store
            .with_state_mut(learner_id, |state| {
                state.patch_record(&input.family_id, &patch);
                state.apply_attempt(&input.family_id, &attempt);
                if decision.changed {
                    state.queue = decision.queue.clone();
                }
                state.problem_index += 1;
            })
            .ok_or_else(|| MasteryError::UnknownLearner(learner_id.to_string()))?;
        self.save_snapshot(learner_id);

        tracing::debug!(
            learner_id,
            family_id = %input.family_id,
            score = attempt.struggle_score,
            qualifies = qualifies_for_mastery,
            status = status.as_str(),
            "attempt processed"
        );

        Ok(AttemptOutcome {
            attempt,
            status,
            newly_mastered,
            struggle_reasons,
            queue_changed: decision.changed,
            inserted_prerequisites: decision.inserted_prerequisites,
            resumed_families: decision.resumed,
            paused_family: decision.paused,
        })
    }

    fn next_status(
        &self,
        input: &AttemptInput,
        record: &FamilyMasteryRecord,
        attempt: &VariationAttempt,
        newly_mastered: bool,
        decision: &crate::queue::QueueDecision,
    ) -> FamilyStatus {
        if newly_mastered || record.is_mastered {
            FamilyStatus::Mastered
        } else if decision.paused.is_some() {
            FamilyStatus::Struggling
        } else if attempt.triggered_learning_return || input.phase.is_instructional() {
            FamilyStatus::Learning
        } else if input.phase == LearningPhase::PracticeProblem {
            if input.passed {
                FamilyStatus::ReadyForMastery
            } else {
                FamilyStatus::Learning
            }
        } else {
            FamilyStatus::Attempting
        }
    }

    /// What to show next: the most-decayed due review if any, otherwise
    /// the queue head. Reviews are mandatory before new content.
    pub fn next_exercise(&self, learner_id: &str) -> Option<NextExercise> {
        let (records, queue, index) = self.store.with_state(learner_id, |s| {
            (s.family_records.clone(), s.queue.clone(), s.problem_index)
        })?;

        for candidate in decay::review_candidates(&records, index, &self.config.decay) {
            let Ok(family) = self.family(&candidate.family_id) else {
                tracing::warn!(family_id = %candidate.family_id, "due review for a family missing from the catalog");
                continue;
            };
            let record = records
                .get(&candidate.family_id)
                .cloned()
                .unwrap_or_else(|| FamilyMasteryRecord::new(&candidate.family_id));
            if let Some(variation) = variation::select_next(family, &record) {
                return Some(NextExercise {
                    family_id: candidate.family_id.clone(),
                    variation: variation.clone(),
                    kind: NextKind::Review {
                        decay: candidate.decay,
                    },
                });
            }
        }

        for entry in &queue.queue {
            let Ok(family) = self.family(&entry.family_id) else {
                tracing::warn!(family_id = %entry.family_id, "queued family missing from the catalog, skipping");
                continue;
            };
            let record = records
                .get(&entry.family_id)
                .cloned()
                .unwrap_or_else(|| FamilyMasteryRecord::new(&entry.family_id));
            if let Some(variation) = variation::select_next(family, &record) {
                return Some(NextExercise {
                    family_id: entry.family_id.clone(),
                    variation: variation.clone(),
                    kind: NextKind::Queue {
                        reason: entry.reason,
                    },
                });
            }
        }
        None
    }

    /// Mastered concepts currently due for review, most decayed first.
    pub fn review_candidates(&self, learner_id: &str) -> Vec<ReviewCandidate> {
        self.store
            .with_state(learner_id, |s| {
                decay::review_candidates(&s.family_records, s.problem_index, &self.config.decay)
            })
            .unwrap_or_default()
    }

    pub fn queue_snapshot(&self, learner_id: &str) -> Option<AdaptiveLearningQueue> {
        self.store.with_state(learner_id, |s| s.queue.clone())
    }

    pub fn record(&self, learner_id: &str, family_id: &str) -> Option<FamilyMasteryRecord> {
        self.store.get_record(learner_id, family_id)
    }

    pub fn learner_snapshot(&self, learner_id: &str) -> Option<LearnerState> {
        self.store.snapshot(learner_id)
    }

    fn save_snapshot(&self, learner_id: &str) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let Some(state) = self.store.snapshot(learner_id) else {
            return;
        };
        if let Err(e) = persistence.save(learner_id, &state) {
            tracing::warn!(learner_id, error = %e, "failed to save learner snapshot");
        }
    }
}
