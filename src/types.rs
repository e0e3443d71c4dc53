//! Core data model for the adaptive mastery scheduler.
//!
//! Everything here serializes to the camelCase JSON shape the client
//! persists, so snapshots survive round-trips across the UI boundary
//! unchanged.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Current millisecond epoch timestamp.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum FamilyStatus {
    #[default]
    NotStarted,
    Learning,
    ReadyForMastery,
    Attempting,
    Struggling,
    Mastered,
}

impl FamilyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Learning => "learning",
            Self::ReadyForMastery => "ready-for-mastery",
            Self::Attempting => "attempting",
            Self::Struggling => "struggling",
            Self::Mastered => "mastered",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "learning" => Self::Learning,
            "ready-for-mastery" => Self::ReadyForMastery,
            "attempting" => Self::Attempting,
            "struggling" => Self::Struggling,
            "mastered" => Self::Mastered,
            _ => Self::NotStarted,
        }
    }
}

/// Stage of the learn-then-prove progression a single attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningPhase {
    ConceptExplanation,
    GuidedWalkthrough,
    TemplateStudy,
    PracticeProblem,
    MasteryChallenge,
}

impl LearningPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConceptExplanation => "concept-explanation",
            Self::GuidedWalkthrough => "guided-walkthrough",
            Self::TemplateStudy => "template-study",
            Self::PracticeProblem => "practice-problem",
            Self::MasteryChallenge => "mastery-challenge",
        }
    }

    /// Phases that present learning material rather than grade the learner.
    pub fn is_instructional(&self) -> bool {
        matches!(
            self,
            Self::ConceptExplanation | Self::GuidedWalkthrough | Self::TemplateStudy
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Why a family sits in the active queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueReason {
    NextInSequence,
    PrerequisiteNeeded,
    RetryAfterPrereqs,
}

impl QueueReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextInSequence => "next-in-sequence",
            Self::PrerequisiteNeeded => "prerequisite-needed",
            Self::RetryAfterPrereqs => "retry-after-prereqs",
        }
    }
}

/// Kind of queue mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueAction {
    InsertPrereqs,
    ResumePaused,
    MarkMastered,
    Reorder,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertPrereqs => "insert-prereqs",
            Self::ResumePaused => "resume-paused",
            Self::MarkMastered => "mark-mastered",
            Self::Reorder => "reorder",
        }
    }
}

/// How deep an individual hint went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintSeverity {
    Light,
    Medium,
    Heavy,
}

/// Whether a hint actually unblocked the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintResolution {
    Helped,
    StillStuck,
    Pending,
}

/// One hint shown during an attempt, with its observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintEvent {
    pub severity: HintSeverity,
    pub resolution: HintResolution,
}

/// A concrete exercise within a family. `order` drives unseen-first
/// selection; lower comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemVariation {
    pub id: String,
    pub problem_id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub order: u32,
}

/// A group of interchangeable problem variations teaching one concept.
///
/// `module_id` is fractional on purpose: the course interleaves half-step
/// modules (0.5, 4.5, 8.5) between the integer ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptFamily {
    pub id: String,
    pub name: String,
    pub tier: u8,
    pub module_id: f64,
    pub variations: Vec<ProblemVariation>,
}

/// Immutable log entry for one graded attempt at a variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationAttempt {
    pub variation_id: String,
    pub problem_id: String,
    /// 1-based, per variation.
    pub attempt_number: u32,
    pub timestamp: i64,
    pub phase: LearningPhase,
    pub time_ms: i64,
    pub hints_used: u32,
    pub passed: bool,
    pub submission_attempts: u32,
    pub is_first_attempt: bool,
    pub qualifies_for_mastery: bool,
    /// Frozen at grading time; never recomputed.
    pub struggle_score: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hint_trace: Vec<HintEvent>,
    /// Prerequisites the intervention spliced in because of this attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggered_prerequisites: Vec<String>,
    /// Intervention fired but there was nothing left to insert, so the
    /// learner was routed back to learning material.
    #[serde(default)]
    pub triggered_learning_return: bool,
}

/// Everything the scheduler knows about one learner x one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMasteryRecord {
    pub family_id: String,
    pub status: FamilyStatus,
    /// Sticky: once true it never reverts, regardless of later failures.
    pub is_mastered: bool,
    pub mastered_at: Option<i64>,
    /// Position in the learner's problem stream when mastery happened.
    pub mastered_at_index: Option<u32>,
    /// Advanced only by a clean (first-try) review pass.
    pub last_reviewed_at_index: Option<u32>,
    /// Mastered, but with hints or remedial help along the way; such
    /// concepts decay faster.
    pub used_help_on_mastery: bool,
    pub used_variations: BTreeSet<String>,
    pub attempts: Vec<VariationAttempt>,
    pub total_attempts: u32,
    pub total_time_spent_ms: i64,
    pub best_time_ms: Option<i64>,
    pub total_hints_used: u32,
}

impl FamilyMasteryRecord {
    pub fn new(family_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            status: FamilyStatus::NotStarted,
            is_mastered: false,
            mastered_at: None,
            mastered_at_index: None,
            last_reviewed_at_index: None,
            used_help_on_mastery: false,
            used_variations: BTreeSet::new(),
            attempts: Vec::new(),
            total_attempts: 0,
            total_time_spent_ms: 0,
            best_time_ms: None,
            total_hints_used: 0,
        }
    }

    /// Attempts already made against one specific variation.
    pub fn attempts_for(&self, variation_id: &str) -> u32 {
        self.attempts
            .iter()
            .filter(|a| a.variation_id == variation_id)
            .count() as u32
    }
}

/// One slot in the active queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedFamily {
    pub family_id: String,
    /// Advisory rank recorded at insertion; order of the `queue` vec is
    /// what actually schedules.
    pub priority: u32,
    pub reason: QueueReason,
    pub added_at: i64,
}

/// A family set aside until its prerequisites are mastered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedFamily {
    pub family_id: String,
    pub paused_at: i64,
    /// Unmet prerequisites captured at pause time.
    pub required_prerequisites: Vec<String>,
    /// prerequisite id -> mastered since the pause.
    pub prereq_progress: BTreeMap<String, bool>,
}

impl PausedFamily {
    pub fn new(family_id: impl Into<String>, prerequisites: Vec<String>, paused_at: i64) -> Self {
        let prereq_progress = prerequisites.iter().map(|p| (p.clone(), false)).collect();
        Self {
            family_id: family_id.into(),
            paused_at,
            required_prerequisites: prerequisites,
            prereq_progress,
        }
    }
}

/// Append-only audit entry; written on every structural queue change,
/// never read back by the scheduler itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueModification {
    pub id: Uuid,
    pub timestamp: i64,
    pub action: QueueAction,
    pub affected_families: Vec<String>,
    pub reason: String,
}

impl QueueModification {
    pub fn new(action: QueueAction, affected: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now_ms(),
            action,
            affected_families: affected,
            reason: reason.into(),
        }
    }
}

/// The scheduling state for one learner: what's up next, what's parked,
/// and how it got that way.
///
/// Invariant: a family id appears at most once across `queue` and
/// `paused_families` combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveLearningQueue {
    pub queue: Vec<QueuedFamily>,
    pub paused_families: Vec<PausedFamily>,
    pub queue_history: Vec<QueueModification>,
}

impl AdaptiveLearningQueue {
    pub fn head(&self) -> Option<&QueuedFamily> {
        self.queue.first()
    }

    pub fn contains(&self, family_id: &str) -> bool {
        self.queue.iter().any(|q| q.family_id == family_id)
    }

    pub fn position(&self, family_id: &str) -> Option<usize> {
        self.queue.iter().position(|q| q.family_id == family_id)
    }

    pub fn is_paused(&self, family_id: &str) -> bool {
        self.paused_families.iter().any(|p| p.family_id == family_id)
    }

    pub fn paused_entry(&self, family_id: &str) -> Option<&PausedFamily> {
        self.paused_families.iter().find(|p| p.family_id == family_id)
    }

    /// Remove a family from the active queue, returning its slot if it
    /// was present.
    pub fn remove(&mut self, family_id: &str) -> Option<QueuedFamily> {
        self.position(family_id).map(|i| self.queue.remove(i))
    }
}
