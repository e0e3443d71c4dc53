//! Adaptive mastery scheduling for a problem-based curriculum.
//!
//! The crate decides what a learner works on next: it scores each
//! finished attempt for struggle, pauses concepts behind unmet
//! prerequisites when the learner is drowning, resumes them when the
//! prerequisites are mastered, and resurfaces mastered concepts for
//! review as they decay with practice distance. It is a pure scheduling
//! core: grading, rendering and content live elsewhere and talk to it
//! through [`engine::MasteryEngine`].

pub mod config;
pub mod decay;
pub mod engine;
pub mod graph;
pub mod persistence;
pub mod queue;
pub mod store;
pub mod struggle;
pub mod types;
pub mod variation;

pub use config::{DecayParams, MasteryConfig, MasteryCriteria, StruggleWeights};
pub use decay::ReviewCandidate;
pub use engine::{AttemptInput, AttemptOutcome, MasteryEngine, MasteryError, NextExercise, NextKind};
pub use graph::DependencyGraph;
pub use persistence::{JsonFileStore, MemorySnapshotStore, SnapshotError, SnapshotStore};
pub use queue::{AdaptiveQueueManager, QueueDecision};
pub use store::{LearnerState, MasteryStore, RecordPatch};
pub use struggle::StruggleAnalyzer;
pub use types::{
    AdaptiveLearningQueue, ConceptFamily, Difficulty, FamilyMasteryRecord, FamilyStatus,
    HintEvent, HintResolution, HintSeverity, LearningPhase, PausedFamily, ProblemVariation,
    QueueAction, QueueModification, QueueReason, QueuedFamily, VariationAttempt,
};
