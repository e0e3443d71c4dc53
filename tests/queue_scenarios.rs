//! End-to-end scheduling scenarios driven through the engine.

use mastery_core::{
    AttemptInput, ConceptFamily, Difficulty, FamilyStatus, JsonFileStore, LearningPhase,
    MasteryConfig, MasteryEngine, NextKind, ProblemVariation, QueueAction, QueueReason,
};

fn variation(id: &str, order: u32) -> ProblemVariation {
    ProblemVariation {
        id: id.to_string(),
        problem_id: format!("p-{id}"),
        name: id.to_string(),
        difficulty: Difficulty::Medium,
        order,
    }
}

fn family(id: &str, tier: u8, module_id: f64) -> ConceptFamily {
    ConceptFamily {
        id: id.to_string(),
        name: id.to_string(),
        tier,
        module_id,
        variations: (1..=3).map(|i| variation(&format!("{id}-v{i}"), i)).collect(),
    }
}

/// Module 1: arrays, hashing. Module 2: two-pointers, sliding-window.
/// Module 3: intervals.
fn catalog() -> Vec<ConceptFamily> {
    vec![
        family("arrays", 1, 1.0),
        family("hashing", 1, 1.0),
        family("two-pointers", 2, 2.0),
        family("sliding-window", 2, 2.0),
        family("intervals", 3, 3.0),
    ]
}

fn engine() -> MasteryEngine {
    MasteryEngine::new(MasteryConfig::default(), catalog())
}

fn mastery_pass(family_id: &str, variation_id: &str) -> AttemptInput {
    AttemptInput {
        family_id: family_id.to_string(),
        variation_id: variation_id.to_string(),
        problem_id: format!("p-{variation_id}"),
        phase: LearningPhase::MasteryChallenge,
        passed: true,
        time_ms: 6 * 60 * 1000,
        hints_used: 0,
        submission_attempts: 1,
        hint_trace: Vec::new(),
    }
}

fn hard_fail(family_id: &str, variation_id: &str) -> AttemptInput {
    AttemptInput {
        family_id: family_id.to_string(),
        variation_id: variation_id.to_string(),
        problem_id: format!("p-{variation_id}"),
        phase: LearningPhase::MasteryChallenge,
        passed: false,
        time_ms: 10 * 60 * 1000,
        hints_used: 3,
        submission_attempts: 4,
        hint_trace: Vec::new(),
    }
}

fn mild_fail(family_id: &str, variation_id: &str) -> AttemptInput {
    AttemptInput {
        family_id: family_id.to_string(),
        variation_id: variation_id.to_string(),
        problem_id: format!("p-{variation_id}"),
        phase: LearningPhase::PracticeProblem,
        passed: false,
        time_ms: 3 * 60 * 1000,
        hints_used: 0,
        submission_attempts: 1,
        hint_trace: Vec::new(),
    }
}

fn queue_ids(eng: &MasteryEngine, learner: &str) -> Vec<String> {
    eng.queue_snapshot(learner)
        .unwrap()
        .queue
        .iter()
        .map(|e| e.family_id.clone())
        .collect()
}

fn assert_exclusive(eng: &MasteryEngine, learner: &str) {
    let q = eng.queue_snapshot(learner).unwrap();
    let mut seen = std::collections::HashSet::new();
    for entry in &q.queue {
        assert!(seen.insert(entry.family_id.clone()), "duplicate in queue: {}", entry.family_id);
    }
    for paused in &q.paused_families {
        assert!(
            seen.insert(paused.family_id.clone()),
            "{} is both queued and paused",
            paused.family_id
        );
    }
}

#[test]
fn fresh_learner_gets_tier_ordered_queue() {
    let eng = engine();
    eng.init_learner("u1").unwrap();
    assert_eq!(
        queue_ids(&eng, "u1"),
        vec!["arrays", "hashing", "two-pointers", "sliding-window", "intervals"]
    );
}

#[test]
fn struggle_pause_then_prereq_mastery_resumes_at_front() {
    let eng = engine();
    eng.init_learner("u1").unwrap();

    // Drowning on intervals pulls module 2 forward and parks intervals.
    let out = eng.process_attempt("u1", hard_fail("intervals", "intervals-v1")).unwrap();
    assert_eq!(out.paused_family.as_deref(), Some("intervals"));
    assert_eq!(out.status, FamilyStatus::Struggling);
    assert!(out.attempt.struggle_score >= 50);
    assert_eq!(
        queue_ids(&eng, "u1"),
        vec!["two-pointers", "sliding-window", "arrays", "hashing"]
    );
    assert_exclusive(&eng, "u1");

    // First prerequisite mastered: intervals stays parked.
    let out = eng
        .process_attempt("u1", mastery_pass("two-pointers", "two-pointers-v1"))
        .unwrap();
    assert!(out.newly_mastered);
    assert!(out.resumed_families.is_empty());
    let q = eng.queue_snapshot("u1").unwrap();
    let paused = q.paused_entry("intervals").unwrap();
    assert_eq!(paused.prereq_progress.get("two-pointers"), Some(&true));
    assert_eq!(paused.prereq_progress.get("sliding-window"), Some(&false));
    assert_exclusive(&eng, "u1");

    // Second prerequisite mastered: intervals resumes at the front.
    let out = eng
        .process_attempt("u1", mastery_pass("sliding-window", "sliding-window-v1"))
        .unwrap();
    assert_eq!(out.resumed_families, vec!["intervals".to_string()]);
    assert_eq!(queue_ids(&eng, "u1"), vec!["intervals", "arrays", "hashing"]);
    let q = eng.queue_snapshot("u1").unwrap();
    assert!(q.paused_families.is_empty());
    assert_eq!(q.queue[0].reason, QueueReason::RetryAfterPrereqs);
    assert_exclusive(&eng, "u1");

    // The audit log tells the whole story.
    let actions: Vec<QueueAction> = q.queue_history.iter().map(|h| h.action).collect();
    assert_eq!(
        actions,
        vec![
            QueueAction::Reorder,
            QueueAction::MarkMastered,
            QueueAction::MarkMastered,
            QueueAction::ResumePaused,
        ]
    );
}

#[test]
fn mastery_is_sticky_through_later_failures() {
    let eng = engine();
    eng.process_attempt("u1", mastery_pass("arrays", "arrays-v1")).unwrap();
    eng.process_attempt("u1", hard_fail("arrays", "arrays-v2")).unwrap();
    let rec = eng.record("u1", "arrays").unwrap();
    assert!(rec.is_mastered);
    assert_eq!(rec.status, FamilyStatus::Mastered);
}

#[test]
fn decayed_mastery_preempts_new_content() {
    let eng = engine();
    eng.init_learner("u1").unwrap();
    eng.process_attempt("u1", mastery_pass("arrays", "arrays-v1")).unwrap();
    assert!(eng.review_candidates("u1").is_empty());

    // Eight more problems at 0.05 decay per problem crosses the 0.4
    // review threshold (index 0 -> 9).
    for i in 0..8 {
        let vid = format!("hashing-v{}", (i % 3) + 1);
        eng.process_attempt("u1", mild_fail("hashing", &vid)).unwrap();
    }

    let due = eng.review_candidates("u1");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].family_id, "arrays");
    assert!(due[0].decay >= 0.4);

    let next = eng.next_exercise("u1").unwrap();
    assert_eq!(next.family_id, "arrays");
    assert!(matches!(next.kind, NextKind::Review { decay } if decay >= 0.4));
    // Unseen variation preferred for the review.
    assert_eq!(next.variation.id, "arrays-v2");
}

#[test]
fn clean_review_clears_the_due_flag() {
    let eng = engine();
    eng.init_learner("u1").unwrap();
    eng.process_attempt("u1", mastery_pass("arrays", "arrays-v1")).unwrap();
    for i in 0..8 {
        let vid = format!("hashing-v{}", (i % 3) + 1);
        eng.process_attempt("u1", mild_fail("hashing", &vid)).unwrap();
    }
    assert_eq!(eng.review_candidates("u1").len(), 1);

    eng.process_attempt("u1", mastery_pass("arrays", "arrays-v2")).unwrap();
    assert!(
        eng.review_candidates("u1").is_empty(),
        "first-try review pass resets the decay clock"
    );
}

#[test]
fn snapshots_survive_an_engine_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let eng = MasteryEngine::new(MasteryConfig::default(), catalog())
            .with_persistence(Box::new(JsonFileStore::new(dir.path()).unwrap()));
        eng.process_attempt("u1", mastery_pass("arrays", "arrays-v1")).unwrap();
        eng.process_attempt("u1", hard_fail("intervals", "intervals-v1")).unwrap();
    }

    let eng = MasteryEngine::new(MasteryConfig::default(), catalog())
        .with_persistence(Box::new(JsonFileStore::new(dir.path()).unwrap()));
    eng.init_learner("u1").unwrap();

    let rec = eng.record("u1", "arrays").unwrap();
    assert!(rec.is_mastered);
    let q = eng.queue_snapshot("u1").unwrap();
    assert!(q.is_paused("intervals"));
    assert_eq!(eng.learner_snapshot("u1").unwrap().problem_index, 2);
    assert_eq!(eng.learner_snapshot("u1").unwrap().total_mastered, 1);
}

#[test]
fn catalog_growth_appends_without_disturbing_existing_order() {
    let dir = tempfile::tempdir().unwrap();
    {
        let eng = MasteryEngine::new(MasteryConfig::default(), catalog())
            .with_persistence(Box::new(JsonFileStore::new(dir.path()).unwrap()));
        eng.init_learner("u1").unwrap();
        eng.process_attempt("u1", hard_fail("intervals", "intervals-v1")).unwrap();
    }

    let mut grown = catalog();
    grown.push(family("graphs", 4, 4.0));
    let eng = MasteryEngine::new(MasteryConfig::default(), grown)
        .with_persistence(Box::new(JsonFileStore::new(dir.path()).unwrap()));
    eng.init_learner("u1").unwrap();

    let ids = queue_ids(&eng, "u1");
    assert_eq!(
        ids,
        vec!["two-pointers", "sliding-window", "arrays", "hashing", "graphs"]
    );
    assert!(eng.queue_snapshot("u1").unwrap().is_paused("intervals"));
}
