//! Struggle scoring for a single graded attempt.
//!
//! The score is a plain additive sum over independent signals, clamped
//! to 0-100. It is computed once when the attempt is graded and frozen
//! into the record; later policy changes never rewrite history.

use crate::config::StruggleWeights;
use crate::types::{HintResolution, HintSeverity, VariationAttempt};

#[derive(Debug, Clone)]
pub struct StruggleAnalyzer {
    weights: StruggleWeights,
}

impl StruggleAnalyzer {
    pub fn new(weights: StruggleWeights) -> Self {
        Self { weights }
    }

    /// Score an attempt 0-100.
    pub fn score(&self, attempt: &VariationAttempt) -> u8 {
        let w = &self.weights;
        let mut score: u32 = 0;
        if !attempt.passed {
            score += w.failed;
        }
        if attempt.submission_attempts > w.max_submissions {
            score += w.excess_submissions;
        }
        if attempt.hints_used > w.max_hints {
            score += w.heavy_hint_use;
        }
        if attempt.time_ms > w.slow_time_ms {
            score += w.slow_completion;
        }
        let unresolved = self.unresolved_hints(attempt);
        score += (unresolved * w.unresolved_hint_step).min(w.unresolved_hint_cap);
        if self.had_deep_hint(attempt) {
            score += w.deep_hint;
        }
        score.min(100) as u8
    }

    /// Whether a score warrants the prerequisite intervention.
    pub fn triggers_intervention(&self, score: u8) -> bool {
        self.weights.triggers_intervention(score)
    }

    /// Human-readable contributing factors, in a fixed order so the UI
    /// (and tests) see a stable list.
    pub fn reasons(&self, attempt: &VariationAttempt) -> Vec<String> {
        let w = &self.weights;
        let mut reasons = Vec::new();
        if !attempt.passed {
            reasons.push("failed the exercise".to_string());
        }
        if attempt.submission_attempts > w.max_submissions {
            reasons.push(format!(
                "needed more than {} submissions",
                w.max_submissions
            ));
        }
        if attempt.hints_used > w.max_hints {
            reasons.push("leaned heavily on hints".to_string());
        }
        if self.unresolved_hints(attempt) > 0 {
            reasons.push("hints did not resolve the confusion".to_string());
        }
        if self.had_deep_hint(attempt) {
            reasons.push("needed a deep hint".to_string());
        }
        if attempt.time_ms > w.slow_time_ms {
            reasons.push(format!(
                "took longer than {} minutes",
                w.slow_time_ms / 60_000
            ));
        }
        reasons
    }

    fn unresolved_hints(&self, attempt: &VariationAttempt) -> u32 {
        attempt
            .hint_trace
            .iter()
            .filter(|h| h.resolution == HintResolution::StillStuck)
            .count() as u32
    }

    fn had_deep_hint(&self, attempt: &VariationAttempt) -> bool {
        attempt
            .hint_trace
            .iter()
            .any(|h| h.severity == HintSeverity::Heavy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StruggleWeights;
    use crate::types::{HintEvent, LearningPhase};

    fn attempt(
        passed: bool,
        submissions: u32,
        hints: u32,
        time_ms: i64,
        trace: Vec<HintEvent>,
    ) -> VariationAttempt {
        VariationAttempt {
            variation_id: "v1".into(),
            problem_id: "p1".into(),
            attempt_number: 1,
            timestamp: 0,
            phase: LearningPhase::MasteryChallenge,
            time_ms,
            hints_used: hints,
            passed,
            submission_attempts: submissions,
            is_first_attempt: true,
            qualifies_for_mastery: false,
            struggle_score: 0,
            hint_trace: trace,
            triggered_prerequisites: Vec::new(),
            triggered_learning_return: false,
        }
    }

    fn analyzer() -> StruggleAnalyzer {
        StruggleAnalyzer::new(StruggleWeights::default())
    }

    #[test]
    fn clean_pass_scores_zero() {
        let a = analyzer();
        assert_eq!(a.score(&attempt(true, 1, 0, 300_000, vec![])), 0);
    }

    #[test]
    fn fail_alone_scores_thirty() {
        let a = analyzer();
        let score = a.score(&attempt(false, 1, 0, 300_000, vec![]));
        assert_eq!(score, 30);
        assert!(!a.triggers_intervention(score));
    }

    #[test]
    fn fail_plus_excess_submissions_triggers_intervention() {
        let a = analyzer();
        let score = a.score(&attempt(false, 3, 0, 300_000, vec![]));
        assert_eq!(score, 55);
        assert!(a.triggers_intervention(score));
    }

    #[test]
    fn boundary_values_do_not_arm_thresholds() {
        // Exactly 2 submissions, exactly 1 hint, exactly 20 minutes.
        let a = analyzer();
        assert_eq!(a.score(&attempt(true, 2, 1, 20 * 60 * 1000, vec![])), 0);
    }

    #[test]
    fn unresolved_hints_cap_at_twenty() {
        let a = analyzer();
        let trace = vec![
            HintEvent {
                severity: HintSeverity::Light,
                resolution: HintResolution::StillStuck,
            };
            4
        ];
        assert_eq!(a.score(&attempt(true, 1, 0, 1000, trace)), 20);
    }

    #[test]
    fn everything_wrong_clamps_to_hundred() {
        let a = analyzer();
        let trace = vec![
            HintEvent {
                severity: HintSeverity::Heavy,
                resolution: HintResolution::StillStuck,
            };
            3
        ];
        // 30 + 25 + 20 + 20 + 20 + 10 = 125, clamped.
        assert_eq!(a.score(&attempt(false, 5, 4, 30 * 60 * 1000, trace)), 100);
    }

    #[test]
    fn reasons_come_in_fixed_order() {
        let a = analyzer();
        let trace = vec![HintEvent {
            severity: HintSeverity::Heavy,
            resolution: HintResolution::StillStuck,
        }];
        let reasons = a.reasons(&attempt(false, 3, 2, 25 * 60 * 1000, trace));
        assert_eq!(
            reasons,
            vec![
                "failed the exercise",
                "needed more than 2 submissions",
                "leaned heavily on hints",
                "hints did not resolve the confusion",
                "needed a deep hint",
                "took longer than 20 minutes",
            ]
        );
    }

    #[test]
    fn more_signals_never_lower_the_score() {
        let a = analyzer();
        let base = a.score(&attempt(false, 1, 0, 1000, vec![]));
        let worse = a.score(&attempt(false, 3, 0, 1000, vec![]));
        assert!(worse >= base);
    }
}
