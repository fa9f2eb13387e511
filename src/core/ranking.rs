use std::cmp::Ordering;

use crate::core::history::FieldScores;
use crate::core::options::OptionSource;
use crate::models::{Field, FieldOption, FieldValue};

/// Produces the final ordered candidate list for a field. Deterministic:
/// combined score descending, then lexicographic, with draft-context
/// matches stable-sorted to the front.
pub struct RankingEngine;

impl RankingEngine {
    /// Full ranking including the context boost. Truncation to top-N is the
    /// presentation layer's job.
    pub fn rank(
        field: Field,
        options: &[String],
        scores: &FieldScores,
        context: Option<&FieldValue>,
    ) -> Vec<FieldOption> {
        Self::apply_context(Self::base_rank(field, options, scores), context)
    }

    /// Score-ordered ranking without the context boost. This is what the
    /// suggestion cache stores; the boost is cheap and applied per call.
    pub fn base_rank(field: Field, options: &[String], scores: &FieldScores) -> Vec<FieldOption> {
        let normalized = OptionSource::normalize(options);
        let (candidates, in_schema) = if normalized.is_empty() {
            (OptionSource::defaults(field), false)
        } else {
            (normalized, true)
        };

        let mut ranked: Vec<FieldOption> = candidates
            .into_iter()
            .map(|value| {
                let personal = scores.personal.get(&value).copied().unwrap_or(0.0);
                let global = scores.global.get(&value).copied().unwrap_or(0.0);
                FieldOption {
                    value,
                    personal,
                    global,
                    in_schema,
                    context: false,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.combined()
                .partial_cmp(&a.combined())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.value.cmp(&b.value))
        });
        ranked
    }

    /// Stable-sorts candidates matching the draft's current value to the
    /// front: what you already picked is always visible first.
    pub fn apply_context(
        mut ranked: Vec<FieldOption>,
        context: Option<&FieldValue>,
    ) -> Vec<FieldOption> {
        let Some(current) = context else {
            return ranked;
        };

        for option in &mut ranked {
            option.context = current.matches(&option.value);
        }
        if ranked.iter().any(|o| o.context) {
            let (front, rest): (Vec<FieldOption>, Vec<FieldOption>) =
                ranked.into_iter().partition(|o| o.context);
            ranked = front;
            ranked.extend(rest);
        }
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scores(personal: &[(&str, f64)], global: &[(&str, f64)]) -> FieldScores {
        FieldScores {
            personal: personal
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            global: global
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn values(ranked: &[FieldOption]) -> Vec<&str> {
        ranked.iter().map(|o| o.value.as_str()).collect()
    }

    #[test]
    fn unscored_options_fall_back_to_lexicographic_order() {
        let options = vec!["Short".to_string(), "Long".to_string()];
        let ranked = RankingEngine::rank(Field::Direction, &options, &FieldScores::default(), None);
        assert_eq!(values(&ranked), vec!["Long", "Short"]);
        assert!(ranked.iter().all(|o| o.in_schema));
    }

    #[test]
    fn higher_combined_score_ranks_first() {
        let options = vec!["Long".to_string(), "Short".to_string()];
        let s = scores(&[("Short", 1.4)], &[("Short", 0.2), ("Long", 0.4)]);
        let ranked = RankingEngine::rank(Field::Direction, &options, &s, None);
        assert_eq!(values(&ranked), vec!["Short", "Long"]);
        assert_eq!(ranked[0].personal, 1.4);
        assert_eq!(ranked[0].global, 0.2);
    }

    #[test]
    fn ranking_is_deterministic() {
        let options: Vec<String> = ["alpha", "bravo", "charlie", "delta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = scores(&[("bravo", 0.9), ("delta", 0.9)], &[("alpha", 0.2)]);
        let first = RankingEngine::rank(Field::Setup, &options, &s, None);
        for _ in 0..5 {
            assert_eq!(RankingEngine::rank(Field::Setup, &options, &s, None), first);
        }
        // Equal-score tie broken lexicographically
        assert_eq!(values(&first), vec!["bravo", "delta", "alpha", "charlie"]);
    }

    #[test]
    fn context_beats_any_score() {
        let options: Vec<String> = ["fvg", "breaker", "order_block"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = scores(&[("fvg", 5.0), ("breaker", 3.0)], &[]);
        let current = FieldValue::Text("order_block".to_string());
        let ranked = RankingEngine::rank(Field::Setup, &options, &s, Some(&current));
        assert_eq!(values(&ranked), vec!["order_block", "fvg", "breaker"]);
        assert!(ranked[0].context);
        assert!(!ranked[1].context);
    }

    #[test]
    fn multi_select_boosts_every_selected_member() {
        let options: Vec<String> = ["anxious", "calm", "confident", "fomo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = scores(&[("anxious", 2.0)], &[]);
        let current = FieldValue::List(vec!["fomo".to_string(), "calm".to_string()]);
        let ranked = RankingEngine::rank(Field::Emotions, &options, &s, Some(&current));
        // Selected members first, keeping their score order, then the rest
        assert_eq!(values(&ranked), vec!["calm", "fomo", "anxious", "confident"]);
    }

    #[test]
    fn empty_options_use_defaults_and_never_error() {
        let ranked = RankingEngine::rank(Field::Direction, &[], &FieldScores::default(), None);
        assert_eq!(values(&ranked), vec!["long", "short"]);
        assert!(ranked.iter().all(|o| !o.in_schema));

        // Fields with no defaults produce an empty list
        let ranked = RankingEngine::rank(Field::Account, &[], &FieldScores::default(), None);
        assert!(ranked.is_empty());
    }
}
