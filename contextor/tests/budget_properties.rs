//! Property tests for the context budgeter.

use contextor::{ContextBudget, TokenCounter, budget::build};
use proptest::prelude::*;
use rag_store::ScoredPassage;

fn passage() -> impl Strategy<Value = ScoredPassage> {
    (
        prop::collection::vec("[a-z]{1,8}", 0..40),
        "[a-z0-9]{1,6}",
        0.0f32..1.0,
    )
        .prop_map(|(words, source, score)| ScoredPassage::new(words.join(" "), source, score))
}

fn sorted(passages: &[ScoredPassage]) -> Vec<ScoredPassage> {
    let mut v = passages.to_vec();
    v.sort_by(|a, b| b.score.total_cmp(&a.score));
    v
}

proptest! {
    #[test]
    fn serialized_context_fits_budget(
        passages in prop::collection::vec(passage(), 0..8),
        max in 0usize..200,
        reserved in 0usize..100,
    ) {
        let counter = TokenCounter::approximate();
        let budget = ContextBudget::new(max, reserved);
        let ctx = build(&passages, budget, &counter);
        prop_assert!(counter.count(&ctx.text()) <= budget.available());
        prop_assert_eq!(ctx.entries().len(), ctx.used().len());
    }

    #[test]
    fn used_scores_never_increase(
        passages in prop::collection::vec(passage(), 0..8),
        max in 0usize..300,
    ) {
        let ctx = build(&passages, ContextBudget::new(max, 0), &TokenCounter::approximate());
        for pair in ctx.used().windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Used sources are a prefix of the ranked input; only the last may be cut.
    #[test]
    fn packing_stops_at_first_overflow(
        passages in prop::collection::vec(passage(), 0..8),
        max in 0usize..300,
    ) {
        let ranked = sorted(&passages);
        let ctx = build(&passages, ContextBudget::new(max, 0), &TokenCounter::approximate());
        let used = ctx.used();
        for (i, u) in used.iter().enumerate() {
            prop_assert_eq!(&u.source, &ranked[i].source);
            prop_assert_eq!(u.score, ranked[i].score);
            if i + 1 < used.len() {
                prop_assert_eq!(&u.content, &ranked[i].content);
            } else {
                prop_assert!(ranked[i].content.starts_with(u.content.as_str()));
            }
        }
    }

    #[test]
    fn reservation_at_or_over_ceiling_is_degenerate(
        passages in prop::collection::vec(passage(), 0..8),
        max in 0usize..100,
        extra in 0usize..50,
    ) {
        let ctx = build(&passages, ContextBudget::new(max, max + extra), &TokenCounter::approximate());
        prop_assert!(ctx.is_empty());
        prop_assert!(ctx.used().is_empty());
    }
}
