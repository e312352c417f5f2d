//! Context Budgeter: packs scored passages into a fixed token allowance.
//!
//! Passages are taken greedily by descending score. The first passage that
//! does not fit in full gets one chance to fit as a word prefix; after that
//! packing stops, whether or not the prefix fit and whatever budget remains.
//! Costs are measured on the serialized block (entries joined by `\n`), so
//! the returned text never costs more than [`ContextBudget::available`].

use rag_store::ScoredPassage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tokens::TokenCounter;

/// Token ceiling for the context block and the part of it reserved for
/// fixed prompt overhead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_tokens: usize,
    pub reserved_tokens: usize,
}

impl ContextBudget {
    pub fn new(max_tokens: usize, reserved_tokens: usize) -> Self {
        Self {
            max_tokens,
            reserved_tokens,
        }
    }

    /// Reserves the preamble's exact token cost plus `margin`.
    pub fn for_preamble(
        max_tokens: usize,
        preamble: &str,
        margin: usize,
        counter: &TokenCounter,
    ) -> Self {
        Self::new(max_tokens, counter.count(preamble) + margin)
    }

    /// Tokens left for passages; `0` when the reservation eats everything.
    pub fn available(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserved_tokens)
    }
}

/// A passage as it was actually placed into the context.
///
/// `content` is the truncated text when the passage was cut.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsedSource {
    pub content: String,
    pub source: String,
    pub score: f32,
}

/// Rendered entries and their sources, in lock-step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComposedContext {
    entries: Vec<String>,
    used: Vec<UsedSource>,
}

impl ComposedContext {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn used(&self) -> &[UsedSource] {
        &self.used
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-joined context block.
    pub fn text(&self) -> String {
        self.entries.join("\n")
    }

    pub fn into_parts(self) -> (String, Vec<UsedSource>) {
        let text = self.text();
        (text, self.used)
    }

    fn push(&mut self, entry: String, used: UsedSource) {
        self.entries.push(entry);
        self.used.push(used);
    }
}

pub fn render_entry(content: &str, source: &str) -> String {
    format!("Content: {content}\nSource: {source}")
}

/// Selects and truncates passages to fit `budget`.
pub fn build(
    passages: &[ScoredPassage],
    budget: ContextBudget,
    counter: &TokenCounter,
) -> ComposedContext {
    let available = budget.available();
    let mut out = ComposedContext::default();
    if available == 0 || passages.is_empty() {
        debug!(available, passages = passages.len(), "context budget degenerate");
        return out;
    }

    let mut ranked: Vec<&ScoredPassage> = passages.iter().collect();
    // `sort_by` is stable: equal scores keep index order.
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut block = String::new();
    for p in ranked {
        let entry = render_entry(&p.content, &p.source);
        if counter.count(&joined(&block, &entry)) <= available {
            block = joined(&block, &entry);
            out.push(entry, used(p, p.content.clone()));
            continue;
        }

        let words: Vec<&str> = p.content.split_whitespace().collect();
        for i in (1..=words.len()).rev() {
            let prefix = words[..i].join(" ");
            let entry = render_entry(&prefix, &p.source);
            if counter.count(&joined(&block, &entry)) <= available {
                debug!(source = %p.source, kept_words = i, of = words.len(), "passage truncated");
                out.push(entry, used(p, prefix));
                break;
            }
        }
        break;
    }

    debug!(
        available,
        used = out.used.len(),
        tokens = counter.count(&out.text()),
        "context built"
    );
    out
}

fn joined(block: &str, entry: &str) -> String {
    if block.is_empty() {
        entry.to_string()
    } else {
        format!("{block}\n{entry}")
    }
}

fn used(p: &ScoredPassage, content: String) -> UsedSource {
    UsedSource {
        content,
        source: p.source.clone(),
        score: p.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (1..=n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn approx() -> TokenCounter {
        TokenCounter::approximate()
    }

    #[test]
    fn available_saturates() {
        assert_eq!(ContextBudget::new(600, 250).available(), 350);
        assert_eq!(ContextBudget::new(100, 250).available(), 0);
    }

    #[test]
    fn reserved_includes_preamble_cost() {
        let b = ContextBudget::for_preamble(600, "be brief and kind", 250, &approx());
        // 4 words -> floor(5.2) = 5
        assert_eq!(b.reserved_tokens, 255);
    }

    #[test]
    fn degenerate_budget_yields_empty_context() {
        let ps = vec![ScoredPassage::new("a b c", "p1", 0.9)];
        let ctx = build(&ps, ContextBudget::new(10, 10), &approx());
        assert!(ctx.is_empty());
        assert!(ctx.used().is_empty());
        assert_eq!(ctx.text(), "");
    }

    #[test]
    fn empty_passages_yield_empty_context() {
        let ctx = build(&[], ContextBudget::new(600, 0), &approx());
        assert!(ctx.is_empty());
    }

    #[test]
    fn sorts_by_score_descending() {
        let ps = vec![
            ScoredPassage::new("low", "p3", 0.1),
            ScoredPassage::new("high", "p1", 0.9),
            ScoredPassage::new("mid", "p2", 0.5),
        ];
        let ctx = build(&ps, ContextBudget::new(1_000, 0), &approx());
        let order: Vec<_> = ctx.used().iter().map(|u| u.source.as_str()).collect();
        assert_eq!(order, ["p1", "p2", "p3"]);
        assert_eq!(
            ctx.text(),
            "Content: high\nSource: p1\nContent: mid\nSource: p2\nContent: low\nSource: p3"
        );
    }

    #[test]
    fn ties_keep_index_order() {
        let ps = vec![
            ScoredPassage::new("x", "first", 0.5),
            ScoredPassage::new("y", "second", 0.5),
        ];
        let ctx = build(&ps, ContextBudget::new(1_000, 0), &approx());
        assert_eq!(ctx.used()[0].source, "first");
        assert_eq!(ctx.used()[1].source, "second");
    }

    #[test]
    fn overflow_truncates_to_largest_fitting_prefix() {
        // entry with i words costs floor((i + 3) * 1.3); i = 5 -> 10, i = 6 -> 11
        let ps = vec![ScoredPassage::new(words(10), "p1", 0.8)];
        let ctx = build(&ps, ContextBudget::new(10, 0), &approx());
        assert_eq!(ctx.used().len(), 1);
        assert_eq!(ctx.used()[0].content, "w1 w2 w3 w4 w5");
        assert_eq!(ctx.entries()[0], "Content: w1 w2 w3 w4 w5\nSource: p1");
    }

    #[test]
    fn stops_after_first_overflow_even_if_smaller_fits() {
        let ps = vec![
            ScoredPassage::new(words(3), "p1", 0.9),
            ScoredPassage::new(words(40), "catalog page two extra words", 0.8),
            ScoredPassage::new("tiny", "p3", 0.7),
        ];
        // p1 alone: 6 words -> 7 tokens
        // p1 + 1-word prefix of p2: 14 words -> 18 tokens
        // p1 + p3: 10 words -> 13 tokens, would fit
        let ctx = build(&ps, ContextBudget::new(13, 0), &approx());
        let srcs: Vec<_> = ctx.used().iter().map(|u| u.source.as_str()).collect();
        assert_eq!(srcs, ["p1"]);
    }

    #[test]
    fn truncated_passage_is_last() {
        let ps = vec![
            ScoredPassage::new(words(3), "p1", 0.9),
            ScoredPassage::new(words(40), "p2", 0.8),
            ScoredPassage::new("tiny", "p3", 0.7),
        ];
        let ctx = build(&ps, ContextBudget::new(30, 0), &approx());
        let srcs: Vec<_> = ctx.used().iter().map(|u| u.source.as_str()).collect();
        assert_eq!(srcs, ["p1", "p2"]);
        assert!(ctx.used()[1].content.split_whitespace().count() < 40);
        assert!(approx().count(&ctx.text()) <= 30);
    }

    #[test]
    fn exact_counter_respects_budget() {
        let counter = TokenCounter::for_model("gpt-4o-mini");
        let ps: Vec<_> = (0..5)
            .map(|i| ScoredPassage::new(words(60), format!("p{i}"), 1.0 - i as f32 * 0.1))
            .collect();
        let budget = ContextBudget::for_preamble(600, crate::prompt::GROUNDING_PREAMBLE, 250, &counter);
        let ctx = build(&ps, budget, &counter);
        assert!(!ctx.is_empty());
        assert!(counter.count(&ctx.text()) <= budget.available());
    }
}
