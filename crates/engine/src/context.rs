//! Context assembly — builds the bounded prompt context from session
//! history and retrieved knowledge.
//!
//! Truncation policy: retrieved knowledge is prioritized over older
//! conversation turns when both compete for the character budget.
//! Older turns are dropped first; knowledge text is truncated from the
//! end only when it alone exceeds the budget. Assembly is
//! deterministic: identical inputs always produce identical output, and
//! output size is bounded regardless of conversation length.

use waypost_core::turn::Turn;

/// The assembled, budget-bounded context for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Retrieved knowledge text, possibly tail-truncated
    pub knowledge: String,

    /// Rendered history lines, oldest first
    pub history: String,

    /// Turns that made it into `history`
    pub turns_included: usize,

    /// Turns in the window that were dropped for budget
    pub turns_dropped: usize,

    /// Whether the knowledge text was truncated
    pub knowledge_truncated: bool,
}

impl AssembledContext {
    /// Total characters across both sections.
    pub fn chars_used(&self) -> usize {
        self.knowledge.len() + self.history.len()
    }
}

/// Stateless assembler. Create one from config and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_chars: usize,
    history_turns: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize, history_turns: usize) -> Self {
        Self {
            max_chars,
            history_turns,
        }
    }

    /// Render one turn the way the prompt templates expect it.
    fn render_turn(turn: &Turn) -> String {
        format!("user: {}\nassistant: {}\n", turn.message, turn.answer)
    }

    /// Assemble context from the session's turns and optional knowledge.
    ///
    /// # Algorithm
    ///
    /// 1. Knowledge claims the budget first; if it alone exceeds the
    ///    budget it is truncated from the end (on a char boundary).
    /// 2. The most recent `history_turns` turns fill the remainder,
    ///    walking newest to oldest so the oldest are dropped first,
    ///    then restored to chronological order.
    pub fn assemble(&self, turns: &[Turn], knowledge: Option<&str>) -> AssembledContext {
        let mut knowledge_truncated = false;
        let knowledge = match knowledge {
            Some(k) if k.len() > self.max_chars => {
                knowledge_truncated = true;
                truncate_on_char_boundary(k, self.max_chars).to_string()
            }
            Some(k) => k.to_string(),
            None => String::new(),
        };

        let remaining = self.max_chars - knowledge.len();

        let window_start = turns.len().saturating_sub(self.history_turns);
        let window = &turns[window_start..];

        let mut included: Vec<String> = Vec::new();
        let mut used = 0usize;
        let mut dropped = 0usize;

        for turn in window.iter().rev() {
            let line = Self::render_turn(turn);
            if used + line.len() <= remaining {
                used += line.len();
                included.push(line);
            } else {
                // Everything older than the first overflow is dropped
                // too, keeping the kept history contiguous.
                dropped = window.len() - included.len();
                break;
            }
        }

        // Restore chronological order (we walked newest-first).
        included.reverse();

        AssembledContext {
            knowledge,
            history: included.concat(),
            turns_included: included.len(),
            turns_dropped: dropped,
            knowledge_truncated,
        }
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 char.
fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_core::turn::AnswerTier;

    fn turn(msg: &str, answer: &str) -> Turn {
        Turn::new(msg, answer, AnswerTier::General, None)
    }

    fn turns(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| turn(&format!("question {i}"), &format!("answer {i}")))
            .collect()
    }

    #[test]
    fn empty_inputs_produce_empty_context() {
        let asm = ContextAssembler::new(1200, 6);
        let ctx = asm.assemble(&[], None);
        assert!(ctx.knowledge.is_empty());
        assert!(ctx.history.is_empty());
        assert_eq!(ctx.chars_used(), 0);
    }

    #[test]
    fn history_renders_in_chronological_order() {
        let asm = ContextAssembler::new(1200, 6);
        let ctx = asm.assemble(&turns(3), None);
        let q0 = ctx.history.find("question 0").unwrap();
        let q2 = ctx.history.find("question 2").unwrap();
        assert!(q0 < q2);
        assert_eq!(ctx.turns_included, 3);
        assert_eq!(ctx.turns_dropped, 0);
    }

    #[test]
    fn window_keeps_only_recent_turns() {
        let asm = ContextAssembler::new(10_000, 2);
        let ctx = asm.assemble(&turns(10), None);
        assert_eq!(ctx.turns_included, 2);
        assert!(ctx.history.contains("question 8"));
        assert!(ctx.history.contains("question 9"));
        assert!(!ctx.history.contains("question 7"));
    }

    #[test]
    fn knowledge_included_untruncated_when_it_fits() {
        let asm = ContextAssembler::new(1200, 6);
        let ctx = asm.assemble(&[], Some("Q: reset?\nA: use the link.\n"));
        assert_eq!(ctx.knowledge, "Q: reset?\nA: use the link.\n");
        assert!(!ctx.knowledge_truncated);
    }

    #[test]
    fn older_turns_dropped_before_knowledge_truncated() {
        // Knowledge fits the budget; history must squeeze into what's
        // left, dropping oldest first.
        let knowledge = "K".repeat(100);
        let history = turns(6); // each rendered pair is ~25 chars
        let asm = ContextAssembler::new(160, 6);

        let ctx = asm.assemble(&history, Some(&knowledge));

        // Knowledge survives whole
        assert_eq!(ctx.knowledge.len(), 100);
        assert!(!ctx.knowledge_truncated);

        // Only the newest turns fit in the remaining 60 chars
        assert!(ctx.turns_included < 6);
        assert!(ctx.turns_dropped > 0);
        assert!(ctx.history.contains("question 5"));
        assert!(!ctx.history.contains("question 0"));
        assert!(ctx.chars_used() <= 160);
    }

    #[test]
    fn knowledge_truncated_from_end_when_alone_exceeds_budget() {
        let knowledge = format!("{}{}", "A".repeat(90), "Z".repeat(30));
        let asm = ContextAssembler::new(100, 6);

        let ctx = asm.assemble(&turns(2), Some(&knowledge));

        assert_eq!(ctx.knowledge.len(), 100);
        assert!(ctx.knowledge_truncated);
        // The tail is what got cut: 20 of the 30 trailing Zs are gone
        assert!(ctx.knowledge.starts_with("AAAA"));
        assert_eq!(ctx.knowledge.matches('Z').count(), 10);
        // No room left for history at all
        assert_eq!(ctx.turns_included, 0);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let knowledge = "héllo wörld ".repeat(30); // multibyte chars
        let asm = ContextAssembler::new(50, 6);
        let ctx = asm.assemble(&[], Some(&knowledge));
        assert!(ctx.knowledge.len() <= 50);
        // Must still be valid UTF-8 (would have panicked otherwise)
        assert!(ctx.knowledge.starts_with("héllo"));
    }

    #[test]
    fn deterministic_assembly() {
        let asm = ContextAssembler::new(200, 4);
        let history = turns(8);
        let ctx1 = asm.assemble(&history, Some("knowledge text"));
        let ctx2 = asm.assemble(&history, Some("knowledge text"));
        assert_eq!(ctx1, ctx2);
    }

    #[test]
    fn output_bounded_regardless_of_history_length() {
        let asm = ContextAssembler::new(300, 1000);
        let ctx = asm.assemble(&turns(500), Some(&"K".repeat(100)));
        assert!(ctx.chars_used() <= 300);
    }
}
