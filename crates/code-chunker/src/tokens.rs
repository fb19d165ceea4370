use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer family the estimates are calibrated for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Llama 3 family (the default Groq model)
    #[default]
    Llama,
    /// OpenAI GPT family
    Gpt,
    /// Unknown tokenizer; conservative ratio
    Generic,
}

impl ModelFamily {
    /// Average characters per token, times ten
    #[must_use]
    pub const fn chars_per_token_x10(self) -> usize {
        match self {
            Self::Llama => 35,
            Self::Gpt => 40,
            Self::Generic => 30,
        }
    }
}

/// Local, deterministic token estimate for a text span.
///
/// Counts extended grapheme clusters and divides by the family ratio, rounding up. The
/// estimate is monotonic in input length and empty text costs zero tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenEstimator {
    family: ModelFamily,
}

impl TokenEstimator {
    #[must_use]
    pub const fn new(family: ModelFamily) -> Self {
        Self { family }
    }

    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        self.family
    }

    #[must_use]
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let units = text.graphemes(true).count();
        (units * 10).div_ceil(self.family.chars_per_token_x10())
    }

    /// Longest suffix of `text` whose estimate fits in `budget`.
    ///
    /// Whole trailing lines are preferred. When not even the last line fits, the tail of the
    /// last non-blank line is cut on a grapheme boundary instead.
    #[must_use]
    pub fn tail_within(&self, text: &str, budget: usize) -> String {
        if budget == 0 || text.is_empty() {
            return String::new();
        }
        if self.estimate(text) <= budget {
            return text.to_string();
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut tail = String::new();
        for &line in lines.iter().rev() {
            let candidate = if tail.is_empty() {
                line.to_string()
            } else {
                format!("{line}\n{tail}")
            };
            if self.estimate(&candidate) > budget {
                break;
            }
            tail = candidate;
        }
        if !tail.trim().is_empty() {
            return tail;
        }

        let Some(last) = lines.iter().rev().find(|line| !line.trim().is_empty()) else {
            return String::new();
        };
        let graphemes: Vec<&str> = last.graphemes(true).collect();
        let max_units = budget * self.family.chars_per_token_x10() / 10;
        let start = graphemes.len().saturating_sub(max_units);
        graphemes[start..].concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_estimate_tokens() {
        let estimator = TokenEstimator::default();
        let content = "public int add(int a, int b) { return a + b; }";
        let tokens = estimator.estimate(content);
        assert!(tokens > 0);
        assert!(tokens < 100);
        assert_eq!(tokens, estimator.estimate(content));
    }

    #[test]
    fn empty_text_costs_nothing() {
        assert_eq!(TokenEstimator::default().estimate(""), 0);
        assert_eq!(TokenEstimator::default().estimate("x"), 1);
    }

    #[test]
    fn families_differ_in_ratio() {
        let text = "a".repeat(120);
        assert_eq!(TokenEstimator::new(ModelFamily::Gpt).estimate(&text), 30);
        assert_eq!(TokenEstimator::new(ModelFamily::Generic).estimate(&text), 40);
        assert_eq!(TokenEstimator::new(ModelFamily::Llama).estimate(&text), 35);
    }

    #[test]
    fn combining_marks_do_not_inflate_estimate() {
        let estimator = TokenEstimator::new(ModelFamily::Gpt);
        let plain = "e".repeat(8);
        let accented = "e\u{301}".repeat(8);
        assert_eq!(estimator.estimate(&plain), estimator.estimate(&accented));
    }

    #[test]
    fn tail_prefers_whole_lines() {
        let estimator = TokenEstimator::new(ModelFamily::Gpt);
        let text = "first line here\nsecond line\nthird";
        let tail = estimator.tail_within(text, 5);
        assert_eq!(tail, "second line\nthird");
        assert!(estimator.estimate(&tail) <= 5);
    }

    #[test]
    fn tail_falls_back_to_character_window() {
        let estimator = TokenEstimator::new(ModelFamily::Gpt);
        let text = format!("short\n{}", "x".repeat(400));
        let tail = estimator.tail_within(&text, 10);
        assert_eq!(tail, "x".repeat(40));
        assert_eq!(estimator.estimate(&tail), 10);
    }

    #[test]
    fn tail_of_text_within_budget_is_whole_text() {
        let estimator = TokenEstimator::default();
        assert_eq!(estimator.tail_within("abc", 50), "abc");
        assert_eq!(estimator.tail_within("abc", 0), "");
    }

    proptest! {
        #[test]
        fn proptest_estimate_is_monotonic(a in ".{0,200}", b in ".{0,200}") {
            let estimator = TokenEstimator::default();
            let joined = format!("{a}{b}");
            prop_assert!(estimator.estimate(&a) <= estimator.estimate(&joined));
        }

        #[test]
        fn proptest_tail_respects_budget(text in "[a-z \\n]{0,400}", budget in 0usize..40) {
            let estimator = TokenEstimator::default();
            let tail = estimator.tail_within(&text, budget);
            prop_assert!(estimator.estimate(&tail) <= budget);
        }
    }
}
