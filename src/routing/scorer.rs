//! Query complexity estimation.
//!
//! Used when a caller does not label a request's complexity. Produces a score
//! in `0.0..=1.0` and maps it onto [`Complexity`]:
//!
//! | Score            | Class       |
//! |------------------|-------------|
//! | `< simple_below` | `simple`    |
//! | up to `complex_above` | `moderate` |
//! | `> complex_above` | `complex`  |
//!
//! ## Signals
//!
//! 1. **Length** - more than `long_query_words` words → +0.3
//! 2. **Code blocks** - fenced code (` ``` `) → +0.2
//! 3. **Multi-step instructions** - two or more numbered lines → +0.2
//! 4. **Reasoning terms** - two or more analysis verbs → +0.3
//!
//! The raw sum is clamped to `[0.0, 1.0]`.

use crate::request::Complexity;

use super::config::RoutingConfig;

const REASONING_TERMS: [&str; 10] = [
    "analyze",
    "analyse",
    "compare",
    "step by step",
    "in detail",
    "prove",
    "derive",
    "architecture",
    "trade-off",
    "evaluate",
];

/// A heuristic query complexity scorer.
///
/// Stateless apart from its thresholds; cheap to clone.
#[derive(Debug, Clone)]
pub struct ComplexityScorer {
    long_query_words: usize,
    simple_below: f64,
    complex_above: f64,
}

impl ComplexityScorer {
    /// Scorer with the default thresholds (500 words, 0.4, 0.7).
    pub fn new() -> Self {
        Self::from_config(&RoutingConfig::default())
    }

    /// Scorer using the thresholds from a [`RoutingConfig`].
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            long_query_words: config.long_query_words,
            simple_below: config.simple_below,
            complex_above: config.complex_above,
        }
    }

    /// Score a query for complexity.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hybrid_layer_orchestrator::routing::ComplexityScorer;
    /// let scorer = ComplexityScorer::new();
    /// assert!(scorer.score("Say hello") < 0.4);
    /// ```
    pub fn score(&self, query: &str) -> f64 {
        let total = self.length_signal(query)
            + code_block_signal(query)
            + multi_step_signal(query)
            + reasoning_signal(query);
        total.clamp(0.0, 1.0)
    }

    /// Classify a query into a [`Complexity`] bucket.
    pub fn classify(&self, query: &str) -> Complexity {
        let score = self.score(query);
        if score < self.simple_below {
            Complexity::Simple
        } else if score > self.complex_above {
            Complexity::Complex
        } else {
            Complexity::Moderate
        }
    }

    fn length_signal(&self, query: &str) -> f64 {
        if query.split_whitespace().count() > self.long_query_words {
            0.3
        } else {
            0.0
        }
    }
}

impl Default for ComplexityScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn code_block_signal(query: &str) -> f64 {
    if query.contains("```") {
        0.2
    } else {
        0.0
    }
}

/// A line counts as a step when it starts with digits followed by `.` or `)`.
fn is_numbered_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(trimmed[digits..].chars().next(), Some('.') | Some(')'))
}

fn multi_step_signal(query: &str) -> f64 {
    if query.lines().filter(|l| is_numbered_line(l)).count() >= 2 {
        0.2
    } else {
        0.0
    }
}

fn reasoning_signal(query: &str) -> f64 {
    let lower = query.to_lowercase();
    let hits = REASONING_TERMS.iter().filter(|t| lower.contains(*t)).count();
    if hits >= 2 {
        0.3
    } else {
        0.0
    }
}
