use crate::types::EdgeSignals;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Decay constant for the recency signal: activation = exp(-LAMBDA * age_days).
const DECAY_LAMBDA: f64 = 0.1;

/// Weight formula coefficients. `import_strength` dominates since
/// compile-time coupling is the strongest discovered signal.
const W_IMPORT_STRENGTH: f64 = 0.4;
const W_CO_CHANGE: f64 = 0.3;
const W_MUTUAL_INFORMATION: f64 = 0.2;
const W_SEMANTIC_SIMILARITY: f64 = 0.1;

/// Import strength assigned to a direct code reference.
pub const DIRECT_IMPORT_STRENGTH: f64 = 0.8;

/// Fixed weight for document-link edges. Deliberately below the code-reference
/// weight: document coupling is weaker than compile-time coupling.
pub const DOC_LINK_WEIGHT: f64 = 0.35;

/// Fixed weight for loose path-mention edges.
pub const PATH_MENTION_WEIGHT: f64 = 0.2;

pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shannon entropy over character frequency, in bits/char.
///
/// 0 for empty content, rounded to 2 decimals.
pub fn shannon_entropy(content: &str) -> f64 {
    if content.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in content.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }

    let total = total as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    round2(entropy)
}

/// Recency-decayed activation in [0,1]: exp(-0.1 * days), rounded to 2 decimals.
pub fn activation_for_age_days(age_days: f64) -> f64 {
    let age = age_days.max(0.0);
    round2((-DECAY_LAMBDA * age).exp()).clamp(0.0, 1.0)
}

// Static reference-syntax patterns across the languages the scanner admits.
// These are counts only; nothing here is parsed semantically.
static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ES modules / TypeScript
        r#"(?m)^\s*import\s+(?:[\w{}*,\s]+\s+from\s+)?['"][^'"]+['"]"#,
        // CommonJS
        r#"require\s*\(\s*['"][^'"]+['"]\s*\)"#,
        // Python
        r"(?m)^\s*(?:from\s+\S+\s+)?import\s+\w",
        // Rust
        r"(?m)^\s*(?:pub\s+)?use\s+[\w:]",
        // C / C++
        r#"(?m)^\s*#include\s*[<"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static import pattern"))
    .collect()
});

static EXPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ES modules / TypeScript
        r"(?m)^\s*export\s+\w",
        // CommonJS
        r"(?m)^\s*module\.exports",
        // Python top-level definitions
        r"(?m)^(?:def|class)\s+\w",
        // Rust public items
        r"(?m)^\s*pub\s+(?:fn|struct|enum|trait|mod|const|static|type)\s",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static export pattern"))
    .collect()
});

/// Count import-like references in `content`.
pub fn count_imports(content: &str) -> usize {
    IMPORT_PATTERNS
        .iter()
        .map(|re| re.find_iter(content).count())
        .sum()
}

/// Count export-like declarations in `content`.
pub fn count_exports(content: &str) -> usize {
    EXPORT_PATTERNS
        .iter()
        .map(|re| re.find_iter(content).count())
        .sum()
}

/// The pluggable edge-signal slots. `import_strength` is populated by the
/// discovery passes themselves and has no provider slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSlot {
    CoChange,
    MutualInformation,
    SemanticSimilarity,
}

/// A signal source for one slot, scored per (from, to) file pair.
pub trait SignalProvider: Send + Sync {
    fn slot(&self) -> SignalSlot;

    /// Signal value for the ordered pair, expected in [0,1].
    fn score(&self, from: &str, to: &str) -> f64;
}

/// Registered signal providers, one consulted per slot.
///
/// Slots without a provider resolve to 0.0, so the weight formula never needs
/// to change when a new signal source appears.
#[derive(Clone, Default)]
pub struct SignalSet {
    providers: Vec<Arc<dyn SignalProvider>>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn SignalProvider>) {
        self.providers.push(provider);
    }

    pub fn resolve(&self, slot: SignalSlot, from: &str, to: &str) -> f64 {
        self.providers
            .iter()
            .find(|p| p.slot() == slot)
            .map(|p| p.score(from, to).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Signals for a direct code reference between `from` and `to`.
    pub fn code_reference_signals(&self, from: &str, to: &str) -> EdgeSignals {
        EdgeSignals {
            import_strength: DIRECT_IMPORT_STRENGTH,
            co_change_rate: self.resolve(SignalSlot::CoChange, from, to),
            mutual_information: self.resolve(SignalSlot::MutualInformation, from, to),
            semantic_similarity: self.resolve(SignalSlot::SemanticSimilarity, from, to),
        }
    }
}

/// Weighted-sum edge weight from decomposed signals, rounded to 2 decimals.
pub fn reference_weight(signals: &EdgeSignals) -> f64 {
    round2(
        W_IMPORT_STRENGTH * signals.import_strength
            + W_CO_CHANGE * signals.co_change_rate
            + W_MUTUAL_INFORMATION * signals.mutual_information
            + W_SEMANTIC_SIMILARITY * signals.semantic_similarity,
    )
}
