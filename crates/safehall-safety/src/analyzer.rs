//! Keyword and sentiment risk scoring.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use safehall_core::RiskLevel;

use crate::error::{Result, SafetyError};
use crate::lexicon::{Lexicon, TermCategory, POSITIVE_WEIGHT};

/// Shown whenever anything is flagged.
pub const REPHRASE_SUGGESTIONS: [&str; 2] = [
    "Consider rephrasing your message in a more respectful way",
    "Try expressing your feelings in a constructive way",
];

/// Shown when sentiment is strongly negative.
pub const EMPATHY_SUGGESTIONS: [&str; 2] = [
    "Take a moment to think about how your message might make others feel",
    "Consider asking for help or talking to a trusted adult",
];

/// Shown for any self-harm term. Never suppressed.
pub const TRUSTED_ADULT_DIRECTIVE: &str =
    "If you're having thoughts of self-harm, please talk to a counselor or trusted adult immediately";

const EMPATHY_THRESHOLD: f64 = -0.5;

/// Coarse label for the sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Sentiment::Positive
        } else if score < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Result of analyzing one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAssessment {
    /// 0 is unsafe, 1 is safe.
    pub safety_score: f64,
    /// -1 is hostile, 1 is friendly.
    pub sentiment_score: f64,
    pub sentiment: Sentiment,
    pub flagged_terms: BTreeSet<String>,
    pub risk_level: RiskLevel,
    pub suggestions: Vec<String>,
    /// At least one self-harm term matched.
    pub self_harm_signal: bool,
}

impl ContentAssessment {
    /// Assessment of a message with no matches.
    pub fn clean() -> Self {
        Self {
            safety_score: 1.0,
            sentiment_score: 0.0,
            sentiment: Sentiment::Neutral,
            flagged_terms: BTreeSet::new(),
            risk_level: RiskLevel::Low,
            suggestions: Vec::new(),
            self_harm_signal: false,
        }
    }

    /// Whether escalation must create an incident.
    pub fn is_critical(&self) -> bool {
        self.risk_level == RiskLevel::Critical
    }
}

struct CompiledTerm {
    term: String,
    pattern: Regex,
    weight: f64,
    self_harm: bool,
}

/// Stateless content analyzer over an immutable lexicon.
///
/// Matching is case-insensitive and whole-word: "hit" does not match
/// "white". Each distinct term counts once, however often it repeats.
pub struct ContentAnalyzer {
    negative: Vec<CompiledTerm>,
    positive: Vec<CompiledTerm>,
}

impl ContentAnalyzer {
    /// Compile a lexicon.
    pub fn new(lexicon: Lexicon) -> Result<Self> {
        let negative = lexicon
            .negative
            .into_iter()
            .map(|n| compile(n.term, n.tier.weight(), n.category == TermCategory::SelfHarm))
            .collect::<Result<Vec<_>>>()?;

        let positive = lexicon
            .positive
            .into_iter()
            .map(|term| compile(term, POSITIVE_WEIGHT, false))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { negative, positive })
    }

    /// Analyzer over [`Lexicon::standard`].
    pub fn standard() -> Result<Self> {
        Self::new(Lexicon::standard())
    }

    /// Score a message.
    pub fn analyze(&self, text: &str) -> ContentAssessment {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return ContentAssessment::clean();
        }

        let mut flagged_terms = BTreeSet::new();
        let mut negative_score = 0.0;
        let mut self_harm_signal = false;
        for term in self.negative.iter().filter(|t| t.pattern.is_match(&lower)) {
            if flagged_terms.insert(term.term.clone()) {
                negative_score += term.weight;
                self_harm_signal |= term.self_harm;
            }
        }

        let mut positive_terms = BTreeSet::new();
        let mut positive_score = 0.0;
        for term in self.positive.iter().filter(|t| t.pattern.is_match(&lower)) {
            if positive_terms.insert(term.term.as_str()) {
                positive_score += term.weight;
            }
        }

        let safety_score = (1.0 - negative_score / 2.0 + positive_score / 4.0).clamp(0.0, 1.0);
        let sentiment_score = (positive_score - negative_score).clamp(-1.0, 1.0);

        let mut suggestions = Vec::new();
        if !flagged_terms.is_empty() {
            suggestions.extend(REPHRASE_SUGGESTIONS.iter().map(|s| s.to_string()));
        }
        if sentiment_score < EMPATHY_THRESHOLD {
            suggestions.extend(EMPATHY_SUGGESTIONS.iter().map(|s| s.to_string()));
        }
        if self_harm_signal {
            suggestions.push(TRUSTED_ADULT_DIRECTIVE.to_string());
        }

        ContentAssessment {
            safety_score,
            sentiment_score,
            sentiment: Sentiment::from_score(sentiment_score),
            flagged_terms,
            risk_level: RiskLevel::from_safety_score(safety_score),
            suggestions,
            self_harm_signal,
        }
    }
}

impl std::fmt::Debug for ContentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAnalyzer")
            .field("negative_terms", &self.negative.len())
            .field("positive_terms", &self.positive.len())
            .finish()
    }
}

/// Whole-word, whole-phrase matcher over lowercased text.
fn compile(term: String, weight: f64, self_harm: bool) -> Result<CompiledTerm> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Err(SafetyError::EmptyTerm);
    }

    let pattern = Regex::new(&format!(r"(?:^|\W){}(?:\W|$)", regex::escape(&term))).map_err(|e| {
        SafetyError::InvalidTerm {
            term: term.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok(CompiledTerm {
        term,
        pattern,
        weight,
        self_harm,
    })
}
