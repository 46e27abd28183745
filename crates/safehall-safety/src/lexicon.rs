//! Term tables for content analysis.
//!
//! A [`Lexicon`] is plain data: it is built once, handed to
//! [`ContentAnalyzer::new`](crate::ContentAnalyzer::new), and never mutated.
//! Institutions can ship their own tables through configuration.

use serde::{Deserialize, Serialize};

/// Weight tier of a negative term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermTier {
    /// Self-harm and violence.
    Critical,
    /// Harassment and acute distress.
    High,
    /// Mildly negative or inappropriate.
    Mild,
}

impl TermTier {
    /// Contribution to the negative score.
    pub fn weight(&self) -> f64 {
        match self {
            TermTier::Critical => 1.0,
            TermTier::High => 0.7,
            TermTier::Mild => 0.4,
        }
    }
}

/// What a negative term signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    SelfHarm,
    Violence,
    Harassment,
    Distress,
    Inappropriate,
    Mild,
}

/// A negative term with its weight tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeTerm {
    pub term: String,
    pub tier: TermTier,
    pub category: TermCategory,
}

impl NegativeTerm {
    pub fn new(term: impl Into<String>, tier: TermTier, category: TermCategory) -> Self {
        Self {
            term: term.into(),
            tier,
            category,
        }
    }
}

/// Weight of every positive term.
pub const POSITIVE_WEIGHT: f64 = 0.1;

/// The negative and positive term tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub negative: Vec<NegativeTerm>,
    pub positive: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::standard()
    }
}

impl Lexicon {
    /// An empty lexicon. Every message scores as safe and neutral.
    pub fn empty() -> Self {
        Self {
            negative: Vec::new(),
            positive: Vec::new(),
        }
    }

    /// The built-in tables for K-12 messaging.
    pub fn standard() -> Self {
        use TermCategory::*;
        use TermTier::*;

        let mut negative = Vec::new();
        let mut add = |terms: &[&str], tier: TermTier, category: TermCategory| {
            negative.extend(terms.iter().map(|t| NegativeTerm::new(*t, tier, category)));
        };

        add(
            &[
                "kill yourself",
                "hurt yourself",
                "suicide",
                "self harm",
                "hurt myself",
                "cut myself",
                "want to die",
                "end it all",
            ],
            Critical,
            SelfHarm,
        );
        add(&["kill", "murder", "bomb", "gun", "knife", "weapon", "shoot"], Critical, Violence);
        add(
            &[
                "hate",
                "hate you",
                "stupid",
                "idiot",
                "loser",
                "ugly",
                "worthless",
                "freak",
                "die",
                "nobody likes you",
            ],
            High,
            Harassment,
        );
        add(&["hurt", "beat up", "punch", "threat"], High, Violence);
        add(&["unsafe", "hopeless"], High, Distress);
        add(&["scared", "afraid", "depression", "cutting"], TermTier::Mild, Distress);
        add(
            &["sex", "naked", "porn", "drugs", "alcohol", "smoking", "drinking"],
            TermTier::Mild,
            Inappropriate,
        );
        add(
            &["dumb", "weird", "fat", "fight", "hit", "violence", "dangerous"],
            TermTier::Mild,
            TermCategory::Mild,
        );

        let positive = [
            "thank you",
            "thanks",
            "please",
            "help",
            "question",
            "understand",
            "learn",
            "explain",
            "clarify",
            "homework",
            "assignment",
            "project",
            "study",
            "good",
            "great",
            "awesome",
            "wonderful",
            "amazing",
            "excellent",
            "appreciate",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        Self { negative, positive }
    }
}
