//! # Safehall Safety
//!
//! Deterministic, heuristic content scoring. No models, no I/O, no global
//! state: an analyzer is built from a [`Lexicon`] and then only read.
//!
//! ## Scoring
//!
//! Each distinct matched term contributes once:
//!
//! - negative terms by tier: critical `1.0`, high `0.7`, mild `0.4`
//! - positive terms: `0.1` each
//!
//! ```text
//! safety    = clamp(0, 1, 1 - negative/2 + positive/4)
//! sentiment = clamp(-1, 1, positive - negative)
//! ```
//!
//! | safety | risk |
//! |--------|------|
//! | ≥ 0.8  | low |
//! | ≥ 0.6  | medium |
//! | ≥ 0.3  | high |
//! | else   | critical |
//!
//! ## Usage
//!
//! ```rust
//! use safehall_safety::{ContentAnalyzer, RiskLevel};
//!
//! let analyzer = ContentAnalyzer::standard().unwrap();
//! let assessment = analyzer.analyze("Can you help me with my homework?");
//! assert_eq!(assessment.risk_level, RiskLevel::Low);
//! ```

pub mod analyzer;
pub mod error;
pub mod lexicon;
pub mod starters;

pub use analyzer::{ContentAnalyzer, ContentAssessment, Sentiment, TRUSTED_ADULT_DIRECTIVE};
pub use error::{Result, SafetyError};
pub use lexicon::{Lexicon, NegativeTerm, TermCategory, TermTier};
pub use safehall_core::RiskLevel;
pub use starters::conversation_starters;
