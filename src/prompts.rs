//! Instruction text sent with each page image.
//!
//! SmolDocling was fine-tuned on a handful of fixed instructions; this one
//! asks for a full-page DocTags conversion. Other wording degrades output
//! rather than steering it, so overrides via
//! [`crate::config::ExtractionConfig::prompt`] are meant for experiments.

/// Full-page conversion instruction.
pub const DOCTAGS_PROMPT: &str = "Convert this page to docling.";
