//! Top-level module for the password generation system.
//!
//! This module provides:
//! - The character n-gram table with suffix backoff (`NGramModel`)
//! - Weighted next-character counters (`State`)
//! - Phrase generation from a model (`generate_phrase`)
//! - The password template interpreter (`template`)
//! - A high-level generation interface (`Generator`)

/// High-level interface owning a model and producing passwords.
///
/// Exposes model building, cached loading from a corpus file and
/// template-driven generation.
pub mod generator;

/// Character n-gram model of order `n >= 1`.
///
/// Handles table construction (sequential or parallel), backoff lookup
/// and probabilistic next-character prediction.
pub mod ngram_model;

/// Phrase generation: repeated sampling with the generated text as context.
pub mod phrase;

/// Template mini-language turning a phrase into a password.
pub mod template;

/// Internal representation of one context of the table.
///
/// Tracks outgoing transitions and supports weighted random sampling.
/// This module is not exposed publicly.
mod state;
