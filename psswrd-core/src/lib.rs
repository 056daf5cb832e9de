//! Pronounceable password generation library.
//!
//! This crate provides:
//! - A character-level n-gram model with suffix backoff
//! - Phrase generation following the letter statistics of a corpus
//! - A small template language mixing generated letters, random digits,
//!   random punctuation and literal characters
//! - Corpus cleaning and cached model loading
//!
//! The two entry points are [`build_model`] and [`generate_password`]:
//!
//! ```
//! let model = psswrd_core::build_model("thequickbrownfoxjumpsoverthelazydog", 3).unwrap();
//! let password = psswrd_core::generate_password(&model, "llllllllddd");
//! assert_eq!(password.len(), 11);
//! ```

/// Core n-gram model and password assembly.
pub mod model;

/// Corpus and file helpers (cleaning, paths, directory listing).
pub mod io;

/// Error types.
pub mod error;

pub use error::{PsswrdError, Result};
pub use model::generator::{Generator, generate_password_with_rng};
pub use model::ngram_model::NGramModel;
pub use model::template::DEFAULT_TEMPLATE;

/// Order used by the front ends when none is given.
pub const DEFAULT_ORDER: usize = 3;

/// Builds an n-gram model of order `order` from a cleaned corpus.
///
/// # Errors
/// - `InvalidOrder` if `order < 1`
/// - `EmptyCorpus` if the corpus has `order` characters or fewer
pub fn build_model(corpus: &str, order: usize) -> Result<NGramModel> {
	NGramModel::new(corpus, order)
}

/// Generates a password from a model and a template.
///
/// Never fails; the output has as many characters as the template.
pub fn generate_password(model: &NGramModel, template: &str) -> String {
	generate_password_with_rng(model, template, &mut rand::rng())
}

