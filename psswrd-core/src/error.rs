//! Error types for model construction and corpus handling.
//!
//! Only building (or loading) a model can fail. Once a model exists,
//! password generation is total.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, PsswrdError>;

/// Errors raised while building, loading or feeding an n-gram model.
#[derive(Debug, Error)]
pub enum PsswrdError {
	/// The model order must be at least 1.
	#[error("invalid order {order}, must be >= 1")]
	InvalidOrder { order: usize },

	/// The corpus is too short to hold a single window of `order + 1` characters.
	#[error("corpus too short: {length} characters for order {order}")]
	EmptyCorpus { length: usize, order: usize },

	/// The template needs more phrase letters than were supplied.
	#[error("phrase exhausted: template needs {needed} letters, phrase has {available}")]
	PhraseExhausted { needed: usize, available: usize },

	/// A cached model failed validation after decoding.
	#[error("invalid model: {0}")]
	InvalidModel(String),

	/// Path without a usable file name.
	#[error("invalid path: {0}")]
	InvalidPath(String),

	/// I/O error while reading a corpus or a model cache.
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	/// Model cache encoding or decoding failed.
	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}
