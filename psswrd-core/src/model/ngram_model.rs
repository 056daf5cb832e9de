use std::collections::BTreeMap;
use std::ops::Range;
use std::thread;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::State;
use crate::error::{PsswrdError, Result};

/// Below this number of windows the table is counted on the calling thread.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Number of chunks per CPU when counting in parallel.
const CHUNK_FACTOR: usize = 4;

/// Character-level n-gram model with suffix backoff.
///
/// For every window of `n` characters of the corpus, the character that
/// follows it is recorded for the full window and for each of its shorter
/// suffixes. A context of length `k < n` therefore pools the observations of
/// every longer window ending with it, and the table holds contexts of every
/// length from 1 to `n`.
///
/// # Responsibilities
/// - Build the table from a cleaned corpus
/// - Predict the next character of a context, backing off to shorter suffixes
/// - Fall back to a uniformly chosen context when no suffix is known
///
/// # Invariants
/// - `n` is always >= 1
/// - `states` is non-empty and sorted by key, keys are unique
/// - Every state holds at least one transition
///
/// A model is immutable once built and can be shared between threads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NGramModel {
	/// The order of the model (longest context length)
	n: usize,

	/// One state per context, sorted by key
	states: Vec<State>,
}

impl NGramModel {
	/// Builds a model of order `n` from a cleaned corpus.
	///
	/// Large corpora are counted in parallel chunks and merged; the result is
	/// identical to a sequential count.
	///
	/// # Errors
	/// - `InvalidOrder` if `n < 1`
	/// - `EmptyCorpus` if the corpus has `n` characters or fewer
	pub fn new(corpus: &str, n: usize) -> Result<Self> {
		if n < 1 {
			return Err(PsswrdError::InvalidOrder { order: n });
		}
		let chars: Vec<char> = corpus.chars().collect();
		if chars.len() <= n {
			return Err(PsswrdError::EmptyCorpus { length: chars.len(), order: n });
		}

		let windows = chars.len() - n;
		let table = if windows < PARALLEL_THRESHOLD {
			count_windows(&chars, n, 0..windows)
		} else {
			count_parallel(&chars, n, num_cpus::get() * CHUNK_FACTOR)
		};

		let states: Vec<State> = table.into_values().collect();
		debug!("built order {} model: {} windows, {} contexts", n, windows, states.len());
		Ok(Self { n, states })
	}

	/// The order of the model.
	pub fn order(&self) -> usize {
		self.n
	}

	/// Number of contexts in the table.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// Always false for a built model.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Returns true if `context` is a key of the table.
	pub fn contains(&self, context: &str) -> bool {
		self.lookup(context).is_some()
	}

	/// Observed next characters and their counts for an exact context.
	pub fn weights(&self, context: &str) -> Option<Vec<(char, usize)>> {
		self.lookup(context).map(|state| state.transitions().collect())
	}

	/// Returns the table key the backoff would sample for `context`.
	///
	/// `None` means no suffix of the context is known and a prediction would
	/// use the uniform fallback.
	pub fn matched_context(&self, context: &str) -> Option<&str> {
		self.backoff(context).map(State::key)
	}

	/// Predicts the character following `context`.
	///
	/// Only the last `n` characters of the context are considered. The
	/// longest suffix present in the table is sampled. When no suffix is
	/// present (typically for an empty context), a context is chosen
	/// uniformly from the table and sampled instead.
	pub fn predict<R: Rng + ?Sized>(&self, context: &str, rng: &mut R) -> char {
		if let Some(next_char) = self.backoff(context).and_then(|state| state.predict(rng)) {
			return next_char;
		}

		let state = &self.states[rng.random_range(0..self.states.len())];
		// Should not panic: every state of a built model holds a transition
		state.predict(rng).expect("model states are never empty")
	}

	/// Checks the invariants of a model decoded from a cache.
	pub(crate) fn validate(&self) -> Result<()> {
		if self.n < 1 {
			return Err(PsswrdError::InvalidModel(format!("order {} is below 1", self.n)));
		}
		if self.states.is_empty() {
			return Err(PsswrdError::InvalidModel("no contexts".to_owned()));
		}
		if self.states.windows(2).any(|pair| pair[0].key() >= pair[1].key()) {
			return Err(PsswrdError::InvalidModel("contexts are not sorted".to_owned()));
		}
		for state in &self.states {
			let length = state.key().chars().count();
			if length == 0 || length > self.n {
				return Err(PsswrdError::InvalidModel(format!("context {:?} does not fit order {}", state.key(), self.n)));
			}
			if state.total() == 0 {
				return Err(PsswrdError::InvalidModel(format!("context {:?} has no transitions", state.key())));
			}
		}
		Ok(())
	}

	/// Exact lookup of a context.
	fn lookup(&self, context: &str) -> Option<&State> {
		self.states
			.binary_search_by(|state| state.key().cmp(context))
			.ok()
			.map(|index| &self.states[index])
	}

	/// Finds the longest known suffix of the last `n` characters of `context`.
	///
	/// Drops one leading character per miss, so at most `n` lookups are made.
	fn backoff(&self, context: &str) -> Option<&State> {
		let start = context
			.char_indices()
			.rev()
			.nth(self.n - 1)
			.map_or(0, |(index, _)| index);

		let mut key = &context[start..];
		while !key.is_empty() {
			if let Some(state) = self.lookup(key) {
				return Some(state);
			}
			let mut chars = key.chars();
			chars.next();
			key = chars.as_str();
		}
		None
	}
}

/// Counts the windows starting at `starts`.
///
/// Each window records its next character for the full context and every
/// shorter suffix.
fn count_windows(chars: &[char], n: usize, starts: Range<usize>) -> BTreeMap<String, State> {
	let mut table: BTreeMap<String, State> = BTreeMap::new();
	for i in starts {
		let next_char = chars[i + n];
		for start in i..i + n {
			let suffix: String = chars[start..i + n].iter().collect();
			table
				.entry(suffix)
				.or_insert_with_key(|key| State::new(key))
				.add_transition(next_char);
		}
	}
	table
}

/// Splits the window start indices into `chunks` ranges, counts each range
/// on its own thread and merges the partial tables.
///
/// Windows never straddle two ranges, so the merged counts match a
/// sequential count exactly.
fn count_parallel(chars: &[char], n: usize, chunks: usize) -> BTreeMap<String, State> {
	let windows = chars.len() - n;
	let chunk_size = windows.div_ceil(chunks.max(1));
	debug!("counting {} windows on {} chunks of {}", windows, windows.div_ceil(chunk_size), chunk_size);

	thread::scope(|scope| {
		let handles: Vec<_> = (0..windows)
			.step_by(chunk_size)
			.map(|start| {
				let end = (start + chunk_size).min(windows);
				scope.spawn(move || count_windows(chars, n, start..end))
			})
			.collect();

		let mut table: BTreeMap<String, State> = BTreeMap::new();
		for handle in handles {
			let partial = match handle.join() {
				Ok(partial) => partial,
				Err(panic) => std::panic::resume_unwind(panic),
			};
			for (key, state) in partial {
				match table.get_mut(&key) {
					Some(existing) => existing.merge(&state),
					None => {
						table.insert(key, state);
					}
				}
			}
		}
		table
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn rejects_order_zero() {
		assert!(matches!(NGramModel::new("abcdef", 0), Err(PsswrdError::InvalidOrder { order: 0 })));
	}

	#[test]
	fn rejects_corpus_without_window() {
		assert!(matches!(NGramModel::new("abc", 3), Err(PsswrdError::EmptyCorpus { length: 3, order: 3 })));
		assert!(matches!(NGramModel::new("", 1), Err(PsswrdError::EmptyCorpus { length: 0, order: 1 })));
		assert!(NGramModel::new("abcd", 3).is_ok());
	}

	#[test]
	fn records_every_suffix_of_each_window() {
		let model = NGramModel::new("abcabd", 2).unwrap();
		assert_eq!(model.order(), 2);
		// ab->c, bc->a, ca->b, ab->d plus their one-character suffixes
		assert_eq!(model.len(), 6);
		assert_eq!(model.weights("ab"), Some(vec![('c', 1), ('d', 1)]));
		assert_eq!(model.weights("b"), Some(vec![('c', 1), ('d', 1)]));
		assert_eq!(model.weights("bc"), Some(vec![('a', 1)]));
		assert_eq!(model.weights("c"), Some(vec![('a', 1)]));
		assert_eq!(model.weights("ca"), Some(vec![('b', 1)]));
		// The leading 'a' never ends a window
		assert_eq!(model.weights("a"), Some(vec![('b', 1)]));
		assert_eq!(model.weights("abc"), None);
	}

	#[test]
	fn shorter_contexts_pool_longer_windows() {
		let model = NGramModel::new("xaybzab", 2).unwrap();
		// xa->y, za->b both end with 'a'
		assert_eq!(model.weights("a"), Some(vec![('b', 1), ('y', 1)]));
		assert_eq!(model.weights("xa"), Some(vec![('y', 1)]));
		assert_eq!(model.weights("za"), Some(vec![('b', 1)]));
	}

	#[test]
	fn order_one_counts_bigrams() {
		let model = NGramModel::new("aab", 1).unwrap();
		assert_eq!(model.weights("a"), Some(vec![('a', 1), ('b', 1)]));
		assert!(!model.contains("b"));
	}

	#[test]
	fn backoff_uses_longest_known_suffix() {
		let model = NGramModel::new("xabcd", 3).unwrap();
		assert_eq!(model.matched_context("abc"), Some("abc"));
		assert_eq!(model.matched_context("zbc"), Some("bc"));
		assert_eq!(model.matched_context("zzc"), Some("c"));
		// Only the last n characters are considered
		assert_eq!(model.matched_context("qqqqxab"), Some("xab"));
		assert_eq!(model.matched_context("zzz"), None);
		assert_eq!(model.matched_context(""), None);

		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..20 {
			assert_eq!(model.predict("zbc", &mut rng), 'd');
		}
	}

	#[test]
	fn fallback_draws_from_the_table() {
		let model = NGramModel::new("abcabcabd", 2).unwrap();
		let mut rng = StdRng::seed_from_u64(5);
		for _ in 0..100 {
			let c = model.predict("", &mut rng);
			assert!("abcd".contains(c), "unexpected {c}");
			let c = model.predict("zz", &mut rng);
			assert!("abcd".contains(c), "unexpected {c}");
		}
	}

	#[test]
	fn parallel_count_matches_sequential() {
		let corpus: Vec<char> = "thequickbrownfoxjumpsoverthelazydog".repeat(20).chars().collect();
		for n in 1..=4 {
			let sequential = count_windows(&corpus, n, 0..corpus.len() - n);
			for chunks in [1, 3, 7, 64, 10_000] {
				assert_eq!(count_parallel(&corpus, n, chunks), sequential, "n={n} chunks={chunks}");
			}
		}
	}

	#[test]
	fn built_models_validate() {
		let model = NGramModel::new("hellohello", 3).unwrap();
		assert!(model.validate().is_ok());
		let broken = NGramModel { n: 3, states: Vec::new() };
		assert!(matches!(broken.validate(), Err(PsswrdError::InvalidModel(_))));
	}

	#[test]
	fn model_is_shareable() {
		fn assert_send_sync<T: Send + Sync>() {}
		assert_send_sync::<NGramModel>();
	}
}
