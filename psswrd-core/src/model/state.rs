use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};


/// Represents one context of the n-gram table.
///
/// A `State` corresponds to a context string (`key`) of 1 to n characters and
/// stores every character observed right after it, weighted by how many times
/// it was observed.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during learning
/// - Predict the next character using weighted random sampling
/// - Merge with another state having the same key (parallel learning support)
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition occurrence count is strictly positive
/// - Transitions are ordered by character, so a seeded draw is reproducible
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct State {
	/// Context string.
	key: String,
	/// Outgoing transitions indexed by the next character.
	/// Example: { 'a' => 3, 'e' => 42 }
	transitions: BTreeMap<char, usize>
}

impl State {
	/// Creates a new empty state for the given context.
	pub fn new(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			transitions: BTreeMap::new(),
		}
	}

	/// Context this state was learned for.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Records an occurrence of a transition toward `next_char`.
	pub fn add_transition(&mut self, next_char: char) {
		*self.transitions.entry(next_char).or_insert(0) += 1;
	}

	/// Sum of all occurrence counts.
	pub fn total(&self) -> usize {
		self.transitions.values().sum()
	}

	/// Observed transitions in character order.
	pub fn transitions(&self) -> impl Iterator<Item = (char, usize)> + '_ {
		self.transitions.iter().map(|(c, occurrence)| (*c, *occurrence))
	}

	/// Predicts the next character using weighted random sampling.
	///
	/// The probability of selecting a character is proportional to its
	/// occurrence count. Builds the cumulative weights, draws once in
	/// `0..total` and binary searches the bucket holding the draw.
	///
	/// Returns `None` if the state has no transitions.
	pub fn predict<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
		let mut symbols = Vec::with_capacity(self.transitions.len());
		let mut cumulative = Vec::with_capacity(self.transitions.len());
		let mut total = 0;
		for (next_char, occurrence) in &self.transitions {
			total += occurrence;
			symbols.push(*next_char);
			cumulative.push(total);
		}
		if total == 0 {
			return None;
		}

		let draw = rng.random_range(0..total);
		symbols.get(bucket(&cumulative, draw)).copied()
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same context (`key`); the caller pairs
	/// them by key. Transition occurrence counts are summed.
	pub fn merge(&mut self, other: &Self) {
		debug_assert_eq!(self.key, other.key, "merging states of different contexts");
		for (next_char, occurrence) in &other.transitions {
			*self.transitions.entry(*next_char).or_insert(0) += *occurrence;
		}
	}
}

/// Index of the bucket holding `draw` in a strictly increasing cumulative
/// weight array. `draw` must be lower than the last bound.
pub(crate) fn bucket(cumulative: &[usize], draw: usize) -> usize {
	cumulative.partition_point(|&bound| bound <= draw)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn state(key: &str, chars: &str) -> State {
		let mut state = State::new(key);
		for c in chars.chars() {
			state.add_transition(c);
		}
		state
	}

	#[test]
	fn bucket_maps_draws_to_weight_ranges() {
		// weights 3, 1, 2
		let cumulative = [3, 4, 6];
		assert_eq!(bucket(&cumulative, 0), 0);
		assert_eq!(bucket(&cumulative, 2), 0);
		assert_eq!(bucket(&cumulative, 3), 1);
		assert_eq!(bucket(&cumulative, 4), 2);
		assert_eq!(bucket(&cumulative, 5), 2);
	}

	#[test]
	fn counts_accumulate() {
		let state = state("th", "eeae");
		assert_eq!(state.total(), 4);
		assert_eq!(state.transitions().collect::<Vec<_>>(), vec![('a', 1), ('e', 3)]);
	}

	#[test]
	fn empty_state_predicts_nothing() {
		let mut rng = StdRng::seed_from_u64(7);
		assert_eq!(State::new("x").predict(&mut rng), None);
	}

	#[test]
	fn single_transition_is_always_drawn() {
		let mut rng = StdRng::seed_from_u64(7);
		let state = state("q", "uuu");
		for _ in 0..50 {
			assert_eq!(state.predict(&mut rng), Some('u'));
		}
	}

	#[test]
	fn draws_follow_weights() {
		let mut rng = StdRng::seed_from_u64(11);
		let state = state("a", "bbbc");
		let draws = 10_000;
		let b = (0..draws).filter(|_| state.predict(&mut rng) == Some('b')).count();
		// Expected 7500
		assert!((7_200..7_800).contains(&b), "got {b}");
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = state("ab", "cc");
		left.merge(&state("ab", "cd"));
		assert_eq!(left.transitions().collect::<Vec<_>>(), vec![('c', 3), ('d', 1)]);
	}
}
