use rand::Rng;

use super::ngram_model::NGramModel;

/// Generates `length` characters from the model.
///
/// Each character is predicted from everything generated so far; the model
/// itself only looks at the last `n` characters. The first characters have no
/// known context and come from the model's uniform fallback.
pub fn generate_phrase<R: Rng + ?Sized>(model: &NGramModel, length: usize, rng: &mut R) -> String {
	let mut phrase = String::with_capacity(length);
	for _ in 0..length {
		let next_char = model.predict(&phrase, rng);
		phrase.push(next_char);
	}
	phrase
}
