use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PsswrdError, Result};
use crate::io;
use super::ngram_model::NGramModel;
use super::phrase::generate_phrase;
use super::template;

/// High-level password generator built around one n-gram model.
///
/// # Responsibilities
/// - Build or load the model of a corpus (with a binary cache next to it)
/// - Turn templates into passwords
///
/// The model is never modified after construction; a `Generator` can be
/// shared between threads and used concurrently.
#[derive(Debug, Clone)]
pub struct Generator {
	name: String,
	model: NGramModel,
}

impl Generator {
	/// Builds a generator from an already cleaned corpus.
	///
	/// # Errors
	/// Fails with `InvalidOrder` or `EmptyCorpus`, see [`NGramModel::new`].
	pub fn new(name: &str, corpus: &str, order: usize) -> Result<Self> {
		let model = NGramModel::new(corpus, order)?;
		Ok(Self { name: name.to_owned(), model })
	}

	/// Loads a generator from a raw text file.
	///
	/// - Reads and cleans the text.
	/// - Looks for a binary model `<stem>.<order>.bin` next to the file.
	/// - Uses `postcard` for compact serialization/deserialization.
	/// - Otherwise builds the model and writes the cache.
	///
	/// The cache stores a fingerprint of the cleaned corpus. A cache that
	/// fails to decode, fails validation, was built for another order or
	/// from another text is ignored and rebuilt. Failing to write the cache
	/// only logs a warning.
	pub fn from_file<P: AsRef<Path>>(filepath: P, order: usize) -> Result<Self> {
		let filepath = filepath.as_ref();
		let name = io::get_filename(filepath)?;
		let binary_data_path = io::build_output_path(filepath, &format!("{order}.bin"))?;

		let corpus = io::read_corpus(filepath)?;
		let fingerprint = fingerprint(&corpus);

		if binary_data_path.exists() {
			match Self::read_cache(&binary_data_path, order, fingerprint) {
				Ok(model) => {
					debug!("loaded model cache {}", binary_data_path.display());
					return Ok(Self { name, model });
				}
				Err(e) => warn!("ignoring model cache {}: {e}", binary_data_path.display()),
			}
		}

		info!("building order {} model from {} ({} letters)", order, filepath.display(), corpus.len());
		let model = NGramModel::new(&corpus, order)?;

		let cache = ModelCache { fingerprint, model };
		match postcard::to_stdvec(&cache) {
			Ok(bytes) => {
				if let Err(e) = std::fs::write(&binary_data_path, bytes) {
					warn!("could not write model cache {}: {e}", binary_data_path.display());
				}
			}
			Err(e) => warn!("could not encode model cache: {e}"),
		}

		Ok(Self { name, model: cache.model })
	}

	fn read_cache(path: &Path, order: usize, fingerprint: u64) -> Result<NGramModel> {
		let bytes = std::fs::read(path)?;
		let cache: ModelCache = postcard::from_bytes(&bytes)?;
		if cache.fingerprint != fingerprint {
			return Err(PsswrdError::InvalidModel("corpus changed since the cache was written".to_owned()));
		}
		cache.model.validate()?;
		if cache.model.order() != order {
			return Err(PsswrdError::InvalidModel(format!(
				"cache order {} does not match requested order {}",
				cache.model.order(),
				order
			)));
		}
		Ok(cache.model)
	}

	/// Name of the corpus the model was learned from.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The underlying model.
	pub fn model(&self) -> &NGramModel {
		&self.model
	}

	/// Generates a password using the thread-local random generator.
	pub fn generate(&self, template: &str) -> String {
		generate_password_with_rng(&self.model, template, &mut rand::rng())
	}

	/// Generates a password drawing from `rng`.
	///
	/// Identical model, template and seeded generator state yield identical
	/// passwords.
	pub fn generate_with_rng<R: Rng + ?Sized>(&self, template: &str, rng: &mut R) -> String {
		generate_password_with_rng(&self.model, template, rng)
	}
}

/// Content of a `.bin` model cache.
#[derive(Serialize, Deserialize)]
struct ModelCache {
	/// Fingerprint of the cleaned corpus the model was built from
	fingerprint: u64,
	model: NGramModel,
}

/// Hash of a cleaned corpus, used to detect edits behind a cache.
fn fingerprint(corpus: &str) -> u64 {
	let mut hasher = DefaultHasher::new();
	corpus.hash(&mut hasher);
	hasher.finish()
}

/// Generates a password from a model and a template, drawing from `rng`.
///
/// One phrase letter is generated per template character, even for
/// directives that do not use it, so the phrase is always long enough.
pub fn generate_password_with_rng<R: Rng + ?Sized>(model: &NGramModel, template: &str, rng: &mut R) -> String {
	let phrase = generate_phrase(model, template.chars().count(), rng);
	// Should not panic: the phrase has one letter per template character
	template::apply(template, &phrase, rng).expect("phrase is sized to the template")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	const CORPUS: &str = "whentheworldyouliveonisabouttobedestroyedinamatterofhours";

	#[test]
	fn default_template_shape() {
		let generator = Generator::new("test", CORPUS, 3).unwrap();
		let mut rng = StdRng::seed_from_u64(8);
		for _ in 0..100 {
			let password = generator.generate_with_rng(template::DEFAULT_TEMPLATE, &mut rng);
			let (letters, digits) = password.split_at(8);
			assert!(letters.chars().all(|c| c.is_ascii_lowercase()), "{password}");
			assert_eq!(digits.len(), 3);
			assert!(digits.chars().all(|c| c.is_ascii_digit()), "{password}");
		}
	}

	#[test]
	fn seeded_generation_is_reproducible() {
		let first = Generator::new("a", CORPUS, 3).unwrap();
		let second = Generator::new("b", CORPUS, 3).unwrap();
		for seed in 0..10 {
			assert_eq!(
				first.generate_with_rng("umlpdXumlpd", &mut StdRng::seed_from_u64(seed)),
				second.generate_with_rng("umlpdXumlpd", &mut StdRng::seed_from_u64(seed)),
			);
		}
	}

	#[test]
	fn unseeded_generation_keeps_length() {
		let generator = Generator::new("test", CORPUS, 2).unwrap();
		assert_eq!(generator.generate("").len(), 0);
		assert_eq!(generator.generate("uuuu-dddd").chars().count(), 9);
	}

	#[test]
	fn builds_and_caches_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("story.txt");
		std::fs::write(&path, "The comet, at 10:00 a.m.; was DISCOVERED!").unwrap();

		let built = Generator::from_file(&path, 2).unwrap();
		assert_eq!(built.name(), "story");
		assert!(built.model().contains("co"));
		assert!(!built.model().contains("1"));
		assert!(dir.path().join("story.2.bin").exists());

		let cached = Generator::from_file(&path, 2).unwrap();
		assert_eq!(cached.model(), built.model());

		let other_order = Generator::from_file(&path, 3).unwrap();
		assert_eq!(other_order.model().order(), 3);
		assert!(dir.path().join("story.3.bin").exists());
	}

	#[test]
	fn corrupt_cache_is_rebuilt() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("words.txt");
		std::fs::write(&path, "pronounceable").unwrap();
		std::fs::write(dir.path().join("words.3.bin"), [0xff, 0x00, 0x13]).unwrap();

		let generator = Generator::from_file(&path, 3).unwrap();
		assert_eq!(generator.model(), &NGramModel::new("pronounceable", 3).unwrap());
	}

	#[test]
	fn dotted_stems_get_their_own_cache() {
		let dir = tempfile::tempdir().unwrap();
		let story = dir.path().join("my.story.txt");
		let tale = dir.path().join("my.tale.txt");
		std::fs::write(&story, "aaaaaaaaaaaa").unwrap();
		std::fs::write(&tale, "zzzzzzzzzzzz").unwrap();

		let from_story = Generator::from_file(&story, 3).unwrap();
		let from_tale = Generator::from_file(&tale, 3).unwrap();
		assert!(dir.path().join("my.story.3.bin").exists());
		assert!(dir.path().join("my.tale.3.bin").exists());
		assert_eq!(from_story.name(), "my.story");
		assert!(from_story.model().contains("a"));
		assert!(from_tale.model().contains("z"));
		assert!(!from_tale.model().contains("a"));
	}

	#[test]
	fn edited_corpus_invalidates_the_cache() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("words.txt");
		std::fs::write(&path, "aaaaaaaaaa").unwrap();
		let before = Generator::from_file(&path, 2).unwrap();
		assert!(before.model().contains("aa"));

		std::fs::write(&path, "zzzzzzzzzz").unwrap();
		let after = Generator::from_file(&path, 2).unwrap();
		assert!(after.model().contains("zz"));
		assert!(!after.model().contains("a"));

		// The rewritten cache now matches the new text
		let cached = Generator::from_file(&path, 2).unwrap();
		assert_eq!(cached.model(), after.model());
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let result = Generator::from_file(dir.path().join("absent.txt"), 3);
		assert!(matches!(result, Err(PsswrdError::Io(_))));
	}

	#[test]
	fn short_file_is_an_empty_corpus() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tiny.txt");
		std::fs::write(&path, "a1 b2!").unwrap();
		let result = Generator::from_file(&path, 3);
		assert!(matches!(result, Err(PsswrdError::EmptyCorpus { length: 2, order: 3 })));
	}
}
