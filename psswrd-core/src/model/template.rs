use rand::Rng;

use crate::error::{PsswrdError, Result};

/// Template used when the caller does not provide one:
/// eight letters followed by three digits.
pub const DEFAULT_TEMPLATE: &str = "llllllllddd";

/// Characters drawn by the `d` directive.
pub const DIGITS: &[u8] = b"0123456789";

/// Characters drawn by the `p` directive.
pub const PUNCTUATION: &[u8] = b"!@#$%&*+-=?;";

/// Meaning of one template character.
///
/// Matching is case-sensitive: `U`, `L`, `M`, `D` and `P` are literals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
	/// `u`: next phrase letter, uppercased
	Upper,
	/// `l`: next phrase letter, lowercased
	Lower,
	/// `m`: next phrase letter, case picked at random
	Mixed,
	/// `d`: random decimal digit
	Digit,
	/// `p`: random punctuation mark
	Punctuation,
	/// Anything else, copied as is
	Literal(char),
}

impl From<char> for Directive {
	fn from(c: char) -> Self {
		match c {
			'u' => Directive::Upper,
			'l' => Directive::Lower,
			'm' => Directive::Mixed,
			'd' => Directive::Digit,
			'p' => Directive::Punctuation,
			other => Directive::Literal(other),
		}
	}
}

impl Directive {
	/// Returns true if the directive takes a letter from the phrase.
	pub fn consumes_letter(self) -> bool {
		matches!(self, Directive::Upper | Directive::Lower | Directive::Mixed)
	}
}

/// Number of phrase letters a template consumes.
pub fn letters_needed(template: &str) -> usize {
	template.chars().filter(|c| Directive::from(*c).consumes_letter()).count()
}

/// Assembles a password from a template and a generated phrase.
///
/// Phrase letters are consumed left to right, one per letter directive.
/// Digits and punctuation are drawn uniformly and independently of the
/// phrase. The output always has as many characters as the template.
///
/// # Errors
/// Returns `PhraseExhausted` if the phrase is shorter than the number of
/// letter directives. Nothing is drawn from `rng` in that case.
pub fn apply<R: Rng + ?Sized>(template: &str, phrase: &str, rng: &mut R) -> Result<String> {
	let needed = letters_needed(template);
	let available = phrase.chars().count();
	if available < needed {
		return Err(PsswrdError::PhraseExhausted { needed, available });
	}

	let mut letters = phrase.chars();
	let mut password = String::with_capacity(template.len());
	for c in template.chars() {
		let out = match Directive::from(c) {
			Directive::Upper => next_letter(&mut letters).to_ascii_uppercase(),
			Directive::Lower => next_letter(&mut letters).to_ascii_lowercase(),
			Directive::Mixed => {
				let letter = next_letter(&mut letters);
				if rng.random_bool(0.5) {
					letter.to_ascii_uppercase()
				} else {
					letter.to_ascii_lowercase()
				}
			}
			Directive::Digit => pick(DIGITS, rng),
			Directive::Punctuation => pick(PUNCTUATION, rng),
			Directive::Literal(literal) => literal,
		};
		password.push(out);
	}
	Ok(password)
}

fn next_letter(letters: &mut std::str::Chars<'_>) -> char {
	// Should not panic: the phrase length is checked before assembling
	letters.next().expect("phrase holds a letter per letter directive")
}

fn pick<R: Rng + ?Sized>(pool: &[u8], rng: &mut R) -> char {
	char::from(pool[rng.random_range(0..pool.len())])
}
