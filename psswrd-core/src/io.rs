use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::fs;

use crate::error::{PsswrdError, Result};

/// Keeps the ASCII letters of a raw text, lowercased.
///
/// Whitespace, punctuation, digits and non-ASCII characters are dropped, so
/// the result only holds `a-z`.
pub fn clean_corpus(raw: &str) -> String {
	raw.chars()
		.filter(char::is_ascii_alphabetic)
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

/// Reads a text file and returns its cleaned content.
pub fn read_corpus<P: AsRef<Path>>(filename: P) -> Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(clean_corpus(&contents))
}

/// Builds an output path based on an input path and a new extension.
///
/// Examples:
/// - `data/input.txt` + `"3.bin"` → `data/input.3.bin`
/// - `data/my.story.txt` + `"3.bin"` → `data/my.story.3.bin`
pub fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| PsswrdError::InvalidPath(format!("{} has no filename", input_path.display())))?;

	// Appended, not set: dots inside the stem must survive
	let file_name = format!("{}.{output_extension}", file_stem.to_string_lossy());
	Ok(parent.join(file_name))
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/comet.txt"` → `"comet"`
/// - `"comet.txt"` → `"comet"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> Result<String> {
	let input_path = input_path.as_ref();
	let stem = input_path
		.file_stem()
		.ok_or_else(|| PsswrdError::InvalidPath(format!("{} has no filename", input_path.display())))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cleaning_keeps_lowercase_letters() {
		assert_eq!(clean_corpus("When the world--you live on!"), "whentheworldyouliveon");
		assert_eq!(clean_corpus("10:00 a.m. Friday"), "amfriday");
		assert_eq!(clean_corpus("snake_case café"), "snakecasecaf");
		assert_eq!(clean_corpus("1234 !?"), "");
	}

	#[test]
	fn output_path_replaces_extension() {
		let path = build_output_path("data/comet.txt", "3.bin").unwrap();
		assert_eq!(path, PathBuf::from("data/comet.3.bin"));
		let path = build_output_path("comet", "bin").unwrap();
		assert_eq!(path, PathBuf::from("comet.bin"));
		assert!(build_output_path("/", "bin").is_err());
	}

	#[test]
	fn output_path_keeps_dots_of_the_stem() {
		let story = build_output_path("data/my.story.txt", "3.bin").unwrap();
		let tale = build_output_path("data/my.tale.txt", "3.bin").unwrap();
		assert_eq!(story, PathBuf::from("data/my.story.3.bin"));
		assert_eq!(tale, PathBuf::from("data/my.tale.3.bin"));
	}

	#[test]
	fn filename_drops_folder_and_extension() {
		assert_eq!(get_filename("./data/comet.txt").unwrap(), "comet");
		assert_eq!(get_filename("comet.txt").unwrap(), "comet");
		assert!(matches!(get_filename(".."), Err(PsswrdError::InvalidPath(_))));
	}

	#[test]
	fn lists_files_by_extension() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::write(dir.path().join("a.3.bin"), "").unwrap();
		fs::create_dir(dir.path().join("nested.txt")).unwrap();
		assert_eq!(list_files(dir.path(), "txt").unwrap(), vec!["a.txt", "b.txt"]);
	}

	#[test]
	fn reads_and_cleans_a_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "Dee said, \"No--no.\"\n").unwrap();
		assert_eq!(read_corpus(&path).unwrap(), "deesaidnono");
	}
}
