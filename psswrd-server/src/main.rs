use std::env;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use actix_web::middleware::Logger;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};

use clap::Parser;
use log::{info, warn};
use serde::Deserialize;
use psswrd_core::io::list_files;
use psswrd_core::{Generator, PsswrdError, DEFAULT_ORDER, DEFAULT_TEMPLATE};

/// Extension of the corpus files served from the data directory
const CORPUS_EXTENSION: &str = "txt";

/// Upper bound of `count` for `/v1/generate`
const MAX_COUNT: usize = 100;

/// Upper bound, in characters, of `template` for `/v1/generate`
const MAX_TEMPLATE_LEN: usize = 256;

/// Server configuration, from flags or environment
#[derive(Parser, Debug)]
#[command(name = "psswrd-server", about = "HTTP front end for the password generator", version)]
struct Config {
	/// Address to listen on
	#[arg(long, env = "PSSWRD_BIND", default_value = "127.0.0.1:5000")]
	bind: String,

	/// Directory holding the corpus files (*.txt)
	#[arg(long, env = "PSSWRD_DATA_DIR", default_value = "./data")]
	data_dir: String,

	/// Corpus loaded at startup (file name without extension)
	#[arg(long, env = "PSSWRD_CORPUS", default_value = "comet")]
	corpus: String,

	/// N-gram order used when a request does not give one
	#[arg(long, env = "PSSWRD_ORDER", default_value_t = DEFAULT_ORDER)]
	order: usize,
}

impl Config {
	/// Data directory as an absolute path.
	///
	/// Relative values are resolved against the working directory at startup.
	fn data_dir(&self) -> PathBuf {
		let dir = Path::new(&self.data_dir);
		if dir.is_absolute() {
			return dir.to_path_buf();
		}
		match env::current_dir() {
			Ok(cwd) => dir.components().fold(cwd, |path, part| match part {
				Component::CurDir => path,
				other => path.join(other),
			}),
			Err(e) => {
				warn!("cannot resolve {}: {e}", dir.display());
				dir.to_path_buf()
			}
		}
	}
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	template: Option<String>,
	count: Option<usize>,
}

/// Struct representing query parameters for the `/v1/load_corpus` endpoint
#[derive(Deserialize)]
struct CorpusQuery {
	name: Option<String>,
	order: Option<usize>,
}

struct SharedData {
	data_dir: PathBuf,
	default_order: usize,
	generator: RwLock<Generator>,
}

impl CorpusQuery {
	/// Validated corpus name: non-empty, no path component.
	fn corpus_name(&self) -> Result<&str, String> {
		match &self.name {
			Some(s) if !s.trim().is_empty() => {
				let name = s.trim();
				if name.contains(['/', '\\']) || name.starts_with('.') {
					Err("Corpus name must be a plain file name".into())
				} else {
					Ok(name)
				}
			}
			_ => Err("Missing or empty corpus name".into()),
		}
	}
}

/// Loads `<data_dir>/<name>.txt`.
fn load_generator(data_dir: &Path, name: &str, order: usize) -> Result<Generator, PsswrdError> {
	let path = data_dir.join(format!("{name}.{CORPUS_EXTENSION}"));
	Generator::from_file(path, order)
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` passwords (one per line) for `template`.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let template = query.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
	let count = query.count.unwrap_or(1);
	if count == 0 || count > MAX_COUNT {
		return HttpResponse::BadRequest().body(format!("Count must be between 1 and {MAX_COUNT}"));
	}
	if template.chars().count() > MAX_TEMPLATE_LEN {
		return HttpResponse::BadRequest().body(format!("Template must be at most {MAX_TEMPLATE_LEN} characters"));
	}

	let generator = match data.generator.read() {
		Ok(g) => g,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let passwords: Vec<String> = (0..count).map(|_| generator.generate(template)).collect();
	HttpResponse::Ok().body(passwords.join("\n"))
}

#[get("/v1/template")]
async fn get_template() -> impl Responder {
	HttpResponse::Ok().body(DEFAULT_TEMPLATE)
}

#[get("/v1/corpora")]
async fn get_corpora(data: web::Data<SharedData>) -> impl Responder {
	match list_files(&data.data_dir, CORPUS_EXTENSION) {
		Ok(files) => {
			let suffix = format!(".{CORPUS_EXTENSION}");
			let names: Vec<&str> = files.iter().filter_map(|f| f.strip_suffix(&suffix)).collect();
			HttpResponse::Ok().body(names.join("\n"))
		}
		Err(e) => {
			warn!("failed to list {}: {e}", data.data_dir.display());
			HttpResponse::InternalServerError().body("Failed to list corpora")
		}
	}
}

#[get("/v1/loaded_corpus")]
async fn get_loaded_corpus(data: web::Data<SharedData>) -> impl Responder {
	let generator = match data.generator.read() {
		Ok(g) => g,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	HttpResponse::Ok().body(format!("{}\n{}", generator.name(), generator.model().order()))
}

#[put("/v1/load_corpus")]
async fn put_corpus(data: web::Data<SharedData>, query: web::Query<CorpusQuery>) -> impl Responder {
	let name = match query.corpus_name() {
		Ok(name) => name,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let order = query.order.unwrap_or(data.default_order);

	// Build on the blocking pool and outside the lock, the previous model keeps serving meanwhile
	let data_dir = data.data_dir.clone();
	let corpus = name.to_owned();
	let generator = match web::block(move || load_generator(&data_dir, &corpus, order)).await {
		Ok(Ok(g)) => g,
		Ok(Err(e @ (PsswrdError::InvalidOrder { .. } | PsswrdError::EmptyCorpus { .. }))) => {
			return HttpResponse::BadRequest().body(format!("Failed to load corpus: {e}"));
		}
		Ok(Err(e)) => return HttpResponse::InternalServerError().body(format!("Failed to load corpus: {e}")),
		Err(e) => {
			warn!("corpus loader for '{name}' did not complete: {e}");
			return HttpResponse::InternalServerError().body("Failed to load corpus");
		}
	};

	let mut shared = match data.generator.write() {
		Ok(g) => g,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	info!("switched to corpus '{}' (order {})", name, order);
	*shared = generator;

	HttpResponse::Ok().body("Corpus loaded successfully")
}

fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated)
		.service(get_template)
		.service(get_corpora)
		.service(get_loaded_corpus)
		.service(put_corpus);
}

/// Main entry point for the server.
///
/// Builds the model of the startup corpus, shares it behind an `RwLock`
/// and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();
	let config = Config::parse();

	let data_dir = config.data_dir();
	let generator = load_generator(&data_dir, &config.corpus, config.order)
		.map_err(|e| std::io::Error::other(format!("failed to load corpus '{}': {e}", config.corpus)))?;
	info!("serving corpus '{}' from {} on {}", generator.name(), data_dir.display(), config.bind);

	let shared_data = web::Data::new(SharedData {
		data_dir,
		default_order: config.order,
		generator: RwLock::new(generator),
	});

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.app_data(shared_data.clone())
			.configure(configure)
	})
		.bind(config.bind.as_str())?
		.run()
		.await
}
