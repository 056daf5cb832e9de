//! psswrd: print pronounceable passwords from the command line.

use std::path::PathBuf;

use clap::Parser;
use log::debug;
use psswrd_core::io::clean_corpus;
use psswrd_core::{DEFAULT_ORDER, DEFAULT_TEMPLATE, Generator};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Corpus used when `--corpus` is not given
const BUNDLED_CORPUS: &str = include_str!("../../data/comet.txt");

#[derive(Parser)]
#[command(name = "psswrd")]
#[command(about = "Generate pronounceable passwords")]
#[command(version)]
struct Cli {
    /// Password template: u/l/m = upper/lower/mixed letter, d = digit,
    /// p = punctuation, anything else is copied
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Number of passwords to print
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// N-gram order of the letter model
    #[arg(short = 'n', long, default_value_t = DEFAULT_ORDER)]
    order: usize,

    /// Text file to learn letter statistics from (default: bundled story)
    #[arg(short = 'f', long)]
    corpus: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    // Build the model once, reused for every password
    let generator = match &cli.corpus {
        Some(path) => Generator::from_file(path, cli.order)?,
        None => Generator::new("comet", &clean_corpus(BUNDLED_CORPUS), cli.order)?,
    };
    debug!("model '{}' holds {} contexts", generator.name(), generator.model().len());

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    for _ in 0..cli.count {
        println!("{}", generator.generate_with_rng(&cli.template, &mut rng));
    }

    Ok(())
}
