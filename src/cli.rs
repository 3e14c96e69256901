use clap::Parser;
use std::path::PathBuf;

/// json-sift - cross-run deduplication filter for JSON streams
///
/// Reads a JSON array on stdin, prints the objects no prior run has seen
/// as a pretty-printed array on stdout, and records their identities in
/// an append-only cache file. The first run against a cache only primes
/// it and prints nothing.
#[derive(Parser, Debug)]
#[command(name = "json-sift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-run deduplication filter for JSON streams", long_about = None)]
pub struct Cli {
    /// Cache instance name
    #[arg(short = 'n', long, env = "JSON_SIFT_NAME", default_value = "default")]
    pub name: String,

    /// Cache directory (default: $XDG_CONFIG_HOME/json-sift)
    #[arg(long, env = "JSON_SIFT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Object field used as the identity instead of "id"
    #[arg(short = 'i', long, env = "JSON_SIFT_ID_KEY")]
    pub id_key: Option<String>,

    /// Enable debug output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
