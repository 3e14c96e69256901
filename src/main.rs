use anyhow::Result;
use clap::Parser;

use json_sift::cli::Cli;
use json_sift::config::Config;
use json_sift::{logging, run};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize structured logging; stdout carries the data
    logging::init(cli.verbose);

    let config = Config::from(cli);
    let mut stdout = tokio::io::stdout();
    run::run(&config, tokio::io::stdin(), &mut stdout).await
}
