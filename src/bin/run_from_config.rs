use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use medicosdoc_scraper::{
    logging, ConfigRunner, DirectoryScraper, FetcherConfig, HttpFetcher, ProviderRegistry,
    RunConfig,
};

#[derive(Parser)]
#[command(
    name = "run_from_config",
    about = "Run the medicosdoc scraper for every directory and specialty in a JSON config"
)]
struct Cli {
    /// Path to JSON config file listing directories and specialties
    #[arg(long)]
    config: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let config = RunConfig::from_path(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let fetcher = HttpFetcher::new(&FetcherConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..FetcherConfig::default()
    })?;
    let runner = ConfigRunner::new(DirectoryScraper::new(
        fetcher,
        ProviderRegistry::with_defaults(),
    ));

    let summary = runner.run(&config)?;
    for path in &summary.files_written {
        info!(path = %path.display(), "written");
    }

    if !summary.failures.is_empty() {
        for failure in &summary.failures {
            eprintln!("{} / {}: {}", failure.url, failure.specialty, failure.error);
        }
        bail!("{} job(s) failed", summary.failures.len());
    }
    Ok(())
}
