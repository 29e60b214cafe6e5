use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use medicosdoc_scraper::{
    logging, write_records, DirectoryRequest, DirectoryScraper, FetcherConfig, HttpFetcher,
    OutputFormat, ProviderRegistry,
};

#[derive(Parser)]
#[command(
    name = "medicosdoc_scraper",
    about = "Scrape medicosdoc.com directories for doctors by specialty"
)]
struct Cli {
    /// Directory URL, e.g. https://medicosdoc.com/en/medical-directory-colombia
    #[arg(long)]
    url: String,

    /// Specialty to keep (case and accents are ignored)
    #[arg(long)]
    specialty: String,

    /// Output format: json or csv
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Write results here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Stop after this many pages (useful for quick tests)
    #[arg(long)]
    max_pages: Option<usize>,

    /// Force a provider instead of detecting it from the first page
    #[arg(long)]
    provider: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let fetcher = HttpFetcher::new(&FetcherConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..FetcherConfig::default()
    })?;
    let scraper = DirectoryScraper::new(fetcher, ProviderRegistry::with_defaults());

    let request = DirectoryRequest::new(&cli.url, cli.specialty.as_str())?
        .with_format(cli.format)
        .with_max_pages(cli.max_pages)
        .with_provider(cli.provider);

    let report = scraper
        .scrape(&request)
        .with_context(|| format!("scraping {} for '{}'", cli.url, cli.specialty))?;

    write_records(&report.records, cli.format, cli.output.as_deref())
        .context("writing output")?;

    info!(
        records = report.records.len(),
        pages = report.pages_fetched,
        provider = report.provider,
        "done"
    );
    Ok(())
}
