pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod output;
pub mod provider;
pub mod runner;
pub mod scraper;
pub mod specialty;

// Re-export main types
pub use error::{Result, ScrapeError};
pub use fetcher::{FetcherConfig, HttpFetcher, PageFetcher, StaticPages};
pub use models::{DirectoryRequest, DoctorRecord, OutputFormat, PageContext};
pub use output::{write_records, write_to};
pub use provider::{DirectoryProvider, MedicosDocProvider, ProviderRegistry, RawDoctor};
pub use runner::{ConfigRunner, RunConfig, RunSummary};
pub use self::scraper::{DirectoryScraper, ScrapeReport, StopReason};
pub use specialty::SpecialtyMatcher;
