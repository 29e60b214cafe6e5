//! Batch runs driven by a JSON config file.
//!
//! Every (directory, specialty) pair becomes one scrape and one output file
//! named `<directory-slug>-<specialty-slug>.<ext>` under `output_dir`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{Result, ScrapeError};
use crate::fetcher::PageFetcher;
use crate::models::{DirectoryRequest, OutputFormat};
use crate::output::write_records;
use crate::scraper::DirectoryScraper;
use crate::specialty::{normalize, slugify};

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub max_pages: Option<usize>,
    /// Keep going after a failed job instead of aborting the run.
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub url: String,
    pub specialties: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl RunConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RunConfig =
            serde_json::from_str(text).map_err(|e| ScrapeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_pages == Some(0) {
            return Err(ScrapeError::Config("max_pages must be at least 1".to_string()));
        }
        for entry in &self.directories {
            Url::parse(&entry.url).map_err(|e| {
                ScrapeError::Config(format!("directory url '{}' is invalid: {e}", entry.url))
            })?;
            if entry.specialties.is_empty() {
                warn!(url = %entry.url, "directory lists no specialties, nothing to do");
            }
        }
        Ok(())
    }

    /// (directory, specialty) pairs in config order, duplicates dropped.
    pub fn jobs(&self) -> Vec<Job<'_>> {
        let mut jobs = Vec::new();
        for entry in &self.directories {
            let mut seen = HashSet::new();
            for specialty in &entry.specialties {
                if seen.insert(normalize(specialty)) {
                    jobs.push(Job { entry, specialty });
                }
            }
        }
        jobs
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Job<'a> {
    pub entry: &'a DirectoryEntry,
    pub specialty: &'a str,
}

impl Job<'_> {
    pub fn file_stem(&self) -> String {
        format!("{}-{}", directory_slug(&self.entry.url), slugify(self.specialty))
    }

    pub fn file_name(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.file_stem(), format.extension())
    }
}

/// Slug of the directory URL's last path segment.
pub fn directory_slug(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|decoded| decoded.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
        })
        .unwrap_or_else(|| "directory".to_string());
    slugify(&segment)
}

#[derive(Debug)]
pub struct JobFailure {
    pub url: String,
    pub specialty: String,
    pub error: ScrapeError,
}

/// Summary of what was produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_written: Vec<PathBuf>,
    pub failures: Vec<JobFailure>,
}

pub struct ConfigRunner<F> {
    scraper: DirectoryScraper<F>,
}

impl<F: PageFetcher> ConfigRunner<F> {
    pub fn new(scraper: DirectoryScraper<F>) -> Self {
        Self { scraper }
    }

    pub fn scraper(&self) -> &DirectoryScraper<F> {
        &self.scraper
    }

    pub fn run(&self, config: &RunConfig) -> Result<RunSummary> {
        fs::create_dir_all(&config.output_dir)?;

        let jobs = config.jobs();
        info!(jobs = jobs.len(), output_dir = %config.output_dir.display(), "starting config run");

        let mut summary = RunSummary::default();
        let mut taken = HashSet::new();
        for (i, job) in jobs.iter().enumerate() {
            info!(
                job = i + 1,
                of = jobs.len(),
                url = %job.entry.url,
                specialty = job.specialty,
                "running job"
            );

            let path = claim_path(&config.output_dir, job, config.output_format, &mut taken);
            match self.run_job(config, job, &path) {
                Ok(()) => summary.files_written.push(path),
                Err(e) if config.continue_on_error => {
                    error!(url = %job.entry.url, specialty = job.specialty, error = %e, "job failed, continuing");
                    summary.failures.push(JobFailure {
                        url: job.entry.url.clone(),
                        specialty: job.specialty.to_string(),
                        error: e,
                    });
                }
                Err(e) => {
                    return Err(ScrapeError::Job {
                        url: job.entry.url.clone(),
                        specialty: job.specialty.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(
            written = summary.files_written.len(),
            failed = summary.failures.len(),
            "config run finished"
        );
        Ok(summary)
    }

    fn run_job(&self, config: &RunConfig, job: &Job<'_>, path: &Path) -> Result<()> {
        let request = DirectoryRequest::new(&job.entry.url, job.specialty)?
            .with_format(config.output_format)
            .with_max_pages(config.max_pages)
            .with_provider(job.entry.provider.clone());

        let report = self.scraper.scrape(&request)?;
        write_records(&report.records, config.output_format, Some(path))
    }
}

/// Output path for `job`, numbered `-2`, `-3`, ... when an earlier job in the
/// run already claimed the same name.
fn claim_path(
    dir: &Path,
    job: &Job<'_>,
    format: OutputFormat,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let mut path = dir.join(job.file_name(format));
    let mut n = 1;
    while taken.contains(&path) {
        n += 1;
        path = dir.join(format!("{}-{n}.{}", job.file_stem(), format.extension()));
    }
    if n > 1 {
        warn!(
            url = %job.entry.url,
            specialty = job.specialty,
            path = %path.display(),
            "output name already used in this run, numbering it"
        );
    }
    taken.insert(path.clone());
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RunConfig::from_json_str(
            r#"{"directories": [{"url": "https://medicosdoc.com/en/medical-directory-colombia", "specialties": ["Gynecologist"]}]}"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.max_pages, None);
        assert!(!config.continue_on_error);
        assert_eq!(config.directories[0].provider, None);
    }

    #[test]
    fn test_config_requires_url_and_specialties() {
        let missing_url = r#"{"directories": [{"specialties": ["Gynecologist"]}]}"#;
        let missing_list = r#"{"directories": [{"url": "https://medicosdoc.com/x"}]}"#;
        let bad_url = r#"{"directories": [{"url": "nope", "specialties": []}]}"#;

        for text in [missing_url, missing_list, bad_url] {
            assert!(matches!(
                RunConfig::from_json_str(text),
                Err(ScrapeError::Config(_))
            ));
        }
    }

    #[test]
    fn test_jobs_drop_duplicate_specialties() {
        let config = RunConfig::from_json_str(
            r#"{
                "output_format": "csv",
                "directories": [
                    {"url": "https://medicosdoc.com/en/a", "specialties": ["Ginecólogo", "ginecologo", "Oncólogo"]},
                    {"url": "https://medicosdoc.com/en/b", "specialties": ["Ginecólogo"]}
                ]
            }"#,
        )
        .unwrap();

        let names: Vec<String> = config
            .jobs()
            .iter()
            .map(|job| job.file_name(config.output_format))
            .collect();
        assert_eq!(
            names,
            vec!["a-ginecologo.csv", "a-oncologo.csv", "b-ginecologo.csv"]
        );
    }

    #[test]
    fn test_colliding_names_are_numbered() {
        let config = RunConfig::from_json_str(
            r#"{
                "directories": [
                    {"url": "https://medicosdoc.com/en/colombia", "specialties": ["Cirugía Plástica", "cirugia-plastica"]},
                    {"url": "https://medicosdoc.com/es/colombia", "specialties": ["Cirugía Plástica"]}
                ]
            }"#,
        )
        .unwrap();

        let dir = Path::new("out");
        let mut taken = HashSet::new();
        let paths: Vec<PathBuf> = config
            .jobs()
            .iter()
            .map(|job| claim_path(dir, job, config.output_format, &mut taken))
            .collect();
        assert_eq!(
            paths,
            vec![
                dir.join("colombia-cirugia-plastica.json"),
                dir.join("colombia-cirugia-plastica-2.json"),
                dir.join("colombia-cirugia-plastica-3.json"),
            ]
        );
    }

    #[test]
    fn test_directory_slug() {
        assert_eq!(
            directory_slug("https://medicosdoc.com/en/medical-directory-colombia"),
            "medical-directory-colombia"
        );
        assert_eq!(
            directory_slug("https://medicosdoc.com/en/Directorio%20Médico/"),
            "directorio-medico"
        );
        assert_eq!(directory_slug("https://medicosdoc.com/"), "directory");
    }
}
