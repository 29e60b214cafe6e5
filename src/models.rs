use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::{Result, ScrapeError};
use crate::specialty::normalize;

/// One doctor, normalized for output. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: Option<String>,
    pub name: String,
    pub specialty: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub medical_center: Option<String>,
    pub office: Option<String>,
    pub highlighted_services: Option<String>,
    /// Kept as the site published it, so `150000` stays an integer.
    pub consult_value: Option<Number>,
    pub premium: bool,
    pub rating_average: Option<f64>,
    pub rating_count: Option<u64>,
    pub photo_url: Option<String>,
    pub source_url: String,
}

impl DoctorRecord {
    pub const FIELDS: [&'static str; 14] = [
        "id",
        "name",
        "specialty",
        "city",
        "address",
        "medical_center",
        "office",
        "highlighted_services",
        "consult_value",
        "premium",
        "rating_average",
        "rating_count",
        "photo_url",
        "source_url",
    ];

    /// Key used to drop the same doctor seen on more than one page.
    pub fn identity_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!(
                "{}|{}",
                self.name.to_lowercase(),
                self.city.as_deref().unwrap_or_default().to_lowercase()
            ),
        }
    }

    /// Cell values in `FIELDS` order; absent values become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            opt(&self.id),
            self.name.clone(),
            self.specialty.clone(),
            opt(&self.city),
            opt(&self.address),
            opt(&self.medical_center),
            opt(&self.office),
            opt(&self.highlighted_services),
            opt(&self.consult_value),
            self.premium.to_string(),
            opt(&self.rating_average),
            opt(&self.rating_count),
            opt(&self.photo_url),
            self.source_url.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ScrapeError::InvalidRequest(format!(
                "unknown output format '{other}' (expected json or csv)"
            ))),
        }
    }
}

/// One scrape run: a directory URL filtered down to a single specialty.
#[derive(Debug, Clone)]
pub struct DirectoryRequest {
    pub url: Url,
    pub specialty: String,
    pub format: OutputFormat,
    pub max_pages: Option<usize>,
    pub provider: Option<String>,
}

impl DirectoryRequest {
    pub fn new(url: &str, specialty: impl Into<String>) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ScrapeError::InvalidRequest(format!("bad directory URL '{url}': {e}")))?;
        Ok(Self {
            url,
            specialty: specialty.into(),
            format: OutputFormat::default(),
            max_pages: None,
            provider: None,
        })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if normalize(&self.specialty).is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "specialty must not be blank".to_string(),
            ));
        }
        if self.max_pages == Some(0) {
            return Err(ScrapeError::InvalidRequest(
                "max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A fetched page, handed to the provider while it is extracted.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub url: &'a Url,
    pub body: &'a str,
    /// 1-based.
    pub page_index: usize,
    pub directory_url: &'a Url,
}
