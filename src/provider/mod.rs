//! Site-specific page strategies.
//!
//! A provider knows how to recognise one directory site's pages, pull raw
//! doctor entries out of them, and find the next page. The scrape loop only
//! talks to the [`DirectoryProvider`] trait; [`ProviderRegistry`] picks the
//! implementation.

pub mod medicosdoc;
pub mod registry;

use reqwest::Url;
use serde_json::Value;

use crate::error::Result;
use crate::models::{DoctorRecord, PageContext};

pub use medicosdoc::MedicosDocProvider;
pub use registry::ProviderRegistry;

/// One doctor entry exactly as the page published it.
pub type RawDoctor = Value;

pub trait DirectoryProvider {
    /// Name used by `--provider` and config files.
    fn name(&self) -> &'static str;

    /// Side-effect-free sniff of the first page.
    fn can_handle(&self, url: &Url, body: &str) -> bool;

    /// Raw entries on one page, in document order.
    fn fetch_doctors(&self, body: &str) -> Result<Vec<RawDoctor>>;

    fn doctor_specialty(&self, raw: &RawDoctor) -> Option<String>;

    /// # Errors
    /// `ScrapeError::Parse` when a required field is missing.
    fn to_record(&self, raw: &RawDoctor, ctx: &PageContext<'_>) -> Result<DoctorRecord>;

    /// `None` means the current page is the last one.
    fn next_page_url(&self, body: &str, current_url: &Url, page_index: usize) -> Option<Url>;

    /// Identity of a raw entry, used to spot pages that bring nothing new.
    fn entry_key(&self, raw: &RawDoctor) -> String {
        raw.to_string()
    }
}
