use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::models::{DirectoryRequest, DoctorRecord, PageContext};
use crate::provider::ProviderRegistry;
use crate::specialty::SpecialtyMatcher;

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LastPage,
    NoNewEntries,
    PageLimit,
    /// A later page could not be fetched or parsed; earlier results are kept.
    PageFailed,
}

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub provider: &'static str,
    pub pages_fetched: usize,
    pub stop_reason: StopReason,
    pub records: Vec<DoctorRecord>,
}

/// Walks a paginated directory and keeps the doctors of one specialty.
pub struct DirectoryScraper<F> {
    fetcher: F,
    registry: ProviderRegistry,
}

impl<F: PageFetcher> DirectoryScraper<F> {
    pub fn new(fetcher: F, registry: ProviderRegistry) -> Self {
        Self { fetcher, registry }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one request to completion.
    ///
    /// Page 1 must be fetched and understood, otherwise the error is returned.
    /// Failures on later pages end pagination and keep what was collected.
    pub fn scrape(&self, request: &DirectoryRequest) -> Result<ScrapeReport> {
        request.validate()?;
        if let Some(name) = request.provider.as_deref() {
            // Fail on a bad name before touching the network.
            self.registry.get(name)?;
        }

        let matcher = SpecialtyMatcher::new(&request.specialty);
        let mut url = request.url.clone();
        let mut body = self.fetcher.fetch(&url)?;
        let provider = self
            .registry
            .select(&url, &body, request.provider.as_deref())?;

        let mut page_index = 1;
        let mut seen_entries = HashSet::new();
        let mut seen_records = HashSet::new();
        let mut records = Vec::new();

        let stop_reason = loop {
            let entries = match provider.fetch_doctors(&body) {
                Ok(entries) => entries,
                Err(e) if page_index == 1 => return Err(e),
                Err(e) => {
                    warn!(page = page_index, %url, error = %e, "unreadable page, stopping");
                    break StopReason::PageFailed;
                }
            };

            let ctx = PageContext {
                url: &url,
                body: &body,
                page_index,
                directory_url: &request.url,
            };

            let mut new_entries = 0;
            let mut kept = 0;
            for entry in &entries {
                if !seen_entries.insert(provider.entry_key(entry)) {
                    continue;
                }
                new_entries += 1;

                let Some(specialty) = provider.doctor_specialty(entry) else {
                    continue;
                };
                if !matcher.is_match(&specialty) {
                    continue;
                }

                match provider.to_record(entry, &ctx) {
                    Ok(record) => {
                        if seen_records.insert(record.identity_key()) {
                            records.push(record);
                            kept += 1;
                        }
                    }
                    Err(e) => warn!(page = page_index, error = %e, "skipping doctor entry"),
                }
            }

            info!(
                page = page_index,
                entries = entries.len(),
                new = new_entries,
                kept,
                specialty = matcher.requested(),
                "page extracted"
            );

            if new_entries == 0 {
                break StopReason::NoNewEntries;
            }
            if request.max_pages.is_some_and(|max| page_index >= max) {
                break StopReason::PageLimit;
            }
            let Some(next_url) = provider.next_page_url(&body, &url, page_index) else {
                break StopReason::LastPage;
            };

            match self.fetcher.fetch(&next_url) {
                Ok(next_body) => {
                    url = next_url;
                    body = next_body;
                    page_index += 1;
                }
                Err(e) => {
                    warn!(page = page_index + 1, error = %e, "fetch failed, keeping partial results");
                    break StopReason::PageFailed;
                }
            }
        };

        info!(
            provider = provider.name(),
            pages = page_index,
            records = records.len(),
            ?stop_reason,
            "scrape finished"
        );

        Ok(ScrapeReport {
            provider: provider.name(),
            pages_fetched: page_index,
            stop_reason,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::fetcher::StaticPages;
    use crate::specialty::SpecialtyMatcher;
    use serde_json::{json, Value};

    const DIRECTORY: &str = "https://medicosdoc.com/en/medical-directory-colombia";

    fn data_url(page: usize) -> String {
        format!(
            "https://medicosdoc.com/_next/data/b1/en/medical-directory-colombia.json?page={page}"
        )
    }

    fn doctor(id: &str, name: &str, specialty: &str) -> Value {
        json!({
            "ShortId": id,
            "Name": name,
            "LastName": "Test",
            "SubSpecialties": { "Specialty": { "SpecialityNameEnglish": specialty } },
            "Headquarters": { "CityId": { "Name": "Cali" } }
        })
    }

    fn first_page(doctors: Value, total_pages: u64) -> String {
        let next = json!({
            "buildId": "b1",
            "props": { "pageProps": { "directoryDoctors": {
                "data": doctors, "totalPages": total_pages
            }}}
        });
        format!(r#"<html><body><script id="__NEXT_DATA__" type="application/json">{next}</script></body></html>"#)
    }

    fn data_page(doctors: Value, total_pages: u64) -> String {
        json!({ "pageProps": { "directoryDoctors": {
            "data": doctors, "totalPages": total_pages
        }}})
        .to_string()
    }

    fn scraper(pages: StaticPages) -> DirectoryScraper<StaticPages> {
        DirectoryScraper::new(pages, ProviderRegistry::with_defaults())
    }

    fn request(specialty: &str) -> DirectoryRequest {
        DirectoryRequest::new(DIRECTORY, specialty).unwrap()
    }

    /// Five pages, one gynecologist each.
    fn five_pages() -> StaticPages {
        let mut pages = StaticPages::new().with_page(
            DIRECTORY,
            first_page(json!([doctor("d1", "Uno", "Gynecologist")]), 5),
        );
        for page in 2..=5 {
            pages.insert(
                &data_url(page),
                data_page(json!([doctor(&format!("d{page}"), "Otro", "Gynecologist")]), 5),
            );
        }
        pages
    }

    #[test]
    fn test_max_pages_caps_fetches() {
        let scraper = scraper(five_pages());
        let report = scraper
            .scrape(&request("Gynecologist").with_max_pages(Some(2)))
            .unwrap();

        assert_eq!(scraper.fetcher().requested().len(), 2);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.stop_reason, StopReason::PageLimit);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn test_walks_until_last_page() {
        let scraper = scraper(five_pages());
        let report = scraper.scrape(&request("gynecologist")).unwrap();

        assert_eq!(report.pages_fetched, 5);
        assert_eq!(report.stop_reason, StopReason::LastPage);
        let ids: Vec<_> = report.records.iter().filter_map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3", "d4", "d5"]);
    }

    #[test]
    fn test_repeated_entry_is_kept_once() {
        let pages = StaticPages::new()
            .with_page(
                DIRECTORY,
                first_page(
                    json!([doctor("a", "Ana", "Gynecologist"), doctor("b", "Beto", "Gynecologist")]),
                    3,
                ),
            )
            .with_page(
                &data_url(2),
                data_page(
                    json!([doctor("b", "Beto", "Gynecologist"), doctor("c", "Caro", "Gynecologist")]),
                    3,
                ),
            )
            .with_page(&data_url(3), data_page(json!([doctor("c", "Caro", "Gynecologist")]), 3));

        let report = scraper(pages).scrape(&request("Gynecologist")).unwrap();
        let ids: Vec<_> = report.records.iter().filter_map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(report.stop_reason, StopReason::NoNewEntries);
    }

    #[test]
    fn test_every_record_matches_requested_specialty() {
        let pages = StaticPages::new().with_page(
            DIRECTORY,
            first_page(
                json!([
                    doctor("a", "Ana", "Ginecólogo"),
                    doctor("b", "Beto", "Oncólogo"),
                    doctor("c", "Caro", "GINECOLOGO"),
                    doctor("d", "Dani", "Ginecólogo Obstetra")
                ]),
                1,
            ),
        );

        let report = scraper(pages).scrape(&request("ginecologo")).unwrap();
        assert_eq!(report.records.len(), 2);
        for record in &report.records {
            assert!(SpecialtyMatcher::matches(&record.specialty, "ginecologo"));
        }
    }

    #[test]
    fn test_later_fetch_failure_keeps_partial_results() {
        let pages = StaticPages::new().with_page(
            DIRECTORY,
            first_page(json!([doctor("a", "Ana", "Gynecologist")]), 4),
        );

        let report = scraper(pages).scrape(&request("Gynecologist")).unwrap();
        assert_eq!(report.stop_reason, StopReason::PageFailed);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_unreadable_later_page_keeps_partial_results() {
        let pages = StaticPages::new()
            .with_page(DIRECTORY, first_page(json!([doctor("a", "Ana", "Gynecologist")]), 3))
            .with_page(&data_url(2), "<html>oops</html>");

        let scraper = scraper(pages);
        let report = scraper.scrape(&request("Gynecologist")).unwrap();

        assert_eq!(report.stop_reason, StopReason::PageFailed);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(report.records.len(), 1);
        assert_eq!(scraper.fetcher().requested().len(), 2);
    }

    #[test]
    fn test_same_doctor_without_id_is_kept_once() {
        let mut first = doctor("", "Ana", "Gynecologist");
        first.as_object_mut().unwrap().remove("ShortId");
        let mut second = first.clone();
        second["Headquarters"]["Address"] = json!("Carrera 5 #1-2");

        let pages = StaticPages::new().with_page(DIRECTORY, first_page(json!([first, second]), 1));

        let report = scraper(pages).scrape(&request("Gynecologist")).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id, None);
        assert_eq!(report.records[0].identity_key(), "ana test|cali");
    }

    #[test]
    fn test_first_page_failure_is_fatal() {
        let result = scraper(StaticPages::new()).scrape(&request("Gynecologist"));
        assert!(matches!(result, Err(ScrapeError::Fetch { .. })));
    }

    #[test]
    fn test_unrecognised_first_page() {
        let pages = StaticPages::new().with_page(DIRECTORY, "<html><body>Maintenance</body></html>");
        let result = scraper(pages).scrape(&request("Gynecologist"));
        assert!(matches!(result, Err(ScrapeError::NoProviderMatched { .. })));
    }

    #[test]
    fn test_unknown_provider_fetches_nothing() {
        let scraper = scraper(five_pages());
        let result = scraper.scrape(&request("Gynecologist").with_provider(Some("unknown_x".into())));

        assert!(matches!(result, Err(ScrapeError::UnknownProvider { .. })));
        assert!(scraper.fetcher().requested().is_empty());
    }

    #[test]
    fn test_nameless_entry_is_skipped() {
        let mut nameless = doctor("x", "", "Gynecologist");
        nameless["LastName"] = json!("");
        let pages = StaticPages::new().with_page(
            DIRECTORY,
            first_page(json!([nameless, doctor("a", "Ana", "Gynecologist")]), 1),
        );

        let report = scraper(pages).scrape(&request("Gynecologist")).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "Ana Test");
    }

    #[test]
    fn test_zero_max_pages_fetches_nothing() {
        let scraper = scraper(five_pages());
        let result = scraper.scrape(&request("Gynecologist").with_max_pages(Some(0)));
        assert!(matches!(result, Err(ScrapeError::InvalidRequest(_))));
        assert!(scraper.fetcher().requested().is_empty());
    }
}
