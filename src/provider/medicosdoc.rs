//! medicosdoc.com directory pages.
//!
//! The site is a Next.js app. Page 1 is server-rendered HTML carrying the
//! directory in `<script id="__NEXT_DATA__">`; every later page comes from the
//! JSON data route `/_next/data/<buildId>/<path>.json?page=N`.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::{Number, Value};
use tracing::{debug, warn};

use super::{DirectoryProvider, RawDoctor};
use crate::error::{Result, ScrapeError};
use crate::models::{DoctorRecord, PageContext};

pub const NAME: &str = "medicosdoc";

fn data_route() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/_next/data/[^/]+/.+\.json$").unwrap())
}

/// What one page tells us about the directory.
struct Payload {
    build_id: Option<String>,
    directory: Value,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MedicosDocProvider;

impl MedicosDocProvider {
    pub fn new() -> Self {
        Self
    }

    fn payload(&self, body: &str) -> Result<Payload> {
        let trimmed = body.trim_start();

        let (build_id, directory) = if trimmed.starts_with('{') {
            // Data route response
            let json: Value = serde_json::from_str(trimmed)
                .map_err(|e| ScrapeError::parse(format!("data route is not JSON: {e}")))?;
            (None, json.pointer("/pageProps/directoryDoctors").cloned())
        } else {
            let json = next_data(body)
                .ok_or_else(|| ScrapeError::parse("Could not locate __NEXT_DATA__ on the page"))?;
            let build_id = json
                .get("buildId")
                .and_then(Value::as_str)
                .map(str::to_string);
            (build_id, json.pointer("/props/pageProps/directoryDoctors").cloned())
        };

        match directory {
            Some(directory) if directory.as_object().is_some_and(|o| !o.is_empty()) => {
                Ok(Payload { build_id, directory })
            }
            _ => Err(ScrapeError::parse("Directory data missing from payload")),
        }
    }
}

impl DirectoryProvider for MedicosDocProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn can_handle(&self, _url: &Url, body: &str) -> bool {
        self.payload(body).is_ok()
    }

    fn fetch_doctors(&self, body: &str) -> Result<Vec<RawDoctor>> {
        let payload = self.payload(body)?;
        let doctors = payload
            .directory
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        debug!(count = doctors.len(), "extracted raw doctor entries");
        Ok(doctors)
    }

    fn doctor_specialty(&self, raw: &RawDoctor) -> Option<String> {
        let specialty = raw.pointer("/SubSpecialties/Specialty")?;
        text(specialty.get("SpecialityNameEnglish")).or_else(|| text(specialty.get("SpecialityName")))
    }

    fn to_record(&self, raw: &RawDoctor, ctx: &PageContext<'_>) -> Result<DoctorRecord> {
        let name = build_name(raw);
        if name.is_empty() {
            return Err(ScrapeError::parse(format!(
                "doctor entry on page {} has no name",
                ctx.page_index
            )));
        }

        let head = raw.get("Headquarters");
        let ratings = raw.get("RatingsSummary");

        let photo_url = text(raw.get("Photos")).and_then(|photo| {
            ctx.directory_url
                .join("/")
                .and_then(|root| root.join(&photo))
                .ok()
                .map(String::from)
        });

        Ok(DoctorRecord {
            id: self.doctor_id(raw),
            name,
            specialty: self.doctor_specialty(raw).unwrap_or_default(),
            city: text(head.and_then(|h| h.pointer("/CityId/Name"))),
            address: text(head.and_then(|h| h.get("Address"))),
            medical_center: text(head.and_then(|h| h.get("MedicalCenter"))),
            office: text(head.and_then(|h| h.get("Office"))),
            highlighted_services: services(raw.get("HighlightedServicesEnglish"))
                .or_else(|| services(raw.get("HighlightedServices"))),
            consult_value: amount(raw.get("ConsultValue")),
            premium: truthy(raw.get("Premium")),
            rating_average: number(ratings.and_then(|r| r.get("averageRating"))),
            rating_count: count(ratings.and_then(|r| r.get("numberOfRatings"))),
            photo_url,
            source_url: ctx.directory_url.to_string(),
        })
    }

    fn next_page_url(&self, body: &str, current_url: &Url, page_index: usize) -> Option<Url> {
        let payload = self.payload(body).ok()?;
        let total = total_pages(&payload.directory);
        if page_index as u64 >= total {
            return None;
        }
        let query = format!("page={}", page_index + 1);

        if data_route().is_match(current_url.path()) {
            let mut next = current_url.clone();
            next.set_query(Some(&query));
            return Some(next);
        }

        let Some(build_id) = payload.build_id else {
            warn!(url = %current_url, "Could not find buildId; site layout may have changed");
            return None;
        };

        let mut next = current_url
            .join(&format!("/_next/data/{}/{}.json", build_id, data_path(current_url)))
            .ok()?;
        next.set_query(Some(&query));
        Some(next)
    }

    fn entry_key(&self, raw: &RawDoctor) -> String {
        self.doctor_id(raw).unwrap_or_else(|| raw.to_string())
    }
}

impl MedicosDocProvider {
    fn doctor_id(&self, raw: &RawDoctor) -> Option<String> {
        text(raw.get("ShortId")).or_else(|| text(raw.get("_id")))
    }
}

fn next_data(body: &str) -> Option<Value> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("script#__NEXT_DATA__").unwrap();
    let script = document.select(&selector).next()?;
    let json = script.text().collect::<String>();
    serde_json::from_str(&json).ok()
}

/// Path segment the data route is keyed on.
fn data_path(directory_url: &Url) -> String {
    let path = directory_url.path().trim_matches('/');
    if path.is_empty() {
        "index".to_string()
    } else {
        path.to_string()
    }
}

fn total_pages(directory: &Value) -> u64 {
    number(directory.get("totalPages"))
        .filter(|n| *n >= 1.0)
        .map(|n| n as u64)
        .unwrap_or(1)
}

fn build_name(raw: &RawDoctor) -> String {
    let first = raw.get("Name").and_then(Value::as_str).unwrap_or("").trim();
    let last = raw.get("LastName").and_then(Value::as_str).unwrap_or("").trim();
    format!("{first} {last}").trim().to_string()
}

/// Non-empty string, or a number rendered as text.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn services(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| text(Some(item)))
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        other => text(Some(other)),
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Number as published; numeric strings are accepted.
fn amount(value: Option<&Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whole, non-negative counts only.
fn count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Null) | None => false,
    }
}
