//! In-memory fakes for the collection loop's collaborators.

use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::infrastructure::clients::{Fetch, FetchError, PageRequest};
use crate::infrastructure::sources::EnforcementSource;
use crate::services::normalize::year_of;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Response = Result<String, FetchError>;

/// Answers detail URLs from a route table and everything else from a queue
/// of scripted responses, one per attempt.
pub struct ScriptedFetcher {
    queue: Mutex<VecDeque<Response>>,
    routes: HashMap<String, String>,
    fallback: Response,
    attempts: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn scripted(responses: Vec<Response>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            routes: HashMap::new(),
            fallback: Ok(String::new()),
            attempts: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn pages(bodies: &[&str]) -> Self {
        Self::scripted(bodies.iter().map(|b| Ok(b.to_string())).collect())
    }

    pub fn failing(error: FetchError) -> Self {
        Self::scripted(Vec::new()).with_fallback(Err(error))
    }

    pub fn with_fallback(mut self, response: Response) -> Self {
        self.fallback = response;
        self
    }

    pub fn route(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), body.to_string());
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.clone());
        if let Some(body) = self.routes.get(&request.url) {
            return Ok(body.clone());
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Listing bodies are comma separated `company[:amount]` items; detail
/// pages live at `https://detail.test/<company>` and hold the summary.
#[derive(Default)]
pub struct ListSource {
    pub fixed_url: bool,
    pub with_details: bool,
}

impl EnforcementSource for ListSource {
    fn name(&self) -> &str {
        "list"
    }

    fn checkpoint_key(&self) -> String {
        "list".to_string()
    }

    fn schema(&self) -> SchemaVariant {
        SchemaVariant::Canonical
    }

    fn page_request(&self, page: u32) -> PageRequest {
        if self.fixed_url {
            PageRequest::get("https://list.test/")
        } else {
            PageRequest::get(format!("https://list.test/?page={page}"))
        }
    }

    fn parse_listing(&self, body: &str) -> Vec<RawRecord> {
        body.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (company, amount) = item.split_once(':').unwrap_or((item, "100"));
                RawRecord::new()
                    .with("COMPANY", company)
                    .with("YEAR", "2021")
                    .with("AMOUNT", amount)
            })
            .collect()
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey {
        DedupKey::new(row.get("COMPANY"), row.get("YEAR"), row.get("AMOUNT"), "XX")
    }

    fn record_key(&self, record: &EnforcementRecord) -> DedupKey {
        DedupKey::new(
            &record.company_name,
            year_of(&record.enforcement_date),
            &record.fine_amount_usd,
            &record.country_code,
        )
    }

    fn detail_request(&self, row: &RawRecord) -> Option<PageRequest> {
        self.with_details
            .then(|| PageRequest::get(format!("https://detail.test/{}", row.get("COMPANY"))))
    }

    fn parse_detail(&self, body: &str) -> RawRecord {
        RawRecord::new().with("SUMMARY", body)
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord {
        EnforcementRecord {
            country_code: "XX".to_string(),
            company_name: row.get("COMPANY").to_string(),
            enforcement_date: format!("{}-01-01", row.get("YEAR")),
            fine_amount_usd: row.get("AMOUNT").to_string(),
            summary: row.get("SUMMARY").to_string(),
            ..Default::default()
        }
    }
}
