use crate::domain::RawRecord;
use crate::infrastructure::clients::{Fetch, FetchError, PageRequest};
use crate::infrastructure::sources::EnforcementSource;
use rustc_hash::FxHashSet;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationPolicy {
    pub retry: RetryPolicy,
    /// Pause before every request after the first.
    pub request_delay: Duration,
    pub max_failed_pages: u32,
    pub max_empty_pages: u32,
    pub max_duplicate_pages: u32,
    pub target_count: Option<usize>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_delay: Duration::from_millis(100),
            max_failed_pages: 2,
            max_empty_pages: 2,
            max_duplicate_pages: 3,
            target_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CycleDetected,
    FetchFailures,
    EndOfData,
    DuplicatesOnly,
    TargetReached,
}

impl StopReason {
    /// Whether the run may be treated as finished. Repeated fetch failures
    /// mean the source stopped answering, not that it ran out of data.
    pub fn is_complete(&self) -> bool {
        !matches!(self, StopReason::FetchFailures)
    }
}

#[derive(Debug)]
pub enum PageOutcome {
    Page { number: u32, rows: Vec<RawRecord> },
    Stop(StopReason),
}

/// Runs `request` up to `policy.max_retries` times with exponential backoff.
/// Exhausted retries yield `None`; fetch errors never escape.
pub async fn fetch_with_retry<F: Fetch>(
    fetcher: &F,
    request: &PageRequest,
    policy: &RetryPolicy,
) -> Option<String> {
    let attempts = policy.max_retries.max(1);

    for attempt in 1..=attempts {
        match fetcher.fetch(request).await {
            Ok(body) => return Some(body),
            Err(e) if attempt == attempts => {
                error!("Giving up on {} after {} attempts: {}", request.url, attempts, e);
            }
            Err(e) => {
                warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, request.url, e);
                let mut wait = policy.backoff * 2u32.saturating_pow(attempt - 1);
                if matches!(e, FetchError::RateLimited(_)) {
                    wait *= 2;
                }
                sleep_for(wait).await;
            }
        }
    }
    None
}

async fn sleep_for(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Sequential page walker with stall detection.
///
/// `next_page` fetches until it has a page with rows or a fetch-side stop
/// condition fires. After the caller has filtered a page it reports how
/// many rows were new through `observe`, which applies the duplicate and
/// target conditions.
pub struct PaginatedFetcher {
    policy: PaginationPolicy,
    page: u32,
    visited: FxHashSet<String>,
    failed_streak: u32,
    empty_streak: u32,
    duplicate_streak: u32,
    collected: usize,
    pages_fetched: u32,
    exhausted: bool,
}

impl PaginatedFetcher {
    pub fn new(policy: PaginationPolicy) -> Self {
        Self {
            policy,
            page: 1,
            visited: FxHashSet::default(),
            failed_streak: 0,
            empty_streak: 0,
            duplicate_streak: 0,
            collected: 0,
            pages_fetched: 0,
            exhausted: false,
        }
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn collected(&self) -> usize {
        self.collected
    }

    pub async fn next_page<F: Fetch>(
        &mut self,
        fetcher: &F,
        source: &dyn EnforcementSource,
    ) -> PageOutcome {
        loop {
            if self.exhausted {
                info!("{}: last page reached", source.name());
                return PageOutcome::Stop(StopReason::EndOfData);
            }

            let request = source.page_request(self.page);
            if !self.visited.insert(request.fingerprint()) {
                warn!("{}: page {} was already visited, stopping", source.name(), self.page);
                return PageOutcome::Stop(StopReason::CycleDetected);
            }

            if self.pages_fetched > 0 {
                sleep_for(self.policy.request_delay).await;
            }

            let number = self.page;
            self.page += 1;
            self.pages_fetched += 1;
            info!("{}: requesting page {} ({})", source.name(), number, request.url);

            let Some(body) = fetch_with_retry(fetcher, &request, &self.policy.retry).await else {
                self.failed_streak += 1;
                self.empty_streak = 0;
                self.duplicate_streak = 0;
                if self.failed_streak >= self.policy.max_failed_pages {
                    warn!("{}: {} consecutive pages failed, stopping", source.name(), self.failed_streak);
                    return PageOutcome::Stop(StopReason::FetchFailures);
                }
                continue;
            };

            let rows = source.parse_listing(&body);
            self.exhausted = source.is_last_page(&body);
            info!("{}: page {} returned {} rows", source.name(), number, rows.len());

            if rows.is_empty() {
                self.empty_streak += 1;
                self.failed_streak = 0;
                self.duplicate_streak = 0;
                if self.empty_streak >= self.policy.max_empty_pages {
                    info!("{}: {} consecutive empty pages, stopping", source.name(), self.empty_streak);
                    return PageOutcome::Stop(StopReason::EndOfData);
                }
                continue;
            }

            self.failed_streak = 0;
            self.empty_streak = 0;
            return PageOutcome::Page { number, rows };
        }
    }

    /// Records how many rows of the last page were new, and how many of
    /// those the source kept. Only kept rows count toward the target.
    pub fn observe(&mut self, new_rows: usize, kept: usize) -> Option<StopReason> {
        if new_rows == 0 {
            self.duplicate_streak += 1;
            if self.duplicate_streak >= self.policy.max_duplicate_pages {
                info!("{} consecutive pages held only duplicates", self.duplicate_streak);
                return Some(StopReason::DuplicatesOnly);
            }
        } else {
            self.duplicate_streak = 0;
            self.collected += kept;
        }

        match self.policy.target_count {
            Some(target) if self.collected >= target => {
                info!("Target of {} records reached", target);
                Some(StopReason::TargetReached)
            }
            _ => None,
        }
    }
}
