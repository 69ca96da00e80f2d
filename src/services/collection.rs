use crate::config::{CollectionJob, Credentials};
use crate::domain::storage::Storage;
use crate::domain::{EnforcementRecord, RawRecord};
use crate::error::Result;
use crate::infrastructure::clients::Fetch;
use crate::infrastructure::sources::{build_source, EnforcementSource};
use crate::services::dedup::{Checkpointer, DedupSet};
use crate::services::pagination::{
    fetch_with_retry, PageOutcome, PaginatedFetcher, PaginationPolicy, RetryPolicy, StopReason,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MAX_FOLLOW_UPS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOutcome {
    pub source: String,
    pub stop: StopReason,
    pub total_records: usize,
    pub new_records: usize,
    pub pages_fetched: u32,
    /// Final output file; `None` when the run only left a checkpoint.
    pub output: Option<PathBuf>,
}

/// Drives paging, dedup, detail enrichment, normalization and checkpoints
/// for each configured source, one source at a time.
pub struct CollectionService<F: Fetch> {
    fetcher: F,
    store: Arc<dyn Storage>,
}

impl<F: Fetch> CollectionService<F> {
    pub fn new(fetcher: F, store: Arc<dyn Storage>) -> Self {
        Self { fetcher, store }
    }

    pub async fn run_all(
        &self,
        jobs: &[CollectionJob],
        credentials: &Credentials,
    ) -> Result<Vec<CollectionOutcome>> {
        info!("Starting collection of {} jobs", jobs.len());

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            let source = build_source(&job.source, credentials)?;
            let outcome = self
                .collect(
                    source.as_ref(),
                    job.pagination.policy(),
                    job.pagination.checkpoint_every(),
                )
                .await?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Collects one source. Any error leaves a checkpoint of the records
    /// gathered so far and is returned.
    pub async fn collect(
        &self,
        source: &dyn EnforcementSource,
        policy: PaginationPolicy,
        checkpoint_every: usize,
    ) -> Result<CollectionOutcome> {
        let checkpoints =
            Checkpointer::new(self.store.clone(), source.checkpoint_key(), source.schema());

        let mut records = checkpoints.load()?;
        let mut seen = DedupSet::seeded(records.iter().map(|r| source.record_key(r)));
        info!(
            "{}: starting with {} recovered records",
            source.name(),
            records.len()
        );

        let result = self
            .drive(source, policy, checkpoint_every, &checkpoints, &mut records, &mut seen)
            .await;

        if let Err(e) = &result {
            error!("{}: collection failed: {}", source.name(), e);
            checkpoints.save_best_effort(&records);
        }
        result
    }

    async fn drive(
        &self,
        source: &dyn EnforcementSource,
        policy: PaginationPolicy,
        checkpoint_every: usize,
        checkpoints: &Checkpointer,
        records: &mut Vec<EnforcementRecord>,
        seen: &mut DedupSet,
    ) -> Result<CollectionOutcome> {
        let detail_delay = policy.request_delay / 2;
        let retry = policy.retry.clone();
        let mut pager = PaginatedFetcher::new(policy);
        let mut since_checkpoint = 0;

        let stop = loop {
            let (number, rows) = match pager.next_page(&self.fetcher, source).await {
                PageOutcome::Page { number, rows } => (number, rows),
                PageOutcome::Stop(reason) => break reason,
            };

            let on_page = rows.len();
            let fresh = seen.filter_new(rows, |row| source.listing_key(row));
            let new_count = fresh.len();
            let kept: Vec<RawRecord> = fresh.into_iter().filter(|row| source.accepts(row)).collect();
            info!(
                "{}: page {}: {} new, {} duplicate, {} skipped",
                source.name(),
                number,
                new_count,
                on_page - new_count,
                new_count - kept.len()
            );

            let kept_count = kept.len();
            if kept_count > 0 {
                let enriched = self.enrich(source, kept, &retry, detail_delay).await;
                records.extend(enriched.iter().map(|row| source.normalize(row)));
                info!("{}: {} records collected", source.name(), records.len());

                since_checkpoint += kept_count;
                if since_checkpoint >= checkpoint_every {
                    checkpoints.save(records)?;
                    since_checkpoint = 0;
                }
            }

            if let Some(reason) = pager.observe(new_count, kept_count) {
                break reason;
            }
        };

        info!(
            "{}: stopped ({:?}) after {} pages, {} records ({} new)",
            source.name(),
            stop,
            pager.pages_fetched(),
            records.len(),
            pager.collected()
        );

        let output = if stop.is_complete() {
            let path = self
                .store
                .save_output(&source.checkpoint_key(), records, source.schema())?;
            checkpoints.clear()?;
            Some(path)
        } else {
            warn!("{}: no further progress, keeping checkpoint", source.name());
            checkpoints.save(records)?;
            None
        };

        Ok(CollectionOutcome {
            source: source.name().to_string(),
            stop,
            total_records: records.len(),
            new_records: pager.collected(),
            pages_fetched: pager.pages_fetched(),
            output,
        })
    }

    /// Overlays detail page fields onto each listing row, then any
    /// follow-up pages the source asks for. A failed detail fetch keeps the
    /// listing data.
    async fn enrich(
        &self,
        source: &dyn EnforcementSource,
        rows: Vec<RawRecord>,
        retry: &RetryPolicy,
        delay: Duration,
    ) -> Vec<RawRecord> {
        let mut enriched = Vec::with_capacity(rows.len());

        for mut row in rows {
            if let Some(request) = source.detail_request(&row) {
                info!("  detail page: {}", request.url);
                match fetch_with_retry(&self.fetcher, &request, retry).await {
                    Some(body) => {
                        let fields = source.parse_detail(&body);
                        if fields.is_empty() {
                            debug!("  no fields on {}", request.url);
                        }
                        row.merge(fields);
                    }
                    None => warn!("  detail page unavailable: {}", request.url),
                }
                pause(delay).await;
            }

            for _ in 0..MAX_FOLLOW_UPS {
                let Some(request) = source.follow_up_request(&row) else {
                    break;
                };
                info!("  follow-up page: {}", request.url);
                let body = fetch_with_retry(&self.fetcher, &request, retry)
                    .await
                    .unwrap_or_default();
                let fields = source.parse_follow_up(&row, &body);
                row.merge(fields);
                pause(delay).await;
            }
            enriched.push(row);
        }

        enriched
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
