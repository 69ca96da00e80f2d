use crate::config::{Credentials, SourceConfig};
use crate::domain::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
use crate::error::{HarvestError, Result};
use crate::infrastructure::clients::PageRequest;

pub(crate) mod fda;
pub(crate) mod ftc;
pub(crate) mod openlegaldata;
pub(crate) mod violation_tracker;

pub use fda::{FdaComplianceSource, FdaFilter};
pub use ftc::FtcCasesSource;
pub use openlegaldata::OpenLegalDataSource;
pub use violation_tracker::ViolationTrackerSource;

/// Site-specific half of a collection job. The collection loop owns
/// paging, dedup, retries and checkpoints; a source only knows how to
/// address and read its own pages.
pub trait EnforcementSource: Send + Sync {
    fn name(&self) -> &str;

    fn checkpoint_key(&self) -> String;

    fn schema(&self) -> SchemaVariant;

    /// Listing page `page`, counting from 1.
    fn page_request(&self, page: u32) -> PageRequest;

    /// Listing rows on a page. Malformed rows are skipped.
    fn parse_listing(&self, body: &str) -> Vec<RawRecord>;

    /// Whether `body` is known to be the final listing page.
    fn is_last_page(&self, _body: &str) -> bool {
        false
    }

    fn listing_key(&self, row: &RawRecord) -> DedupKey;

    /// Rows worth collecting once deduplicated; the rest count as seen.
    fn accepts(&self, _row: &RawRecord) -> bool {
        true
    }

    /// Key of a row already in output form, for seeding a resumed run.
    fn record_key(&self, record: &EnforcementRecord) -> DedupKey;

    fn detail_request(&self, _row: &RawRecord) -> Option<PageRequest> {
        None
    }

    fn parse_detail(&self, _body: &str) -> RawRecord {
        RawRecord::new()
    }

    /// Another page to consult for fields still missing after the detail
    /// page, given the row merged so far. Asked again after every merge.
    fn follow_up_request(&self, _row: &RawRecord) -> Option<PageRequest> {
        None
    }

    /// Fields read from a follow-up page. A failed fetch arrives as an
    /// empty body.
    fn parse_follow_up(&self, _row: &RawRecord, _body: &str) -> RawRecord {
        RawRecord::new()
    }

    fn normalize(&self, row: &RawRecord) -> EnforcementRecord;
}

pub fn build_source(
    config: &SourceConfig,
    credentials: &Credentials,
) -> Result<Box<dyn EnforcementSource>> {
    match config {
        SourceConfig::ViolationTracker {
            jurisdiction,
            country_code,
            base_url,
            include_original_currency,
        } => {
            let schema = if *include_original_currency {
                SchemaVariant::WithOriginalCurrency
            } else {
                SchemaVariant::Canonical
            };
            Ok(Box::new(ViolationTrackerSource::new(
                jurisdiction,
                country_code,
                base_url.as_deref(),
                schema,
            )?))
        }
        SourceConfig::Ftc {
            base_url,
            listing_url,
        } => Ok(Box::new(FtcCasesSource::new(
            base_url.as_deref(),
            listing_url.as_deref(),
        ))),
        SourceConfig::Fda {
            product_types,
            action_types,
            start_date,
            end_date,
            rows_per_page,
            api_url,
        } => {
            let (user, key) = credentials.fda().ok_or_else(|| {
                HarvestError::Config("FDA jobs require FDA_AUTH_USER and FDA_AUTH_KEY".to_string())
            })?;
            let filter = FdaFilter {
                product_types: product_types.clone(),
                action_types: action_types.clone(),
                start_date: start_date.clone(),
                end_date: end_date.clone(),
                rows_per_page: rows_per_page.unwrap_or(fda::MAX_ROWS_PER_PAGE),
            };
            Ok(Box::new(FdaComplianceSource::new(
                user,
                key,
                &filter,
                api_url.as_deref(),
            )))
        }
        SourceConfig::OpenLegalData { api_url, page_size } => {
            let key = credentials.openlegaldata().ok_or_else(|| {
                HarvestError::Config("openlegaldata jobs require OPENLEGALDATA_API_KEY".to_string())
            })?;
            Ok(Box::new(OpenLegalDataSource::new(
                key,
                api_url.as_deref(),
                *page_size,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;

    #[test]
    fn sources_are_built_from_job_config() {
        let config: CollectionConfig = serde_json::from_str(
            r#"{"jobs": [
                {"source": "violation_tracker", "jurisdiction": "Australia", "country_code": "AU",
                 "include_original_currency": false},
                {"source": "ftc"},
                {"source": "fda"},
                {"source": "openlegaldata", "page_size": 50}
            ]}"#,
        )
        .unwrap();
        let credentials = Credentials {
            fda_user: Some("u".into()),
            fda_key: Some("k".into()),
            openlegaldata_key: Some("t".into()),
        };

        let sources: Vec<_> = config
            .jobs
            .iter()
            .map(|job| build_source(&job.source, &credentials).unwrap())
            .collect();
        assert_eq!(sources[0].schema(), SchemaVariant::Canonical);
        assert_eq!(sources[0].checkpoint_key(), "violation_tracker_AU");
        assert_eq!(sources[1].name(), "FTC");
        assert!(sources[2].page_request(1).body.is_some());
        assert!(sources[3].page_request(2).url.ends_with("?page=2&page_size=50"));

        let err = build_source(&config.jobs[2].source, &Credentials::default());
        assert!(matches!(err, Err(HarvestError::Config(_))));
        let err = build_source(&config.jobs[3].source, &Credentials::default());
        assert!(matches!(err, Err(HarvestError::Config(_))));
    }
}
