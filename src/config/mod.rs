use crate::config::cli::Args;
use crate::error::{HarvestError, Result};
use crate::services::pagination::{PaginationPolicy, RetryPolicy};
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

pub const DEFAULT_CHECKPOINT_EVERY: usize = 50;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceConfig {
    ViolationTracker {
        jurisdiction: String,
        country_code: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_true")]
        include_original_currency: bool,
    },
    Ftc {
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        listing_url: Option<String>,
    },
    Fda {
        #[serde(default)]
        product_types: Vec<String>,
        #[serde(default)]
        action_types: Vec<String>,
        #[serde(default = "default_fda_start")]
        start_date: String,
        #[serde(default)]
        end_date: Option<String>,
        #[serde(default)]
        rows_per_page: Option<u32>,
        #[serde(default)]
        api_url: Option<String>,
    },
    #[serde(rename = "openlegaldata")]
    OpenLegalData {
        #[serde(default)]
        api_url: Option<String>,
        #[serde(default)]
        page_size: Option<u32>,
    },
}

fn default_true() -> bool {
    true
}

fn default_fda_start() -> String {
    "2020-01-01".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaginationOverrides {
    pub target_count: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub max_failed_pages: Option<u32>,
    pub max_empty_pages: Option<u32>,
    pub max_duplicate_pages: Option<u32>,
    pub checkpoint_every: Option<usize>,
}

impl PaginationOverrides {
    pub fn policy(&self) -> PaginationPolicy {
        let defaults = PaginationPolicy::default();
        PaginationPolicy {
            retry: RetryPolicy {
                max_retries: self.max_retries.unwrap_or(defaults.retry.max_retries),
                backoff: self
                    .retry_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.backoff),
            },
            request_delay: self
                .request_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_delay),
            max_failed_pages: self.max_failed_pages.unwrap_or(defaults.max_failed_pages),
            max_empty_pages: self.max_empty_pages.unwrap_or(defaults.max_empty_pages),
            max_duplicate_pages: self
                .max_duplicate_pages
                .unwrap_or(defaults.max_duplicate_pages),
            target_count: self.target_count.or(defaults.target_count),
        }
    }

    pub fn checkpoint_every(&self) -> usize {
        self.checkpoint_every.unwrap_or(DEFAULT_CHECKPOINT_EVERY).max(1)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CollectionJob {
    #[serde(flatten)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pagination: PaginationOverrides,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CollectionConfig {
    pub jobs: Vec<CollectionJob>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub fda_user: Option<String>,
    pub fda_key: Option<String>,
    pub openlegaldata_key: Option<String>,
}

impl Credentials {
    /// Both FDA values, when both are set and non-blank.
    pub fn fda(&self) -> Option<(&str, &str)> {
        let user = self.fda_user.as_deref().filter(|v| !v.trim().is_empty())?;
        let key = self.fda_key.as_deref().filter(|v| !v.trim().is_empty())?;
        Some((user, key))
    }

    pub fn openlegaldata(&self) -> Option<&str> {
        self.openlegaldata_key.as_deref().filter(|v| !v.trim().is_empty())
    }
}

pub struct Config {
    pub args: Args,
    pub collection: CollectionConfig,
    pub credentials: Credentials,
    pub http_client: Client,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        // Only the collection run needs the job list
        let collection = if args.command.is_none() {
            let raw = std::fs::read_to_string(&args.config_file).map_err(|e| {
                HarvestError::Config(format!("cannot read {:?}: {}", args.config_file, e))
            })?;
            serde_json::from_str(&raw)?
        } else {
            CollectionConfig::default()
        };

        let credentials = Credentials {
            fda_user: args.fda_auth_user.clone(),
            fda_key: args.fda_auth_key.clone(),
            openlegaldata_key: args.openlegaldata_api_key.clone(),
        };
        validate(&collection, &credentials)?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            args,
            collection,
            credentials,
            http_client,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }
        if !self.args.checkpoint_dir.exists() {
            std::fs::create_dir_all(&self.args.checkpoint_dir)?;
        }

        info!("Data and checkpoint dirs exist");
        Ok(())
    }
}

/// Fails on jobs that cannot run, before any request is made.
pub fn validate(collection: &CollectionConfig, credentials: &Credentials) -> Result<()> {
    for (index, job) in collection.jobs.iter().enumerate() {
        match &job.source {
            SourceConfig::ViolationTracker {
                jurisdiction,
                country_code,
                ..
            } => {
                if jurisdiction.trim().is_empty() || country_code.trim().is_empty() {
                    return Err(HarvestError::Config(format!(
                        "job {index}: violation_tracker needs jurisdiction and country_code"
                    )));
                }
            }
            SourceConfig::Fda { .. } => {
                if credentials.fda().is_none() {
                    return Err(HarvestError::Config(format!(
                        "job {index}: fda needs FDA_AUTH_USER and FDA_AUTH_KEY"
                    )));
                }
            }
            SourceConfig::OpenLegalData { .. } => {
                if credentials.openlegaldata().is_none() {
                    return Err(HarvestError::Config(format!(
                        "job {index}: openlegaldata needs OPENLEGALDATA_API_KEY"
                    )));
                }
            }
            SourceConfig::Ftc { .. } => {}
        }
    }
    Ok(())
}
