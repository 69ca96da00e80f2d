//! Offline conversion of previously collected raw exports into the
//! canonical 11-column schema.

mod competition_bureau;
mod enforcement_tracker;
mod ftc;
mod gdprhub;
mod ico;

pub use competition_bureau::CompetitionBureauConverter;
pub use enforcement_tracker::EnforcementTrackerConverter;
pub use ftc::FtcExportConverter;
pub use gdprhub::GdprhubConverter;
pub use ico::IcoConverter;

use crate::config::cli::ConvertFormat;
use crate::domain::storage::Storage;
use crate::domain::{EnforcementRecord, RawRecord, SchemaVariant};
use crate::error::{HarvestError, Result};
use crate::services::normalize::{classify_violation, ViolationGroup};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Row-mapping strategy from one raw export layout to the output schema.
pub trait SchemaConverter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rows rejected here are dropped before conversion and do not consume
    /// an index.
    fn keep(&self, _row: &RawRecord) -> bool {
        true
    }

    /// `index` is the row's position among kept rows, starting at 0.
    fn convert(&self, index: usize, row: &RawRecord) -> EnforcementRecord;
}

pub fn build_converter(format: ConvertFormat, country: Option<&str>) -> Box<dyn SchemaConverter> {
    match format {
        ConvertFormat::Ico => Box::new(IcoConverter),
        ConvertFormat::EnforcementTracker => {
            Box::new(EnforcementTrackerConverter::new(country))
        }
        ConvertFormat::Gdprhub => Box::new(GdprhubConverter::new(country)),
        ConvertFormat::CompetitionBureau => Box::new(CompetitionBureauConverter),
        ConvertFormat::Ftc => Box::new(FtcExportConverter),
    }
}

static GDPR_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gdpr|dsgvo|\bart\.|\barticle\b|\b\d+\b").unwrap());

/// Group for GDPR decision texts: anything citing the regulation or an
/// article number is privacy, otherwise keyword classification decides.
/// Blank text has no group.
pub(crate) fn gdpr_violation_group(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let group = if GDPR_MARKER.is_match(text) {
        ViolationGroup::Privacy
    } else {
        classify_violation(text)
    };
    group.label().to_string()
}

pub struct ConversionService {
    store: Arc<dyn Storage>,
}

impl ConversionService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        info!("Created new Conversion Service");
        Self { store }
    }

    /// Converts `input` and writes the canonical table to `output`, or to a
    /// timestamped file in the data directory when no output is given.
    pub fn convert_file(
        &self,
        converter: &dyn SchemaConverter,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<PathBuf> {
        info!("Converting {:?} with the {} converter", input, converter.name());
        let rows = self.store.read_raw_rows(input)?;
        let total = rows.len();
        let kept: Vec<RawRecord> = rows.into_iter().filter(|row| converter.keep(row)).collect();
        if kept.len() < total {
            info!("Filtered out {} of {} rows", total - kept.len(), total);
        }

        let records = self.convert_rows(converter, &kept)?;

        match output {
            Some(path) => {
                self.store
                    .write_table(path, &records, SchemaVariant::Canonical)?;
                info!("Converted {} rows into {:?}", records.len(), path);
                Ok(path.to_path_buf())
            }
            None => self.store.save_output(
                &format!("{}_converted", converter.name()),
                &records,
                SchemaVariant::Canonical,
            ),
        }
    }

    /// Converts rows in parallel; output order follows input order.
    pub fn convert_rows(
        &self,
        converter: &dyn SchemaConverter,
        rows: &[RawRecord],
    ) -> Result<Vec<EnforcementRecord>> {
        let pb = ProgressBar::new(rows.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| HarvestError::Other(e.to_string()))?,
        );

        let records: Vec<EnforcementRecord> = rows
            .par_iter()
            .enumerate()
            .map(|(index, row)| {
                let record = converter.convert(index, row);
                pb.inc(1);
                record
            })
            .collect();

        pb.finish_with_message(format!("{} rows converted", records.len()));
        Ok(records)
    }
}
