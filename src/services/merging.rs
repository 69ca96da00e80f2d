use crate::domain::storage::Storage;
use crate::domain::{EnforcementRecord, SchemaVariant};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct MergingService {
    store: Arc<dyn Storage>,
}

impl MergingService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        info!("Created new Merging Service");
        Self { store }
    }

    /// Concatenates schema files into one canonical table at `output`.
    ///
    /// Inputs may be 11- or 13-column files; columns are matched by header
    /// name and the currency columns are dropped. Missing inputs are
    /// skipped.
    pub fn merge_files(&self, inputs: &[PathBuf], output: &Path) -> Result<Vec<EnforcementRecord>> {
        let mut merged = Vec::new();

        for input in inputs {
            if !input.exists() {
                warn!("Skipping missing input {:?}", input);
                continue;
            }
            let records = self.store.read_table(input)?;
            info!("Read {} records from {:?}", records.len(), input);
            merged.extend(records);
        }

        self.store
            .write_table(output, &merged, SchemaVariant::Canonical)?;
        info!("Merged {} records into {:?}", merged.len(), output);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::CsvStore;
    use std::fs;

    fn record(id: &str, currency: &str) -> EnforcementRecord {
        EnforcementRecord {
            enforcement_id: id.to_string(),
            fine_amount_usd: "10".to_string(),
            fine_amount_original: "13000".to_string(),
            currency: currency.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn mixed_layouts_merge_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn Storage> = Arc::new(CsvStore::new(dir.path(), dir.path()));

        let korea = dir.path().join("kr.csv");
        let australia = dir.path().join("au.csv");
        store
            .write_table(
                &korea,
                &[record("KR-1", "KRW"), record("KR-2", "KRW")],
                SchemaVariant::WithOriginalCurrency,
            )
            .unwrap();
        store
            .write_table(&australia, &[record("AU-1", "")], SchemaVariant::Canonical)
            .unwrap();

        let output = dir.path().join("merged.csv");
        let merged = MergingService::new(store.clone())
            .merge_files(
                &[korea, dir.path().join("missing.csv"), australia],
                &output,
            )
            .unwrap();
        assert_eq!(merged.len(), 3);

        let written = store.read_table(&output).unwrap();
        let ids: Vec<&str> = written.iter().map(|r| r.enforcement_id.as_str()).collect();
        assert_eq!(ids, vec!["KR-1", "KR-2", "AU-1"]);
        assert!(written.iter().all(|r| r.currency.is_empty()));

        let text = fs::read_to_string(&output).unwrap();
        let header = text.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(header.split(',').count(), 11);
    }
}
