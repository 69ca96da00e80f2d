use crate::domain::storage::Storage;
use crate::domain::{DedupKey, EnforcementRecord, SchemaVariant};
use crate::error::Result;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Keys seen during one collection run. Membership only grows, so a row is
/// accepted at most once per run.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: FxHashSet<DedupKey>,
}

impl DedupSet {
    pub fn seeded(keys: impl IntoIterator<Item = DedupKey>) -> Self {
        Self {
            seen: keys.into_iter().collect(),
        }
    }

    /// Rows whose key has not been seen yet, in input order. Their keys are
    /// recorded, including for repeats within `rows` itself.
    pub fn filter_new<T>(&mut self, rows: Vec<T>, key: impl Fn(&T) -> DedupKey) -> Vec<T> {
        let before = rows.len();
        let fresh: Vec<T> = rows
            .into_iter()
            .filter(|row| self.seen.insert(key(row)))
            .collect();
        debug!("{} new, {} duplicate", fresh.len(), before - fresh.len());
        fresh
    }
}

/// Checkpoint lifecycle for one job: load on start, save on stall or
/// error, clear on completion.
pub struct Checkpointer {
    store: Arc<dyn Storage>,
    key: String,
    schema: SchemaVariant,
}

impl Checkpointer {
    pub fn new(store: Arc<dyn Storage>, key: impl Into<String>, schema: SchemaVariant) -> Self {
        Self {
            store,
            key: key.into(),
            schema,
        }
    }

    /// Records left by an earlier incomplete run, or none.
    pub fn load(&self) -> Result<Vec<EnforcementRecord>> {
        Ok(self.store.load_checkpoint(&self.key)?.unwrap_or_default())
    }

    pub fn save(&self, records: &[EnforcementRecord]) -> Result<()> {
        self.store.save_checkpoint(&self.key, records, self.schema)?;
        info!("Checkpoint {} saved with {} records", self.key, records.len());
        Ok(())
    }

    /// Save attempt on an error path; a failure here is logged, not raised.
    pub fn save_best_effort(&self, records: &[EnforcementRecord]) {
        if records.is_empty() {
            return;
        }
        if let Err(e) = self.save(records) {
            error!("Failed to write checkpoint {}: {}", self.key, e);
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear_checkpoint(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;
    use crate::infrastructure::CsvStore;
    use crate::services::normalize::amount_field;
    use tempfile::TempDir;

    fn tracker_key(row: &RawRecord) -> DedupKey {
        DedupKey::new(
            row.get("COMPANY"),
            row.get("YEAR"),
            &amount_field(row.get("PENALTY AMOUNT (USD)")),
            row.get("JURISDICTION"),
        )
    }

    fn row(company: &str, summary: &str) -> RawRecord {
        RawRecord::new()
            .with("COMPANY", company)
            .with("YEAR", "2021")
            .with("PENALTY AMOUNT (USD)", "$5,000")
            .with("JURISDICTION", "South Korea")
            .with("DESCRIPTION", summary)
    }

    #[test]
    fn filter_new_is_idempotent() {
        let rows = vec![row("Acme", "a"), row("Globex", "b")];
        let mut seen = DedupSet::default();

        assert_eq!(seen.filter_new(rows.clone(), tracker_key).len(), 2);
        assert!(seen.filter_new(rows, tracker_key).is_empty());
    }

    #[test]
    fn first_of_two_duplicates_is_kept() {
        let rows = vec![row("Acme", "first summary"), row("Acme", "second summary")];
        let mut seen = DedupSet::default();

        let kept = seen.filter_new(rows, tracker_key);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("DESCRIPTION"), "first summary");
    }

    #[test]
    fn keys_differing_in_case_are_distinct() {
        let mut seen = DedupSet::default();
        let kept = seen.filter_new(vec![row("Acme", ""), row("ACME", "")], tracker_key);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn seeded_keys_are_filtered() {
        let mut seen = DedupSet::seeded([tracker_key(&row("Acme", ""))]);
        let kept = seen.filter_new(vec![row("Acme", "again"), row("Initech", "")], tracker_key);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("COMPANY"), "Initech");
    }

    #[test]
    fn checkpoint_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn Storage> =
            Arc::new(CsvStore::new(dir.path().join("data"), dir.path().join("ckpt")));
        let checkpoints = Checkpointer::new(store, "South Korea", SchemaVariant::WithOriginalCurrency);

        assert!(checkpoints.load().unwrap().is_empty());

        let records = vec![
            EnforcementRecord {
                company_name: "Acme".into(),
                currency: "KRW".into(),
                ..Default::default()
            },
            EnforcementRecord {
                company_name: "Globex".into(),
                summary: "line one, \"quoted\"\nline two".into(),
                ..Default::default()
            },
        ];
        checkpoints.save(&records).unwrap();
        assert_eq!(checkpoints.load().unwrap(), records);

        checkpoints.clear().unwrap();
        assert!(checkpoints.load().unwrap().is_empty());
    }
}
