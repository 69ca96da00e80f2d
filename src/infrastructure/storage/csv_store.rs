use crate::domain::storage::{Storage, StorageKeys};
use crate::domain::{EnforcementRecord, RawRecord, SchemaVariant};
use crate::error::Result;
use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone)]
pub struct CsvStore {
    data_dir: PathBuf,
    checkpoint_dir: PathBuf,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    fn checkpoint_path(&self, key: &str) -> PathBuf {
        self.checkpoint_dir.join(format!(
            "{}{}.{}",
            sanitize_key(key),
            StorageKeys::CHECKPOINT_SUFFIX,
            StorageKeys::EXTENSION
        ))
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl Storage for CsvStore {
    fn load_checkpoint(&self, key: &str) -> Result<Option<Vec<EnforcementRecord>>> {
        let path = self.checkpoint_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let records = self.read_table(&path)?;
        info!("Recovered {} records from {:?}", records.len(), path);
        Ok(Some(records))
    }

    fn save_checkpoint(
        &self,
        key: &str,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<()> {
        self.ensure_dir(&self.checkpoint_dir)?;
        let path = self.checkpoint_path(key);
        let staging = path.with_extension("tmp");
        self.write_table(&staging, records, schema)?;
        fs::rename(&staging, &path)?;
        info!("Checkpoint saved: {:?} ({} records)", path, records.len());
        Ok(())
    }

    fn clear_checkpoint(&self, key: &str) -> Result<()> {
        let path = self.checkpoint_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Checkpoint deleted: {:?}", path);
        }
        Ok(())
    }

    fn save_output(
        &self,
        name: &str,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<PathBuf> {
        self.ensure_dir(&self.data_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.data_dir.join(format!(
            "{}{}_{}.{}",
            StorageKeys::OUTPUT_PREFIX,
            sanitize_key(name),
            timestamp,
            StorageKeys::EXTENSION
        ));
        self.write_table(&path, records, schema)?;
        info!("CSV saved: {:?} ({} records)", path, records.len());
        Ok(path)
    }

    fn read_table(&self, path: &Path) -> Result<Vec<EnforcementRecord>> {
        let (headers, rows) = read_csv(path)?;
        Ok(rows
            .iter()
            .map(|values| EnforcementRecord::from_row(&headers, values))
            .collect())
    }

    fn read_raw_rows(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let (headers, rows) = read_csv(path)?;
        Ok(rows
            .into_iter()
            .map(|values| {
                headers
                    .iter()
                    .cloned()
                    .zip(values.into_iter().chain(std::iter::repeat(String::new())))
                    .collect()
            })
            .collect())
    }

    fn write_table(
        &self,
        path: &Path,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.ensure_dir(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(schema.columns())?;
        for record in records {
            writer.write_record(record.to_row(schema))?;
        }
        writer.flush()?;

        debug!("Wrote {} rows to {:?}", records.len(), path);
        Ok(())
    }
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let bytes = fs::read(path)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row?.iter().map(str::to_string).collect());
    }

    Ok((headers, rows))
}

fn sanitize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}
