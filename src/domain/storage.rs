use super::{EnforcementRecord, RawRecord, SchemaVariant};
use crate::error::Result;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn load_checkpoint(&self, key: &str) -> Result<Option<Vec<EnforcementRecord>>>;
    fn save_checkpoint(
        &self,
        key: &str,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<()>;
    fn clear_checkpoint(&self, key: &str) -> Result<()>;
    fn save_output(
        &self,
        name: &str,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<PathBuf>;
    fn read_table(&self, path: &Path) -> Result<Vec<EnforcementRecord>>;
    /// Any CSV export as header-addressed rows, for inputs that do not
    /// follow the output schema.
    fn read_raw_rows(&self, path: &Path) -> Result<Vec<RawRecord>>;
    fn write_table(
        &self,
        path: &Path,
        records: &[EnforcementRecord],
        schema: SchemaVariant,
    ) -> Result<()>;
}

pub struct StorageKeys;

impl StorageKeys {
    pub const CHECKPOINT_SUFFIX: &'static str = "_checkpoint";
    pub const OUTPUT_PREFIX: &'static str = "enforcement_";
    pub const EXTENSION: &'static str = "csv";
}
