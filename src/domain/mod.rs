mod record;
pub(crate) mod storage;

pub use record::{DedupKey, EnforcementRecord, RawRecord, SchemaVariant};
