pub(crate) mod clients;
pub(crate) mod sources;
mod storage;

pub use clients::http::HttpFetcher;
pub use storage::csv_store::CsvStore;
