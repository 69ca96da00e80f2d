use crate::config::cli::Command;
use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::clients::Fetch;
use crate::services::{
    collection::CollectionService,
    conversion::{build_converter, ConversionService},
    merging::MergingService,
};
use tracing::{info, warn};

pub struct HarvestService<F: Fetch> {
    config: Config,
    collection: CollectionService<F>,
    conversion: ConversionService,
    merging: MergingService,
}

impl<F: Fetch> HarvestService<F> {
    pub fn new(
        config: Config,
        collection: CollectionService<F>,
        conversion: ConversionService,
        merging: MergingService,
    ) -> Self {
        Self {
            config,
            collection,
            conversion,
            merging,
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.config.args.command {
            None => self.collect_all().await,
            Some(Command::Convert {
                format,
                input,
                country,
                output,
            }) => {
                let converter = build_converter(*format, country.as_deref());
                let path = self
                    .conversion
                    .convert_file(converter.as_ref(), input, output.as_deref())?;
                info!("Conversion written to {:?}", path);
                Ok(())
            }
            Some(Command::Merge { inputs, output }) => {
                let merged = self.merging.merge_files(inputs, output)?;
                info!("{} records merged into {:?}", merged.len(), output);
                Ok(())
            }
        }
    }

    async fn collect_all(&self) -> Result<()> {
        let outcomes = self
            .collection
            .run_all(&self.config.collection.jobs, &self.config.credentials)
            .await?;

        for outcome in &outcomes {
            match &outcome.output {
                Some(path) => info!(
                    "{}: {} records ({} new, {} pages, {:?}) saved to {:?}",
                    outcome.source,
                    outcome.total_records,
                    outcome.new_records,
                    outcome.pages_fetched,
                    outcome.stop,
                    path
                ),
                None => warn!(
                    "{}: stopped after {} pages ({:?}); {} records kept in checkpoint",
                    outcome.source, outcome.pages_fetched, outcome.stop, outcome.total_records
                ),
            }
        }

        info!("Collection finished for {} sources", outcomes.len());
        Ok(())
    }
}
