use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the collection job list
    #[arg(long, default_value = "collection_config.json")]
    pub config_file: PathBuf,

    /// Directory to store output data
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for checkpoints of interrupted runs
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// FDA Data Dashboard user
    #[arg(long, env = "FDA_AUTH_USER", hide_env_values = true)]
    pub fda_auth_user: Option<String>,

    /// FDA Data Dashboard key
    #[arg(long, env = "FDA_AUTH_KEY", hide_env_values = true)]
    pub fda_auth_key: Option<String>,

    /// OpenLegalData API token
    #[arg(long, env = "OPENLEGALDATA_API_KEY", hide_env_values = true)]
    pub openlegaldata_api_key: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Convert a raw export into the 11-column schema
    Convert {
        #[arg(long, value_enum)]
        format: ConvertFormat,

        #[arg(long)]
        input: PathBuf,

        /// Country code for exports covering several countries
        #[arg(long)]
        country: Option<String>,

        /// Defaults to a timestamped file in the data directory
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Merge schema files into one 11-column file
    Merge {
        #[arg(long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertFormat {
    Ico,
    EnforcementTracker,
    Gdprhub,
    CompetitionBureau,
    Ftc,
}
