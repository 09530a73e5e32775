use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use simplelog::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The amount of log output.
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    pub log_level: CliLogLevel,

    #[command(subcommand)]
    pub command: CliCommands,
}

#[derive(Subcommand)]
pub enum CliCommands {
    /// Download the records of each search term into the entries directory.
    Fetch(StageCommand),

    /// Label the sequences of the fetched records by matching their descriptions
    /// against the terms of each source.
    Extract(StageCommand),

    /// Combine the labeled sequences of each source, and then all sources into one corpus.
    Combine(StageCommand),

    /// Turn the corpus into k-mer documents.
    Kmers(StageCommand),

    /// Vectorize the k-mer documents.
    Vectorize(StageCommand),

    /// Train each model and report its predictions for each held-out group.
    Evaluate(StageCommand),

    /// Run all stages.
    Run(RunCommand),
}

#[derive(Args)]
pub struct StageCommand {
    /// The pipeline configuration in TOML format.
    #[arg(long, short)]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct RunCommand {
    #[command(flatten)]
    pub stage: StageCommand,

    /// Reuse the entries downloaded before.
    #[arg(long)]
    pub skip_fetch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Off => LevelFilter::Off,
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}
