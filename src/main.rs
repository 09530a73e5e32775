use clap::Parser;
use cli::{Cli, CliCommands};
use config::PipelineConfig;
use error::Result;
use log::info;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod blocks;
mod classifier;
mod cli;
mod combine;
mod config;
mod entrez;
mod error;
mod extract;
mod kmer;
mod labeled;
mod partition;
mod pipeline;
mod sparse;
mod vectorize;

fn main() {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level.into(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|error| eprintln!("Could not initialise logging: {error}"));

    run_command(cli.command).unwrap_or_else(|error| {
        println!("Error: {error}");
        std::process::exit(1);
    });
}

fn run_command(command: CliCommands) -> Result<()> {
    match command {
        CliCommands::Fetch(command) => {
            let files = pipeline::fetch(&PipelineConfig::load(command.config)?)?;
            info!("Fetched {} entry files", files.len());
        }
        CliCommands::Extract(command) => {
            let sequences = pipeline::extract(&PipelineConfig::load(command.config)?)?;
            info!("Extracted {sequences} labeled sequences");
        }
        CliCommands::Combine(command) => {
            pipeline::combine(&PipelineConfig::load(command.config)?)?;
        }
        CliCommands::Kmers(command) => {
            pipeline::kmers(&PipelineConfig::load(command.config)?)?;
        }
        CliCommands::Vectorize(command) => {
            pipeline::vectorize(&PipelineConfig::load(command.config)?)?;
        }
        CliCommands::Evaluate(command) => {
            pipeline::evaluate(&PipelineConfig::load(command.config)?)?;
        }
        CliCommands::Run(command) => {
            let config = PipelineConfig::load(command.stage.config)?;
            if command.skip_fetch {
                pipeline::process(&config)?;
            } else {
                pipeline::run(&config)?;
            }
        }
    }
    Ok(())
}
