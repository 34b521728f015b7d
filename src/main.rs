mod chart;
mod color;
mod config;
mod data;
mod error;
mod pipeline;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueHint};

use config::PipelineConfig;

/// Forest area by age group from Estonian National Forest Inventory exports.
#[derive(Debug, Parser)]
#[command(name = "forest-trends", version, about)]
struct Cli {
    /// JSON configuration file; built-in defaults apply to missing keys.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Dominant species to chart (all, aspen, birch, black alder, grey alder, other, pine, spruce).
    #[arg(short, long)]
    species: Option<String>,

    /// Directory that every configured path is relative to.
    #[arg(long, value_hint = ValueHint::DirPath)]
    root_dir: Option<PathBuf>,

    /// Chart PNG path, relative to the root directory.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Render from previously written plot tables.
    #[arg(long, action = ArgAction::SetTrue)]
    plot_only: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(species) = cli.species {
        config.tree_species = species;
    }
    if let Some(root) = cli.root_dir {
        config.root_dir = root;
    }
    if cli.output.is_some() {
        config.plot_save_path = cli.output;
    }
    config.validate()?;

    log::info!(
        "species '{}', root {}",
        config.tree_species,
        config.root_dir.display()
    );

    if cli.plot_only {
        let data = pipeline::load_plot_data(&config)?;
        pipeline::render(&config, &data)?;
    } else {
        pipeline::run(&config)?;
    }
    Ok(())
}
