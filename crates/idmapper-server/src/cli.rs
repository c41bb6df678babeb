//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

/// ID to name mapping service
#[derive(Parser, Debug)]
#[command(name = "idmapper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, overrides `addr`
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Load the configuration and every mapper, then exit
    #[arg(long)]
    pub config_check: bool,

    /// Print the resolved configuration as JSON
    #[arg(short, long)]
    pub print_config: bool,
}
