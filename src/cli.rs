use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "xref-rewrite",
    version,
    about = "Rewrites topic-annotated HTML into disambiguated cross-reference markup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Convert(ConvertArgs),
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: PathBuf,

    /// Markup prepended to the document body before conversion.
    #[arg(long)]
    pub boilerplate: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
