mod cli;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{list::list_cmd, preset::preset_cmd, resolve::resolve_cmd, ColorMode};
use modelroute::models::ModelCapability;
use tracing_subscriber::EnvFilter;

#[derive(Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "modelroute")]
#[command(
    about = "Resolve chat models into concrete provider endpoints",
    version = "0.0.1"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from this file instead of the search path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List providers, provider instances or models
    List(ListArgs),
    /// Show the fallback chain of a model
    Resolve(ResolveArgs),
    /// Expand a preset into its candidates
    Preset(PresetArgs),
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Registered providers
    Providers(ListProviderArgs),
    /// Usable provider instances, one per location
    Instances,
    /// Registered models
    Models(ListModelArgs),
}

/// Output formats
#[derive(ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListProviderArgs {
    /// Include providers whose credentials are not set
    #[arg(short, long)]
    all: bool,
}

#[derive(Parser, Default)]
pub(crate) struct ListModelArgs {
    /// Limit listing to models with this capability, may be repeated
    #[arg(short, long)]
    capability: Vec<ModelCapability>,
}

#[derive(Parser)]
pub(crate) struct ResolveArgs {
    /// The model id
    model: String,
    /// Override a parameter, as name=value
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
    /// Report the model id known to this consumer (e.g. litellm)
    #[arg(long)]
    consumer: Option<String>,
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Parser)]
pub(crate) struct PresetArgs {
    /// The preset name
    name: String,
    /// Report the model ids known to this consumer (e.g. litellm)
    #[arg(long)]
    consumer: Option<String>,
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = ColorMode::resolve_auto(cli.color);
    utils::errors::configure_color(color);

    init_tracing();

    let catalog = cli::load_catalog(cli.config);

    match &cli.command {
        Commands::List(args) => list_cmd(&catalog, args),
        Commands::Resolve(args) => resolve_cmd(&catalog, args),
        Commands::Preset(args) => preset_cmd(&catalog, args),
    }
}
