use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use etspack::{
    config::{Config, InlineMode},
    orchestrator::BundleOrchestrator,
};
use log::{LevelFilter, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InlineArg {
    /// Inline each dependency's whole source
    File,
    /// Inline only the declarations that are imported
    Symbols,
}

impl From<InlineArg> for InlineMode {
    fn from(arg: InlineArg) -> Self {
        match arg {
            InlineArg::File => Self::File,
            InlineArg::Symbols => Self::Symbols,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "etspack")]
#[command(about = "Bundle an ArkTS page and its local imports into a single .ets file")]
#[command(version)]
struct Cli {
    /// Entry page to bundle
    #[arg(short, long)]
    entry: PathBuf,

    /// Output file; defaults to <stem>/<file name> in the working directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file layered over user and project configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How local dependencies are merged into the bundle
    #[arg(long, value_enum)]
    inline: Option<InlineArg>,

    /// Resource root holding element/ and media/
    #[arg(long)]
    resource_dir: Option<PathBuf>,

    /// Skip resource substitution
    #[arg(long)]
    no_resources: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(inline) = cli.inline {
        config.inline = inline.into();
    }
    if let Some(resource_dir) = cli.resource_dir {
        config.resource_dir = Some(resource_dir);
    }
    if cli.no_resources {
        config.resources = false;
    }

    let output = cli
        .output
        .unwrap_or_else(|| BundleOrchestrator::default_output_path(&cli.entry));
    let report = BundleOrchestrator::new(config).bundle(&cli.entry, &output)?;

    info!(
        "Bundled {} local and {} external modules into {}",
        report.local_modules,
        report.external_modules,
        report.output.display()
    );
    if report.skipped_symbols > 0 {
        info!("{} imported symbols could not be extracted", report.skipped_symbols);
    }
    if let Some(resources) = &report.resources {
        info!(
            "Substituted {} resource references, copied {} assets",
            resources.substituted,
            resources.copied_assets.len()
        );
    }
    Ok(())
}
