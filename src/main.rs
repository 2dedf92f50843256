use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use picbox::config::Config;
use picbox::engine::options::{parse_operations, OptionSet, RawOptions};
use picbox::engine::pipeline::{Engine, OperationChain};
use picbox::fetch::{HttpFetcher, SourceFetcher};

/// Picbox - on-the-fly image resizing, rotation and cropping
#[derive(Parser, Debug)]
#[command(name = "picbox")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform a local file or http(s) URL
    Transform(TransformArgs),
    /// Append a signature to a query string
    Sign {
        /// Signing key
        #[arg(short, long)]
        key: String,
        /// Query string to sign, e.g. "url=...&w=100"
        query: String,
    },
}

#[derive(ClapArgs, Debug)]
struct TransformArgs {
    /// Source image path or http(s) URL
    source: String,

    /// Comma-separated operations (region, resize, rotate, noop)
    #[arg(long)]
    op: Option<String>,
    #[arg(short = 'W', long)]
    width: Option<String>,
    #[arg(short = 'H', long)]
    height: Option<String>,
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    filter: Option<String>,
    #[arg(long)]
    format: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    background: Option<String>,
    #[arg(long)]
    quality: Option<String>,
    #[arg(long)]
    optimize: Option<String>,
    #[arg(long)]
    progressive: Option<String>,
    #[arg(long)]
    preserve_exif: Option<String>,
    #[arg(long)]
    retain: Option<String>,
    #[arg(long)]
    degree: Option<String>,
    #[arg(long)]
    expand: Option<String>,
    #[arg(long)]
    rect: Option<String>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl TransformArgs {
    fn raw_options(&self) -> RawOptions {
        let mut raw = RawOptions::new();
        let values = [
            ("width", &self.width),
            ("height", &self.height),
            ("mode", &self.mode),
            ("filter", &self.filter),
            ("format", &self.format),
            ("position", &self.position),
            ("background", &self.background),
            ("quality", &self.quality),
            ("optimize", &self.optimize),
            ("progressive", &self.progressive),
            ("preserve_exif", &self.preserve_exif),
            ("retain", &self.retain),
            ("degree", &self.degree),
            ("expand", &self.expand),
            ("rect", &self.rect),
        ];
        for (name, value) in values {
            if let Some(value) = value {
                raw.set(name, value.clone());
            }
        }
        raw
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = picbox::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Some(path) = &args.config {
        tracing::debug!(config_file = %path.display(), "Configuration loaded successfully");
    }

    let result = match args.command {
        Command::Transform(transform) => run_transform(&config, transform).await,
        Command::Sign { key, query } => {
            println!("{}", picbox::security::sign(&key, &query));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_transform(config: &Config, args: TransformArgs) -> Result<()> {
    let operations = match args.op.as_deref().filter(|op| !op.is_empty()) {
        Some(op) => parse_operations(op)?,
        None => parse_operations(&config.operations.default_operation)?,
    };

    let defaults = config.default_options().map_err(|e| anyhow!(e))?;
    let raw = args.raw_options().with_defaults(&defaults);
    let options = OptionSet::normalize(&raw, &operations, &config.limits.resize_limits())?;
    let chain = OperationChain::from_names(&operations, &options)?;

    let source = if args.source.starts_with("http://") || args.source.starts_with("https://") {
        let fetcher = HttpFetcher::new(&config.fetch).map_err(|e| anyhow!(e))?;
        fetcher.fetch(&args.source).await?.body.to_vec()
    } else {
        std::fs::read(&args.source).with_context(|| format!("Failed to read {}", args.source))?
    };

    let processed = tokio::task::spawn_blocking(move || {
        Engine::new().process(&source, &chain, &options)
    })
    .await??;

    tracing::info!(
        source = %args.source,
        format = processed.format.map(|f| f.as_str()).unwrap_or("source"),
        bytes = processed.data.len(),
        "transform complete"
    );

    match &args.output {
        Some(path) => std::fs::write(path, &processed.data)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout()
            .write_all(&processed.data)
            .context("Failed to write to stdout")?,
    }
    Ok(())
}
