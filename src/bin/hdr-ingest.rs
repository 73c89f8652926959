use std::{
    io::BufRead as _,
    path::PathBuf,
    time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use hdr_ingest::{
    BackgroundImagesLoader, ChannelSelector, IngestConfig, LoaderRegistry, SelectorMode, ThreadPool,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hdr-ingest", version, about = "Load HDR images and print what was decoded")]
struct Cli {
    /// Image files to load. `:pattern` sets the channel selector for the files after it.
    inputs: Vec<String>,

    /// Worker threads (defaults to the config value, then available parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Interpret channel selectors as regular expressions.
    #[arg(long, default_value_t = false)]
    regex: bool,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also read inputs from standard input, one per line.
    #[arg(long, default_value_t = false)]
    stdin: bool,

    /// Give up waiting for outstanding loads after this many seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => IngestConfig::from_json_file(path)?,
        None => IngestConfig::default(),
    };
    if cli.threads.is_some() {
        config.worker_threads = cli.threads;
    }
    if cli.regex {
        config.selector_mode = SelectorMode::Regex;
    }
    config.validate()?;

    init_logging(&config);

    let mut inputs = cli.inputs.clone();
    if cli.stdin {
        for line in std::io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let line = line.trim();
            if !line.is_empty() {
                inputs.push(line.to_owned());
            }
        }
    }

    let pool = ThreadPool::from_config(&config)?;
    let loader = BackgroundImagesLoader::new(pool.handle(), LoaderRegistry::default());

    let mut selector = ChannelSelector::all();
    let mut requested = 0u64;
    for input in &inputs {
        if let Some(pattern) = input.strip_prefix(':') {
            selector = ChannelSelector::new(pattern, config.selector_mode)?;
            continue;
        }
        loader.enqueue(input, selector.clone(), requested == 0);
        requested += 1;
    }

    if requested == 0 {
        anyhow::bail!("no input files given");
    }

    if !loader.wait_settled(Duration::from_secs(cli.timeout_secs)) {
        anyhow::bail!("timed out with {} load(s) outstanding", loader.pending());
    }

    let mut printed = 0usize;
    for addition in loader.drain_published() {
        for image in &addition.images {
            if printed > 0 {
                println!();
            }
            println!("{image}");
            printed += 1;
        }
    }

    pool.shutdown();

    if printed == 0 {
        anyhow::bail!("none of the {requested} input(s) could be loaded");
    }
    Ok(())
}

fn init_logging(config: &IngestConfig) {
    let fallback = config.log_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
