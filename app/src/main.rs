use std::path::PathBuf;

use clap::Parser;
use common::{config::Config, plot::run};
use eyre::Result;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &[
    "common",
    "method_comparison",
    "thread_scaling",
    "timing_table",
    "default_plots",
];

/// Aggregates graph coloring benchmark results and plots the method comparisons
#[derive(Parser)]
struct Cli {
    /// Directory with the result CSV files
    #[arg(short, long, default_value = ".")]
    input: PathBuf,
    /// Existing directory the charts are written to
    #[arg(short, long, default_value = "plots")]
    output: PathBuf,
    /// YAML report config, the built-in reports otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();

    let mut env_filter = EnvFilter::new(format!("coloring_analyzer={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .init();

    default_plots::init_reports();
    let config = match &args.config {
        Some(path) => Config::read(path)?,
        None => default_plots::default_config(),
    };
    info!(
        "{} reports from {} into {}",
        config.reports.len(),
        args.input.display(),
        args.output.display()
    );

    if let Err(err) = run(&args.input, &args.output, &config) {
        error!("{err:#?}");
        return Err(err);
    }
    Ok(())
}
