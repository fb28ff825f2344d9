use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use storyboard_compiler::{ParseOptions, Storyboard};
use storyboard_schema::Chart;
use tracing_subscriber::{fmt, EnvFilter};

mod inspect;
mod simulate;

#[derive(Debug, Parser)]
#[command(name = "storyboard")]
#[command(about = "Storyboard compiler CLI", long_about = None)]
struct Cli {
    /// Log every loaded category and trigger firing.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Source {
    input: PathBuf,
    /// Chart JSON with a `note_list` array.
    #[arg(long)]
    chart: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Compile {
        #[command(flatten)]
        source: Source,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fail on the first dropped declaration.
        #[arg(long)]
        strict: bool,
    },
    Inspect {
        #[command(flatten)]
        source: Source,
    },
    Simulate {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value_t = 1000)]
        score_per_note: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compile {
            source,
            output,
            strict,
        } => {
            let chart = load_chart(source.chart.as_deref())?;
            let storyboard = load(&source.input, &chart, strict)?;
            let out_path = output.unwrap_or_else(|| default_output_path(&source.input));
            storyboard
                .write_compiled(&out_path)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("failed to write: {}", out_path.display()))?;
        }
        Command::Inspect { source } => {
            let chart = load_chart(source.chart.as_deref())?;
            let storyboard = load(&source.input, &chart, false)?;
            inspect::print_storyboard(&storyboard);
        }
        Command::Simulate {
            source,
            score_per_note,
        } => {
            let chart = load_chart(source.chart.as_deref())?;
            let storyboard = load(&source.input, &chart, false)?;
            simulate::run_simulation(storyboard, chart, score_per_note)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_chart(path: Option<&Path>) -> anyhow::Result<Chart> {
    match path {
        Some(path) => storyboard_runner::load_chart_json_from_path(path),
        None => Ok(Chart::default()),
    }
}

fn load(input: &Path, chart: &Chart, strict: bool) -> anyhow::Result<Storyboard> {
    storyboard_compiler::parse_file_with_options(input, chart, &ParseOptions { strict })
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("compile failed: {}", input.display()))
}

fn default_output_path(input: &Path) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension("compiled.json");
    out
}
