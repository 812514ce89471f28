use anyhow::Result;
use clap::{Parser, Subcommand};
use csv2parquet::{
    config::{Compression, Config},
    convert, describe,
    pipeline::{self, RecastOutcome},
    recast::{self, RecastSpec},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "csv2parquet", version)]
#[command(about = "Convert a directory of CSV files to Parquet and recast selected outputs")]
struct Cli {
    /// YAML config file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the CSV files (default: data)
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Glob for input files inside the directory (default: *.csv)
    #[arg(long, global = true)]
    pattern: Option<String>,

    /// Parquet compression codec
    #[arg(long, value_enum, global = true)]
    compression: Option<Compression>,

    /// Records sampled for schema inference (default: whole file)
    #[arg(long, global = true)]
    infer_rows: Option<usize>,

    /// Stop at the first failing file
    #[arg(long, global = true)]
    fail_fast: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert, recast, then describe the recast files (the default)
    Run {
        /// Parquet file inside the input dir to recast with the default
        /// columns; repeatable, replaces the configured list
        #[arg(long = "recast")]
        recast: Vec<PathBuf>,
    },
    /// Only convert CSV files to Parquet
    Convert,
    /// Recast Parquet files in place; without FILEs the configured list is used
    Recast { files: Vec<PathBuf> },
    /// Print the schema of Parquet files
    Describe { files: Vec<PathBuf> },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.input_dir {
            cfg.input_dir = dir.clone();
        }
        if let Some(pattern) = &self.pattern {
            cfg.pattern = pattern.clone();
        }
        if let Some(c) = self.compression {
            cfg.compression = c;
        }
        if self.infer_rows.is_some() {
            cfg.infer_rows = self.infer_rows;
        }
        cfg.fail_fast |= self.fail_fast;
        if let Some(Command::Run { recast }) = &self.command {
            if !recast.is_empty() {
                cfg.recast = recast.iter().cloned().map(RecastSpec::for_file).collect();
            }
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            error!(failures, "finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns the number of per-file failures.
fn run(cli: Cli) -> Result<usize> {
    let cfg = cli.load_config()?;
    info!(input_dir = %cfg.input_dir.display(), pattern = %cfg.pattern, "startup");

    match cli.command.unwrap_or(Command::Run { recast: Vec::new() }) {
        Command::Run { .. } => {
            let summary = pipeline::run(&cfg)?;
            for d in &summary.descriptions {
                println!("{}", d);
            }
            Ok(summary.failures())
        }
        Command::Convert => {
            let report = convert::convert_dir(&cfg.input_dir, &cfg.convert_options()?)?;
            for c in &report.converted {
                println!("{} -> {} ({} rows)", c.input.display(), c.output.display(), c.rows);
            }
            Ok(report.failed.len())
        }
        Command::Recast { files } => {
            let outcomes = if files.is_empty() {
                pipeline::recast_all(&cfg)?
            } else {
                recast_paths(&cfg, files)?
            };
            for o in &outcomes {
                if let Ok(report) = &o.result {
                    println!("{}: {} rows", o.path.display(), report.rows);
                }
            }
            Ok(outcomes.iter().filter(|o| o.result.is_err()).count())
        }
        Command::Describe { files } => {
            let mut failures = 0;
            for path in files {
                match describe::describe_file(&path) {
                    Ok(d) => println!("{}", d),
                    Err(e) => {
                        error!(path = %path.display(), "{:#}", e);
                        failures += 1;
                    }
                }
            }
            Ok(failures)
        }
    }
}

/// Recast paths given on the command line, taken relative to the working
/// directory rather than the input dir.
fn recast_paths(cfg: &Config, files: Vec<PathBuf>) -> Result<Vec<RecastOutcome>> {
    let props = cfg.compression.writer_properties()?;
    let jobs = files
        .into_iter()
        .map(|path| (path, recast::mobility_columns()))
        .collect();
    pipeline::recast_specs(jobs, &props, cfg.fail_fast)
}
