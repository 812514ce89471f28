// src/pipeline.rs

use crate::{
    config::Config,
    convert::{self, ConvertReport},
    describe::{self, FileDescription},
    recast::{self, ColumnCast, RecastReport},
};
use anyhow::Result;
use parquet::file::properties::WriterProperties;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug)]
pub struct RecastOutcome {
    pub path: PathBuf,
    pub result: Result<RecastReport>,
}

/// Everything one `run` did, for the caller to print and turn into an exit code.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub convert: ConvertReport,
    pub recast: Vec<RecastOutcome>,
    pub descriptions: Vec<FileDescription>,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.convert.failed.len() + self.recast.iter().filter(|r| r.result.is_err()).count()
    }
}

/// Recast each `(path, columns)` pair in order. A failing file is logged and
/// recorded and the rest still run; with `fail_fast` the first failure is
/// returned as the error instead.
pub fn recast_specs(
    jobs: Vec<(PathBuf, Vec<ColumnCast>)>,
    props: &WriterProperties,
    fail_fast: bool,
) -> Result<Vec<RecastOutcome>> {
    let mut outcomes = Vec::with_capacity(jobs.len());
    for (path, columns) in jobs {
        let result = match recast::recast_file(&path, &columns, props.clone()) {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(path = %path.display(), "recast failed: {:#}", e);
                if fail_fast {
                    return Err(e.context(format!("recasting {}", path.display())));
                }
                Err(e)
            }
        };
        outcomes.push(RecastOutcome { path, result });
    }
    Ok(outcomes)
}

/// Recast every spec in `config`, with paths resolved against the input dir.
pub fn recast_all(config: &Config) -> Result<Vec<RecastOutcome>> {
    let props = config.compression.writer_properties()?;
    let jobs = config
        .recast
        .iter()
        .map(|spec| (config.recast_path(spec), spec.columns.clone()))
        .collect();
    recast_specs(jobs, &props, config.fail_fast)
}

/// Convert the input directory, recast the configured files, then describe
/// each file that was recast successfully.
pub fn run(config: &Config) -> Result<RunSummary> {
    let opts = config.convert_options()?;
    let convert = convert::convert_dir(&config.input_dir, &opts)?;
    let recast = recast_all(config)?;

    let mut descriptions = Vec::new();
    for outcome in recast.iter().filter(|o| o.result.is_ok()) {
        match describe::describe_file(&outcome.path) {
            Ok(d) => descriptions.push(d),
            Err(e) => error!(path = %outcome.path.display(), "describe failed: {:#}", e),
        }
    }

    let summary = RunSummary {
        convert,
        recast,
        descriptions,
    };
    info!(failures = summary.failures(), "run finished");
    Ok(summary)
}
