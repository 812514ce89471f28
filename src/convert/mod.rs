// src/convert/mod.rs
pub mod csv;

use anyhow::{anyhow, bail, Context, Result};
use glob::{glob, Pattern};
use parquet::file::properties::WriterProperties;
use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

pub const OUTPUT_EXTENSION: &str = "parquet";

/// Knobs for one batch conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Glob matched against file names inside the input directory.
    pub pattern: String,
    /// Records sampled for schema inference; `None` reads the whole file.
    pub infer_rows: Option<usize>,
    /// Stop at the first failing file instead of skipping it.
    pub fail_fast: bool,
    pub props: WriterProperties,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            pattern: "*.csv".into(),
            infer_rows: None,
            fail_fast: false,
            props: WriterProperties::builder().build(),
        }
    }
}

/// An input file paired with the Parquet file it will become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct Converted {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: u64,
}

#[derive(Debug)]
pub struct Failed {
    pub input: PathBuf,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub converted: Vec<Converted>,
    pub failed: Vec<Failed>,
}

impl ConvertReport {
    pub fn rows(&self) -> u64 {
        self.converted.iter().map(|c| c.rows).sum()
    }
}

/// The sibling path with the extension swapped for `.parquet`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

/// All regular files in `dir` matching `pattern`, sorted.
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!(
            "input dir `{}` does not exist or is not a directory",
            dir.display()
        );
    }
    let dir_str = dir
        .to_str()
        .ok_or_else(|| anyhow!("input dir `{}` is not valid UTF-8", dir.display()))?;
    let full = format!("{}/{}", Pattern::escape(dir_str), pattern);

    let mut files = Vec::new();
    for entry in glob(&full).with_context(|| format!("invalid glob pattern `{}`", pattern))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("cannot read glob entry: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Pair each input with its output. Inputs whose output would be written by
/// another input too, or would overwrite an input, are returned as failures
/// and never converted.
pub fn plan(inputs: &[PathBuf]) -> (Vec<Job>, Vec<Failed>) {
    let input_set: HashSet<&Path> = inputs.iter().map(PathBuf::as_path).collect();
    let mut by_output: BTreeMap<PathBuf, Vec<&PathBuf>> = BTreeMap::new();
    for input in inputs {
        by_output.entry(output_path(input)).or_default().push(input);
    }

    let mut jobs = Vec::with_capacity(inputs.len());
    let mut failed = Vec::new();
    for (output, sources) in by_output {
        let writers = sources.len();
        if writers > 1 {
            for input in sources {
                failed.push(Failed {
                    input: input.clone(),
                    error: anyhow!(
                        "output {} would be written by {} inputs",
                        output.display(),
                        writers
                    ),
                });
            }
        } else if input_set.contains(output.as_path()) {
            failed.push(Failed {
                input: sources[0].clone(),
                error: anyhow!("output {} is itself an input", output.display()),
            });
        } else {
            jobs.push(Job {
                input: sources[0].clone(),
                output,
            });
        }
    }
    jobs.sort_by(|a, b| a.input.cmp(&b.input));
    failed.sort_by(|a, b| a.input.cmp(&b.input));
    (jobs, failed)
}

/// Convert one file, logging the outcome.
#[tracing::instrument(level = "debug", skip(job, opts), fields(input = %job.input.display()))]
pub fn convert_file(job: &Job, opts: &ConvertOptions) -> Result<u64> {
    let start = Instant::now();
    let rows = csv::csv_to_parquet(
        &job.input,
        &job.output,
        opts.infer_rows,
        opts.props.clone(),
    )?;
    info!(
        input = %job.input.display(),
        output = %job.output.display(),
        rows,
        elapsed = ?start.elapsed(),
        "converted"
    );
    Ok(rows)
}

/// Convert every file in `dir` matching `opts.pattern`, one after another.
///
/// A file that fails is logged and recorded in the report, and the batch
/// moves on; with `fail_fast` the first failure is returned as the error
/// instead. Only an unreadable directory or bad pattern fails the call
/// otherwise.
#[tracing::instrument(level = "info", skip(opts), fields(dir = %dir.display()))]
pub fn convert_dir(dir: &Path, opts: &ConvertOptions) -> Result<ConvertReport> {
    let inputs = discover(dir, &opts.pattern)?;
    info!(count = inputs.len(), pattern = %opts.pattern, "discovered input files");

    let (jobs, failed) = plan(&inputs);
    let mut report = ConvertReport {
        converted: Vec::with_capacity(jobs.len()),
        failed: Vec::new(),
    };
    for f in failed {
        warn!(input = %f.input.display(), "skipping: {:#}", f.error);
        if opts.fail_fast {
            return Err(f.error.context(format!("planning {}", f.input.display())));
        }
        report.failed.push(f);
    }

    for job in jobs {
        match convert_file(&job, opts) {
            Ok(rows) => report.converted.push(Converted {
                input: job.input,
                output: job.output,
                rows,
            }),
            Err(error) => {
                warn!(input = %job.input.display(), "conversion failed: {:#}", error);
                if opts.fail_fast {
                    return Err(error.context(format!("converting {}", job.input.display())));
                }
                report.failed.push(Failed {
                    input: job.input,
                    error,
                });
            }
        }
    }

    info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        rows = report.rows(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_parquet;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,csv2parquet=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn parquet_rows(path: &Path) -> Result<usize> {
        let (_, batches) = read_parquet(path)?;
        Ok(batches.iter().map(|b| b.num_rows()).sum())
    }

    #[test]
    fn output_swaps_extension() {
        assert_eq!(
            output_path(Path::new("data/a.csv")),
            PathBuf::from("data/a.parquet")
        );
        assert_eq!(
            output_path(Path::new("data/trips.2020.csv")),
            PathBuf::from("data/trips.2020.parquet")
        );
        assert_eq!(output_path(Path::new("noext")), PathBuf::from("noext.parquet"));
    }

    #[test]
    fn discover_matches_pattern_only() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("b.csv"), "x\n1\n")?;
        fs::write(dir.path().join("a.csv"), "x\n1\n")?;
        fs::write(dir.path().join("notes.txt"), "hi")?;
        fs::create_dir(dir.path().join("sub.csv"))?;

        let found = discover(dir.path(), "*.csv")?;
        assert_eq!(
            found,
            vec![dir.path().join("a.csv"), dir.path().join("b.csv")]
        );
        Ok(())
    }

    #[test]
    fn discover_missing_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(discover(&dir.path().join("missing"), "*.csv").is_err());
    }

    #[test]
    fn plan_rejects_colliding_outputs() {
        let inputs = vec![
            PathBuf::from("d/a.csv"),
            PathBuf::from("d/a.tsv"),
            PathBuf::from("d/b.csv"),
            PathBuf::from("d/c.parquet"),
        ];
        let (jobs, failed) = plan(&inputs);

        assert_eq!(
            jobs,
            vec![Job {
                input: PathBuf::from("d/b.csv"),
                output: PathBuf::from("d/b.parquet"),
            }]
        );
        let failed: Vec<&Path> = failed.iter().map(|f| f.input.as_path()).collect();
        assert_eq!(
            failed,
            [
                Path::new("d/a.csv"),
                Path::new("d/a.tsv"),
                Path::new("d/c.parquet")
            ]
        );
    }

    #[test]
    fn every_input_gets_an_output_with_same_rows() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let mut big = String::from("id,value,label\n");
        for i in 0..20_000 {
            big.push_str(&format!("{},{},row{}\n", i, i as f64 * 0.5, i));
        }
        fs::write(dir.path().join("big.csv"), &big)?;
        fs::write(dir.path().join("a.csv"), "x,y\n1,hello\n")?;
        fs::write(dir.path().join("skip.txt"), "x,y\n1,2\n")?;

        let report = convert_dir(dir.path(), &ConvertOptions::default())?;
        assert!(report.failed.is_empty());
        assert_eq!(report.converted.len(), 2);
        assert_eq!(report.rows(), 20_001);

        assert_eq!(parquet_rows(&dir.path().join("big.parquet"))?, 20_000);
        assert_eq!(parquet_rows(&dir.path().join("a.parquet"))?, 1);
        assert!(!dir.path().join("skip.parquet").exists());
        Ok(())
    }

    #[test]
    fn bad_file_is_skipped_and_batch_continues() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("a_bad.csv"), "a,b\n1,2\n3,4,5\n")?;
        fs::write(dir.path().join("b_good.csv"), "a,b\n1,2\n")?;

        let report = convert_dir(dir.path(), &ConvertOptions::default())?;
        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].input, dir.path().join("a_bad.csv"));
        assert!(dir.path().join("b_good.parquet").exists());
        assert!(!dir.path().join("a_bad.parquet").exists());
        Ok(())
    }

    #[test]
    fn fail_fast_stops_at_first_failure() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a_bad.csv"), "a,b\n1,2\n3,4,5\n")?;
        fs::write(dir.path().join("b_good.csv"), "a,b\n1,2\n")?;

        let opts = ConvertOptions {
            fail_fast: true,
            ..Default::default()
        };
        assert!(convert_dir(dir.path(), &opts).is_err());
        assert!(!dir.path().join("b_good.parquet").exists());
        Ok(())
    }

    #[test]
    fn existing_output_is_replaced() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "x\n1\n2\n3\n")?;
        fs::write(dir.path().join("a.parquet"), "stale")?;

        let report = convert_dir(dir.path(), &ConvertOptions::default())?;
        assert_eq!(report.converted.len(), 1);
        assert_eq!(parquet_rows(&dir.path().join("a.parquet"))?, 3);
        Ok(())
    }
}
