// src/convert/csv.rs

use crate::io::write_parquet_atomic;
use anyhow::{bail, Context, Result};
use arrow::csv::{reader::Format, ReaderBuilder};
use parquet::file::properties::WriterProperties;
use std::{
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom},
    path::Path,
    sync::Arc,
};
use tracing::debug;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const BATCH_SIZE: usize = 8192;

/// Pick the candidate delimiter that occurs most often in the header line,
/// ignoring anything between double quotes. Ties go to the earlier
/// candidate; no candidate at all means a single column, read with `,`.
pub fn sniff_delimiter(header: &str) -> u8 {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut quoted = false;
    for b in header.bytes() {
        if b == b'"' {
            quoted = !quoted;
        } else if !quoted {
            if let Some(i) = DELIMITER_CANDIDATES.iter().position(|d| *d == b) {
                counts[i] += 1;
            }
        }
    }

    DELIMITER_CANDIDATES
        .iter()
        .zip(counts)
        .rev()
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| *d)
        .unwrap_or(b',')
}

/// Read a headed CSV file with an inferred schema and write it as Parquet.
///
/// - the delimiter is sniffed from the header line
/// - the schema is inferred from the first `infer_rows` records (all if `None`)
/// - the output is written atomically, replacing any existing file
///
/// Returns the number of data rows written.
pub fn csv_to_parquet(
    input: &Path,
    output: &Path,
    infer_rows: Option<usize>,
    props: WriterProperties,
) -> Result<u64> {
    let mut file = File::open(input).with_context(|| format!("opening {}", input.display()))?;

    let mut header = String::new();
    BufReader::new(&mut file)
        .read_line(&mut header)
        .with_context(|| format!("reading header of {}", input.display()))?;
    if header.trim().is_empty() {
        bail!("{} has no header row", input.display());
    }
    let delimiter = sniff_delimiter(&header);

    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);

    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("rewinding {}", input.display()))?;
    let (schema, sampled) = format
        .infer_schema(BufReader::new(&mut file), infer_rows)
        .with_context(|| format!("inferring schema of {}", input.display()))?;
    let schema = Arc::new(schema);
    debug!(
        file = %input.display(),
        delimiter = %(delimiter as char).escape_default(),
        sampled,
        columns = schema.fields().len(),
        "inferred schema"
    );

    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("rewinding {}", input.display()))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(file)
        .context("creating CSV reader")?;

    let batches = reader.map(|batch| {
        batch.with_context(|| format!("parsing {}", input.display()))
    });
    write_parquet_atomic(output, schema, batches, props)
}
