// src/io.rs

use anyhow::{Context, Result};
use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

const READ_BATCH_SIZE: usize = 8192;

/// Read every record batch of a Parquet file into memory.
///
/// The file handle is closed before this returns, so the caller is free to
/// overwrite `path` with the result.
pub fn read_parquet(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of {}", path.display()))?
        .with_batch_size(READ_BATCH_SIZE);
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .with_context(|| format!("building Parquet reader for {}", path.display()))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok((schema, batches))
}

/// Write `batches` to `path` atomically: everything goes to a temp file in the
/// same directory, which is renamed over `path` only once the footer is written.
/// An existing file at `path` is replaced and keeps its permissions; a new
/// file gets the umask default, like `File::create`. Returns the number of
/// rows written.
pub fn write_parquet_atomic<I>(
    path: &Path,
    schema: SchemaRef,
    batches: I,
    props: WriterProperties,
) -> Result<u64>
where
    I: IntoIterator<Item = Result<RecordBatch>>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let existing = fs::metadata(path).ok().map(|m| m.permissions());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".csv2parquet-").suffix(".parquet.tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // requested mode is masked by the process umask at creation
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;

    let mut rows = 0u64;
    {
        let mut writer =
            ArrowWriter::try_new(BufWriter::new(tmp.as_file_mut()), schema, Some(props))
                .context("creating ArrowWriter")?;
        for batch in batches {
            let batch = batch?;
            rows += batch.num_rows() as u64;
            writer.write(&batch).context("writing record batch")?;
        }
        let mut out = writer.into_inner().context("finishing Parquet footer")?;
        out.flush().context("flushing Parquet output")?;
    }

    if let Some(perms) = existing {
        tmp.as_file()
            .set_permissions(perms)
            .with_context(|| format!("copying permissions of {}", path.display()))?;
    }

    // dropping `tmp` on any early return above removes the partial file
    tmp.persist(path)
        .with_context(|| format!("renaming temp file over {}", path.display()))?;
    Ok(rows)
}
