// src/recast/mod.rs
pub mod cast;
pub mod date_parser;
pub mod types;

pub use types::{mobility_columns, ColumnCast, RecastSpec, TargetType};

use crate::io::{read_parquet, write_parquet_atomic};
use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef},
    datatypes::{Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use parquet::file::properties::WriterProperties;
use std::{collections::HashSet, path::Path, sync::Arc};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecastReport {
    pub rows: u64,
    /// Per projected column: cells that were present in the input but
    /// could not be converted and were written as null.
    pub nulled: Vec<(String, usize)>,
}

/// Output schema: exactly `columns`, in order, all nullable.
pub fn target_schema(columns: &[ColumnCast]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(&c.name, c.target.data_type(), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Rewrite the Parquet file at `path` in place so that it holds only
/// `columns`, each coerced to its target type with null-on-failure.
///
/// The file is fully materialised before the rewrite starts. A missing file
/// or a missing column fails the whole step and leaves the file untouched.
#[tracing::instrument(level = "info", skip(columns, props), fields(path = %path.display()))]
pub fn recast_file(
    path: &Path,
    columns: &[ColumnCast],
    props: WriterProperties,
) -> Result<RecastReport> {
    if !path.is_file() {
        bail!("recast input `{}` does not exist", path.display());
    }
    if columns.is_empty() {
        bail!("no columns to project for {}", path.display());
    }
    let mut seen = HashSet::new();
    for c in columns {
        if !seen.insert(c.name.as_str()) {
            bail!("column `{}` listed more than once", c.name);
        }
    }

    let (source_schema, batches) = read_parquet(path)?;
    debug!(batches = batches.len(), "materialised input");

    let indices = columns
        .iter()
        .map(|c| {
            source_schema
                .index_of(&c.name)
                .with_context(|| format!("column `{}` not found in {}", c.name, path.display()))
        })
        .collect::<Result<Vec<usize>>>()?;

    let schema = target_schema(columns);
    let mut nulled = vec![0usize; columns.len()];
    let mut out = Vec::with_capacity(batches.len());

    for batch in &batches {
        let mut cols: Vec<ArrayRef> = Vec::with_capacity(columns.len());
        for (slot, (idx, c)) in indices.iter().zip(columns).enumerate() {
            let src = batch.column(*idx);
            let converted = cast::cast_column(src, c.target)
                .with_context(|| format!("recasting column `{}`", c.name))?;
            nulled[slot] += converted.null_count().saturating_sub(src.null_count());
            cols.push(converted);
        }
        out.push(
            RecordBatch::try_new(schema.clone(), cols).context("building recast RecordBatch")?,
        );
    }
    drop(batches);

    let rows = write_parquet_atomic(path, schema, out.into_iter().map(Ok), props)?;

    let nulled: Vec<(String, usize)> = columns
        .iter()
        .map(|c| c.name.clone())
        .zip(nulled)
        .collect();
    for (name, n) in nulled.iter().filter(|(_, n)| *n > 0) {
        info!(column = %name, cells = n, "values failed to cast and were nulled");
    }
    info!(rows, "recast complete");

    Ok(RecastReport { rows, nulled })
}
