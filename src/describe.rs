use anyhow::{Context, Result};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Schema listing of one Parquet file, printed after a recast as a manual
/// sanity check.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescription {
    pub path: PathBuf,
    pub rows: i64,
    pub row_groups: usize,
    pub columns: Vec<ColumnDescription>,
}

/// Open the Parquet file and read its schema, row count and row-group count
/// from the footer. No data pages are decoded.
pub fn describe_file(path: &Path) -> Result<FileDescription> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of {}", path.display()))?;

    let meta = builder.metadata();
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| ColumnDescription {
            name: f.name().clone(),
            data_type: f.data_type().clone(),
            nullable: f.is_nullable(),
        })
        .collect();

    Ok(FileDescription {
        path: path.to_path_buf(),
        rows: meta.file_metadata().num_rows(),
        row_groups: meta.num_row_groups(),
        columns,
    })
}

/// SQL-style name for an Arrow type; anything without a short name falls
/// back to the Arrow spelling.
pub fn sql_type_name(dt: &DataType) -> String {
    match dt {
        DataType::Boolean => "BOOLEAN".into(),
        DataType::Int8 => "TINYINT".into(),
        DataType::Int16 => "SMALLINT".into(),
        DataType::Int32 => "INTEGER".into(),
        DataType::Int64 => "BIGINT".into(),
        DataType::Float32 => "FLOAT".into(),
        DataType::Float64 => "DOUBLE".into(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "VARCHAR".into(),
        DataType::Date32 | DataType::Date64 => "DATE".into(),
        DataType::Timestamp(_, None) => "TIMESTAMP".into(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".into(),
        DataType::Null => "NULL".into(),
        other => other.to_string(),
    }
}

impl fmt::Display for FileDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.path.display())?;
        writeln!(
            f,
            "rows: {}  row groups: {}",
            self.rows, self.row_groups
        )?;
        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max("column_name".len());
        writeln!(f, "{:<width$} | {:<24} | null", "column_name", "column_type")?;
        for c in &self.columns {
            writeln!(
                f,
                "{:<width$} | {:<24} | {}",
                c.name,
                sql_type_name(&c.data_type),
                if c.nullable { "YES" } else { "NO" }
            )?;
        }
        Ok(())
    }
}
