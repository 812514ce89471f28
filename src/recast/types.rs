use anyhow::{anyhow, Error, Result};
use arrow::datatypes::DataType;
use serde::Deserialize;
use std::{fmt, path::PathBuf, str::FromStr};

/// Column types a recast can coerce to, named the way SQL engines name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TargetType {
    Date,
    Varchar,
    Double,
    BigInt,
    Boolean,
}

impl TargetType {
    /// Arrow type the column ends up as.
    ///
    /// - DATE    → Date32
    /// - VARCHAR → Utf8
    /// - DOUBLE  → Float64
    /// - BIGINT  → Int64
    /// - BOOLEAN → Boolean
    pub fn data_type(self) -> DataType {
        match self {
            TargetType::Date => DataType::Date32,
            TargetType::Varchar => DataType::Utf8,
            TargetType::Double => DataType::Float64,
            TargetType::BigInt => DataType::Int64,
            TargetType::Boolean => DataType::Boolean,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Date => "DATE",
            TargetType::Varchar => "VARCHAR",
            TargetType::Double => "DOUBLE",
            TargetType::BigInt => "BIGINT",
            TargetType::Boolean => "BOOLEAN",
        }
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "DATE" => Ok(TargetType::Date),
            "VARCHAR" | "TEXT" | "STRING" => Ok(TargetType::Varchar),
            "DOUBLE" | "FLOAT8" => Ok(TargetType::Double),
            "BIGINT" | "INT8" | "INTEGER" => Ok(TargetType::BigInt),
            "BOOLEAN" | "BOOL" => Ok(TargetType::Boolean),
            _ => Err(anyhow!("unsupported cast target `{}`", s)),
        }
    }
}

impl TryFrom<String> for TargetType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One projected column and the type it is coerced to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnCast {
    pub name: String,
    #[serde(rename = "type")]
    pub target: TargetType,
}

impl ColumnCast {
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        ColumnCast {
            name: name.into(),
            target,
        }
    }
}

/// A file to rewrite in place, keeping only `columns`, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecastSpec {
    pub file: PathBuf,
    #[serde(default = "mobility_columns")]
    pub columns: Vec<ColumnCast>,
}

impl RecastSpec {
    /// Recast `file` with the default mobility-ratio columns.
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        RecastSpec {
            file: file.into(),
            columns: mobility_columns(),
        }
    }
}

impl Default for RecastSpec {
    fn default() -> Self {
        RecastSpec::for_file("indoor_outdoor_ratio_unsmoothed.parquet")
    }
}

/// `week` DATE, `fips` VARCHAR, `r_raw` DOUBLE, `r_weighted_dwell` DOUBLE
pub fn mobility_columns() -> Vec<ColumnCast> {
    vec![
        ColumnCast::new("week", TargetType::Date),
        ColumnCast::new("fips", TargetType::Varchar),
        ColumnCast::new("r_raw", TargetType::Double),
        ColumnCast::new("r_weighted_dwell", TargetType::Double),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_type_names() -> Result<()> {
        assert_eq!("date".parse::<TargetType>()?, TargetType::Date);
        assert_eq!(" VARCHAR ".parse::<TargetType>()?, TargetType::Varchar);
        assert_eq!("text".parse::<TargetType>()?, TargetType::Varchar);
        assert_eq!("Double".parse::<TargetType>()?, TargetType::Double);
        assert_eq!("int8".parse::<TargetType>()?, TargetType::BigInt);
        assert_eq!("bool".parse::<TargetType>()?, TargetType::Boolean);
        assert!("DECIMAL(10,2)".parse::<TargetType>().is_err());
        Ok(())
    }

    #[test]
    fn default_spec_targets_ratio_file() {
        let spec = RecastSpec::default();
        assert_eq!(
            spec.file,
            PathBuf::from("indoor_outdoor_ratio_unsmoothed.parquet")
        );
        let names: Vec<&str> = spec.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["week", "fips", "r_raw", "r_weighted_dwell"]);
        assert_eq!(spec.columns[0].target.data_type(), DataType::Date32);
        assert_eq!(spec.columns[1].target.data_type(), DataType::Utf8);
        assert_eq!(spec.columns[2].target.data_type(), DataType::Float64);
        assert_eq!(spec.columns[3].target.data_type(), DataType::Float64);
    }
}
