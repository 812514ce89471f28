// src/config.rs

use crate::{convert::ConvertOptions, recast::RecastSpec};
use anyhow::{Context, Result};
use parquet::{
    basic::{BrotliLevel, Compression as ParquetCompression, ZstdLevel},
    file::properties::WriterProperties,
};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Parquet codec for every file the tool writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Uncompressed,
    #[default]
    Snappy,
    Zstd,
    Brotli,
}

impl Compression {
    pub fn writer_properties(self) -> Result<WriterProperties> {
        let codec = match self {
            Compression::Uncompressed => ParquetCompression::UNCOMPRESSED,
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::try_new(3)?),
            Compression::Brotli => ParquetCompression::BROTLI(BrotliLevel::try_new(5)?),
        };
        Ok(WriterProperties::builder()
            .set_compression(codec)
            .set_dictionary_enabled(true)
            .build())
    }
}

/// Everything one run needs. Loaded from YAML, then overridden by CLI flags.
///
/// ```yaml
/// input_dir: data
/// pattern: "*.csv"
/// compression: zstd
/// recast:
///   - file: indoor_outdoor_ratio_unsmoothed.parquet
///     columns:
///       - { name: week, type: DATE }
///       - { name: fips, type: VARCHAR }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input_dir: PathBuf,
    pub pattern: String,
    pub compression: Compression,
    pub infer_rows: Option<usize>,
    pub fail_fast: bool,
    pub recast: Vec<RecastSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: PathBuf::from("data"),
            pattern: "*.csv".into(),
            compression: Compression::default(),
            infer_rows: None,
            fail_fast: false,
            recast: vec![RecastSpec::default()],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(Into::into)
    }

    /// Where a recast target lives: absolute paths as-is, otherwise inside
    /// `input_dir` next to the converted files.
    pub fn recast_path(&self, spec: &RecastSpec) -> PathBuf {
        if spec.file.is_absolute() {
            spec.file.clone()
        } else {
            self.input_dir.join(&spec.file)
        }
    }

    pub fn convert_options(&self) -> Result<ConvertOptions> {
        Ok(ConvertOptions {
            pattern: self.pattern.clone(),
            infer_rows: self.infer_rows,
            fail_fast: self.fail_fast,
            props: self.compression.writer_properties()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recast::{mobility_columns, ColumnCast, TargetType};
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_data_dir_layout() {
        let cfg = Config::default();
        assert_eq!(cfg.input_dir, PathBuf::from("data"));
        assert_eq!(cfg.pattern, "*.csv");
        assert_eq!(cfg.recast, vec![RecastSpec::default()]);
        assert_eq!(
            cfg.recast_path(&cfg.recast[0]),
            PathBuf::from("data/indoor_outdoor_ratio_unsmoothed.parquet")
        );
    }

    #[test]
    fn yaml_overrides_and_fills_defaults() -> Result<()> {
        let cfg = Config::from_yaml(
            r#"
input_dir: /srv/mobility
compression: zstd
recast:
  - file: ratios.parquet
  - file: /abs/other.parquet
    columns:
      - { name: day, type: date }
      - { name: visits, type: BIGINT }
"#,
        )?;
        assert_eq!(cfg.input_dir, PathBuf::from("/srv/mobility"));
        assert_eq!(cfg.pattern, "*.csv");
        assert_eq!(cfg.compression, Compression::Zstd);
        assert_eq!(cfg.recast.len(), 2);
        assert_eq!(cfg.recast[0].columns, mobility_columns());
        assert_eq!(
            cfg.recast[1].columns,
            vec![
                ColumnCast::new("day", TargetType::Date),
                ColumnCast::new("visits", TargetType::BigInt),
            ]
        );
        assert_eq!(
            cfg.recast_path(&cfg.recast[0]),
            PathBuf::from("/srv/mobility/ratios.parquet")
        );
        assert_eq!(
            cfg.recast_path(&cfg.recast[1]),
            PathBuf::from("/abs/other.parquet")
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_keys_and_types() {
        assert!(Config::from_yaml("input_dirr: x\n").is_err());
        assert!(Config::from_yaml(
            "recast:\n  - file: a.parquet\n    columns:\n      - { name: a, type: MONEY }\n"
        )
        .is_err());
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("csv2parquet.yaml");
        fs::write(&path, "pattern: \"*.tsv\"\nfail_fast: true\n")?;
        let cfg = Config::load(&path)?;
        assert_eq!(cfg.pattern, "*.tsv");
        assert!(cfg.fail_fast);
        assert!(Config::load(&dir.path().join("missing.yaml")).is_err());
        Ok(())
    }

    #[test]
    fn every_codec_builds_properties() -> Result<()> {
        for c in [
            Compression::Uncompressed,
            Compression::Snappy,
            Compression::Zstd,
            Compression::Brotli,
        ] {
            c.writer_properties()?;
        }
        Ok(())
    }
}
