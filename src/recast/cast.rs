use crate::recast::{date_parser, types::TargetType};
use anyhow::{Context, Result};
use arrow::{
    array::{
        new_null_array, Array, ArrayRef, Date32Builder, Float64Array, Int64Array, StringArray,
    },
    compute::{can_cast_types, cast, cast_with_options, CastOptions},
    datatypes::{DataType, Date32Type},
};
use std::sync::Arc;
use tracing::warn;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Best-effort cast: any cell that cannot be represented as `target` becomes null.
///
/// String columns are cleaned and parsed directly; every other source goes
/// through the Arrow cast kernel in safe mode. A source type the kernel cannot
/// cast at all yields an all-null column.
pub fn cast_column(array: &ArrayRef, target: TargetType) -> Result<ArrayRef> {
    let to = target.data_type();
    if array.data_type() == &to {
        return Ok(array.clone());
    }

    match array.data_type() {
        DataType::Utf8 => cast_strings(as_strings(array)?, target),
        DataType::LargeUtf8 | DataType::Utf8View => {
            let narrowed = cast(array, &DataType::Utf8).context("narrowing string column")?;
            cast_strings(as_strings(&narrowed)?, target)
        }
        from if can_cast_types(from, &to) => {
            let opts = CastOptions {
                safe: true,
                ..Default::default()
            };
            cast_with_options(array, &to, &opts)
                .with_context(|| format!("casting {} to {}", from, target))
        }
        from => {
            warn!(from = %from, to = %target, "no cast available, column becomes null");
            Ok(new_null_array(&to, array.len()))
        }
    }
}

fn as_strings(array: &ArrayRef) -> Result<&StringArray> {
    array
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("expected Utf8 column, got {}", array.data_type()))
}

fn cast_strings(strings: &StringArray, target: TargetType) -> Result<ArrayRef> {
    let out: ArrayRef = match target {
        TargetType::Varchar => Arc::new(strings.clone()),
        TargetType::Double => Arc::new(
            strings
                .iter()
                .map(|opt| opt.and_then(|s| clean_str(s).parse::<f64>().ok()))
                .collect::<Float64Array>(),
        ),
        TargetType::BigInt => Arc::new(
            strings
                .iter()
                .map(|opt| opt.and_then(|s| clean_str(s).parse::<i64>().ok()))
                .collect::<Int64Array>(),
        ),
        TargetType::Date => {
            let mut b = Date32Builder::with_capacity(strings.len());
            for opt in strings.iter() {
                let day = opt.and_then(date_parser::parse_date);
                b.append_option(day.map(Date32Type::from_naive_date));
            }
            Arc::new(b.finish())
        }
        TargetType::Boolean => {
            let cleaned: StringArray = strings.iter().map(|opt| opt.map(clean_str)).collect();
            let opts = CastOptions {
                safe: true,
                ..Default::default()
            };
            cast_with_options(&cleaned, &DataType::Boolean, &opts)
                .context("casting cleaned strings to Boolean")?
        }
    };
    Ok(out)
}
