use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{parse_bool, Column, ColumnKind, Table, Value};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` – header row, one record per line (the usual export)
/// * `.json`         – `[{ "Age": 41, "Attrition": "Yes", ... }, ...]`
/// * `.parquet`      – flat columns of strings, integers, floats or bools
///
/// Values are not transformed beyond picking a type for each column.
pub fn load_file(path: &Path) -> Result<Table, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }?;

    let mut seen = BTreeSet::new();
    if let Some(name) = table.schema().column_names().find(|name| !seen.insert(*name)) {
        return Err(LoadError::Malformed(format!("duplicate column '{name}'")));
    }
    if table.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    log::info!(
        "Loaded {} rows with {} columns from {}",
        table.len(),
        table.schema().columns().len(),
        path.display()
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header row with column names, then one record per line.
/// Blank cells are missing values; ragged rows are rejected by the reader.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(open(path)?);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    let columns: Vec<Column> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let kind = infer_kind(records.iter().map(|r| r.get(idx).unwrap_or("")));
            Column::new(name, kind)
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&columns)
                .map(|(cell, col)| Value::parse_as(cell, col.kind))
                .collect()
        })
        .collect();

    Ok(Table::from_rows(columns, rows))
}

fn guess_kind(s: &str) -> ColumnKind {
    if s.parse::<i64>().is_ok() {
        ColumnKind::Integer
    } else if s.parse::<f64>().is_ok() {
        ColumnKind::Float
    } else if parse_bool(s).is_some() {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

/// Narrowest kind that every non-blank cell fits. All-blank columns are text.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let next = kind.map_or(guess_kind(cell), |k| k.unify(guess_kind(cell)));
        if next == ColumnKind::Text {
            return next;
        }
        kind = Some(next);
    }
    kind.unwrap_or(ColumnKind::Text)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Age": 41, "Attrition": "Yes", "Department": "Sales", "MonthlyIncome": 5993 },
///   ...
/// ]
/// ```
///
/// Keys absent from a record are missing values for that record.
fn load_json(path: &Path) -> Result<Table, LoadError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Malformed("expected top-level JSON array".into()))?;

    let mut names: Vec<String> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Malformed(format!("row {i} is not a JSON object")))?;

        let mut row = vec![Value::Null; names.len()];
        for (key, val) in obj {
            let pos = *positions.entry(key.clone()).or_insert_with(|| {
                names.push(key.clone());
                names.len() - 1
            });
            if row.len() <= pos {
                row.resize(pos + 1, Value::Null);
            }
            row[pos] = json_to_value(val);
        }
        rows.push(row);
    }

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(pos, name)| {
            let kind = rows
                .iter()
                .filter_map(|row| row.get(pos).and_then(Value::kind))
                .reduce(ColumnKind::unify)
                .unwrap_or(ColumnKind::Text);
            Column::new(name, kind)
        })
        .collect();

    Ok(Table::from_rows(columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per attribute.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Column types without a direct
/// counterpart are kept as their display text.
fn load_parquet(path: &Path) -> Result<Table, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), arrow_kind(f.data_type())))
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }
    }

    Ok(Table::from_rows(columns, rows))
}

// -- Arrow helpers --

fn arrow_kind(data_type: &DataType) -> ColumnKind {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => ColumnKind::Integer,
        DataType::Float32 | DataType::Float64 => ColumnKind::Float,
        DataType::Boolean => ColumnKind::Bool,
        _ => ColumnKind::Text,
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value, LoadError> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        _ => Value::Text(array_value_to_string(col.as_ref(), row)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_columns_get_inferred_kinds() {
        let file = write_temp(
            ".csv",
            "Age,Attrition,MonthlyIncome,Rate\n41,Yes,5993,0.5\n49,No,5130,\n",
        );
        let table = load_file(file.path()).unwrap();
        let kinds: Vec<ColumnKind> = table.schema().columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Text,
                ColumnKind::Integer,
                ColumnKind::Float
            ]
        );
        assert_eq!(table.records()[1].get(3), &Value::Null);
    }

    #[test]
    fn mixed_numeric_and_text_cells_make_a_text_column() {
        let file = write_temp(".csv", "Code\n7\nX1\n");
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.schema().column("Code").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.records()[0].get(0), &Value::from("7"));
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let file = write_temp(".tsv", "Department\tAge\nSales\t30\n");
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.records()[0].get(1), &Value::Integer(30));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_file(Path::new("/definitely/not/here/EA.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn header_only_file_is_empty() {
        let file = write_temp(".csv", "Age,Attrition\n");
        assert!(matches!(load_file(file.path()), Err(LoadError::Empty(_))));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let file = write_temp(".csv", "Age,Attrition\n41,Yes\n49\n");
        assert!(matches!(load_file(file.path()), Err(LoadError::Csv(_))));
    }

    #[test]
    fn duplicate_headers_are_malformed() {
        let file = write_temp(".csv", "Age,Department,Age\n41,Sales,42\n");
        assert!(matches!(
            load_file(file.path()),
            Err(LoadError::Malformed(msg)) if msg == "duplicate column 'Age'"
        ));
    }

    #[test]
    fn nan_and_infinite_cells_load_as_missing() {
        let file = write_temp(
            ".csv",
            "Department,Age,MonthlyIncome\nSales,30,4000\nSales,45,NaN\nHR,50,5000.5\nHR,inf,1e400\n",
        );
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.schema().column("Age").unwrap().kind, ColumnKind::Float);
        assert_eq!(
            table.numeric_values("MonthlyIncome").unwrap(),
            vec![Some(4000.0), None, Some(5000.5), None]
        );
        assert_eq!(
            table.numeric_values("Age").unwrap(),
            vec![Some(30.0), Some(45.0), Some(50.0), None]
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_temp(".xlsx", "whatever");
        assert!(matches!(
            load_file(file.path()),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let file = write_temp(
            ".json",
            r#"[{"Age": 41, "Attrition": "Yes"}, {"Age": 30.5}]"#,
        );
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.schema().column("Age").unwrap().kind, ColumnKind::Float);
        let attrition = table.schema().position("Attrition").unwrap();
        assert_eq!(table.records()[1].get(attrition), &Value::Null);
        assert_eq!(
            table.numeric_values("Age").unwrap(),
            vec![Some(41.0), Some(30.5)]
        );
    }

    #[test]
    fn json_root_must_be_an_array() {
        let file = write_temp(".json", r#"{"Age": 41}"#);
        assert!(matches!(load_file(file.path()), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn parquet_flat_columns_round_trip_into_a_table() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Department", DataType::Utf8, false),
            Field::new("Age", DataType::Int64, true),
            Field::new("MonthlyIncome", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["Sales", "R&D"])),
                Arc::new(Int64Array::from(vec![Some(30), None])),
                Arc::new(Float64Array::from(vec![4000.0, 6000.0])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().column("Age").unwrap().kind, ColumnKind::Integer);
        assert_eq!(table.records()[1].get(1), &Value::Null);
        assert_eq!(table.records()[1].get(0), &Value::from("R&D"));
    }
}
