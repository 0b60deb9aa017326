use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::SchemaError;

/// Column names the dashboard pipeline reads.
pub mod columns {
    pub const DEPARTMENT: &str = "Department";
    pub const JOB_ROLE: &str = "JobRole";
    pub const OVERTIME: &str = "OverTime";
    pub const ATTRITION: &str = "Attrition";
    pub const AGE: &str = "Age";
    pub const MONTHLY_INCOME: &str = "MonthlyIncome";
    pub const JOB_LEVEL: &str = "JobLevel";
    pub const WORK_LIFE_BALANCE: &str = "WorkLifeBalance";
    pub const YEARS_AT_COMPANY: &str = "YearsAtCompany";
}

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Used as a `BTreeMap` / `BTreeSet` key downstream, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Float(_) | Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Interpret the value as an `f64`. Text, bools and missing cells have no numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of a present value; `None` for `Null`.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Text(_) => Some(ColumnKind::Text),
            Value::Integer(_) => Some(ColumnKind::Integer),
            Value::Float(_) => Some(ColumnKind::Float),
            Value::Bool(_) => Some(ColumnKind::Bool),
            Value::Null => None,
        }
    }

    /// Parse raw text as a value of `kind`. Blank text is `Null`; text that
    /// does not fit the kind falls back to `Text` so it simply matches nothing.
    pub fn parse_as(raw: &str, kind: ColumnKind) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        let parsed = match kind {
            ColumnKind::Integer => s.parse::<i64>().ok().map(Value::Integer),
            ColumnKind::Float => s.parse::<f64>().ok().map(Value::Float),
            ColumnKind::Bool => parse_bool(s).map(Value::Bool),
            ColumnKind::Text => None,
        };
        parsed.unwrap_or_else(|| Value::Text(s.to_string()))
    }

    /// Convert into `kind`, widening integers to floats and rendering
    /// anything else as text. A value that cannot be read as `kind` becomes `Null`,
    /// and so does a NaN or infinite float.
    pub fn coerce(self, kind: ColumnKind) -> Value {
        match (self, kind) {
            (Value::Null, _) => Value::Null,
            (Value::Float(v), _) if !v.is_finite() => Value::Null,
            (Value::Integer(i), ColumnKind::Float) => Value::Float(i as f64),
            (v, k) if v.kind() == Some(k) => v,
            (v, ColumnKind::Text) => Value::Text(v.to_string()),
            (v, k) => {
                let parsed = Value::parse_as(&v.to_string(), k);
                if parsed.kind() == Some(k) {
                    parsed
                } else {
                    Value::Null
                }
            }
        }
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Columns and schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Bool,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    /// Smallest kind able to hold both `self` and `other`.
    pub fn unify(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Column {
            name: name.into(),
            kind,
        }
    }
}

/// Column layout plus the domain of every column as observed in the full
/// dataset at load time. Filtered tables share their parent's schema, so
/// the domains never shrink when rows are dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    index: BTreeMap<String, usize>,
    domains: Vec<BTreeSet<Value>>,
}

impl Schema {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn position(&self, name: &str) -> Result<usize, SchemaError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, SchemaError> {
        Ok(&self.columns[self.position(name)?])
    }

    /// Sorted set of values observed in the full dataset.
    pub fn domain(&self, name: &str) -> Result<&BTreeSet<Value>, SchemaError> {
        Ok(&self.domains[self.position(name)?])
    }

    /// Position of `name`, failing unless the column holds numbers.
    pub fn numeric_position(&self, name: &str) -> Result<usize, SchemaError> {
        let pos = self.position(name)?;
        if self.columns[pos].kind.is_numeric() {
            Ok(pos)
        } else {
            Err(SchemaError::NotNumeric(name.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One employee observation: one value per schema column, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record(Vec<Value>);

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Record(values)
    }

    pub fn get(&self, position: usize) -> &Value {
        &self.0[position]
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Table – the loaded dataset or a filtered view of it
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl Table {
    /// Build a table and its column domains from loaded rows.
    ///
    /// Every row is padded or truncated to the column count, and each value is
    /// coerced to its column's kind, so the table invariants hold whatever the
    /// caller passes in. Column names are expected to be unique; with a
    /// duplicate, lookups by name resolve to the last column of that name.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let mut domains: Vec<BTreeSet<Value>> = vec![BTreeSet::new(); width];

        let records: Vec<Record> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                let values: Vec<Value> = row
                    .into_iter()
                    .zip(&columns)
                    .map(|(v, col)| v.coerce(col.kind))
                    .collect();
                for (domain, v) in domains.iter_mut().zip(&values) {
                    if !domain.contains(v) {
                        domain.insert(v.clone());
                    }
                }
                Record(values)
            })
            .collect();

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Table {
            schema: Arc::new(Schema {
                columns,
                index,
                domains,
            }),
            records,
        }
    }

    /// Rows at `indices`, in the given order, sharing this table's schema.
    pub fn select(&self, indices: &[usize]) -> Table {
        Table {
            schema: Arc::clone(&self.schema),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cells of one column, in row order.
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a Value> + 'a, SchemaError> {
        let pos = self.schema.position(name)?;
        Ok(self.records.iter().map(move |r| r.get(pos)))
    }

    /// Cells of a numeric column as `f64`, `None` where missing.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>, SchemaError> {
        let pos = self.schema.numeric_position(name)?;
        Ok(self.records.iter().map(|r| r.get(pos).as_f64()).collect())
    }
}

/// Rows serialise as objects in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Row<'a>(&'a Schema, &'a Record);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.columns.len()))?;
                for (col, value) in self.0.columns.iter().zip(self.1.values()) {
                    map.serialize_entry(&col.name, value)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(&Row(&self.schema, record))?;
        }
        seq.end()
    }
}
