//! Descriptive statistics over a (possibly filtered) table.
//!
//! Every function here is pure: it reads the table, never mutates it, and
//! returns the same result for the same input. Empty inputs are not errors;
//! each result type has an explicit "nothing to report" shape instead of NaN.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::model::{Table, Value};
use crate::error::SchemaError;

/// Upper bound on histogram buckets.
pub const MAX_BUCKETS: usize = 10_000;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A scalar that may have no input to be computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Value(f64),
    NoData,
}

impl Statistic {
    pub fn value(self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(v),
            Statistic::NoData => None,
        }
    }
}

impl Serialize for Statistic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Count per (outer key, inner key) pair.
///
/// The grid is dense: `outer_keys` and `inner_keys` are the full-dataset
/// domains of the two columns and every combination has a cell, zero or not.
/// Chart axes therefore stay put when a filter removes every row of a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCounts {
    pub outer_column: String,
    pub inner_column: String,
    pub outer_keys: Vec<Value>,
    pub inner_keys: Vec<Value>,
    /// `counts[o][i]` is the count for `(outer_keys[o], inner_keys[i])`.
    pub counts: Vec<Vec<u64>>,
}

impl GroupCounts {
    pub fn get(&self, outer: &Value, inner: &Value) -> Option<u64> {
        let o = self.outer_keys.binary_search(outer).ok()?;
        let i = self.inner_keys.binary_search(inner).ok()?;
        Some(self.counts[o][i])
    }

    /// Sum across the inner dimension for one outer key.
    pub fn outer_total(&self, outer: &Value) -> Option<u64> {
        let o = self.outer_keys.binary_search(outer).ok()?;
        Some(self.counts[o].iter().sum())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Pearson coefficient, or `Undefined` when it cannot be computed
/// (zero variance, fewer than two paired observations).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficient {
    Defined(f64),
    Undefined,
}

impl Coefficient {
    pub fn value(self) -> Option<f64> {
        match self {
            Coefficient::Defined(v) => Some(v),
            Coefficient::Undefined => None,
        }
    }
}

impl Serialize for Coefficient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Coefficient>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<Coefficient> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub low: f64,
    pub high: f64,
    pub count: u64,
}

/// Equal-width buckets over the observed span of a column.
/// `range` is `None` and `buckets` empty when the column had no values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub range: Option<(f64, f64)>,
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: Value,
    pub count: u64,
}

/// Count per domain value, ascending by value, zero counts included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

impl ValueCounts {
    pub fn get(&self, value: &Value) -> Option<u64> {
        self.counts
            .iter()
            .find(|vc| &vc.value == value)
            .map(|vc| vc.count)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|vc| vc.count).sum()
    }
}

/// Five-number summary plus mean for one group; the input of a box plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: Value,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Non-missing numbers of a column. NaN counts as missing.
fn present_values(table: &Table, column: &str) -> Result<Vec<f64>, SchemaError> {
    Ok(table
        .numeric_values(column)?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Percentage (0–100) of rows whose `column` equals `value`.
/// 0 for an empty table or a value that never occurs.
pub fn proportion(table: &Table, column: &str, value: &Value) -> Result<f64, SchemaError> {
    let hits = table.column_values(column)?.filter(|v| *v == value).count();
    if table.is_empty() {
        return Ok(0.0);
    }
    Ok(hits as f64 * 100.0 / table.len() as f64)
}

/// Arithmetic mean of the non-missing cells of a numeric column.
pub fn mean(table: &Table, column: &str) -> Result<Statistic, SchemaError> {
    let values = present_values(table, column)?;
    if values.is_empty() {
        return Ok(Statistic::NoData);
    }
    Ok(Statistic::Value(values.iter().sum::<f64>() / values.len() as f64))
}

/// Two-level grouped count over `[outer, inner]`.
///
/// Dense grid invariant: the result always holds the full cross product of
/// both columns' domains as observed in the unfiltered dataset (kept in the
/// shared schema), with absent combinations materialised as 0. The grid
/// total equals `table.len()`.
pub fn group_count(table: &Table, by: [&str; 2]) -> Result<GroupCounts, SchemaError> {
    let [outer, inner] = by;
    let schema = table.schema();
    let outer_pos = schema.position(outer)?;
    let inner_pos = schema.position(inner)?;

    let outer_keys: Vec<Value> = schema.domain(outer)?.iter().cloned().collect();
    let inner_keys: Vec<Value> = schema.domain(inner)?.iter().cloned().collect();
    let mut counts = vec![vec![0u64; inner_keys.len()]; outer_keys.len()];

    for record in table.records() {
        let o = outer_keys.binary_search(record.get(outer_pos));
        let i = inner_keys.binary_search(record.get(inner_pos));
        if let (Ok(o), Ok(i)) = (o, i) {
            counts[o][i] += 1;
        }
    }

    Ok(GroupCounts {
        outer_column: outer.to_string(),
        inner_column: inner.to_string(),
        outer_keys,
        inner_keys,
        counts,
    })
}

/// Names of every numeric column, in schema order.
pub fn numeric_columns(table: &Table) -> Vec<&str> {
    table
        .schema()
        .columns()
        .iter()
        .filter(|c| c.kind.is_numeric())
        .map(|c| c.name.as_str())
        .collect()
}

/// Pairwise Pearson correlation matrix. Each pair uses the rows where both
/// cells are present. The matrix is symmetric by construction.
pub fn correlation(table: &Table, columns: &[&str]) -> Result<CorrelationMatrix, SchemaError> {
    let series = columns
        .iter()
        .map(|c| table.numeric_values(c))
        .collect::<Result<Vec<_>, _>>()?;

    let n = columns.len();
    let mut values = vec![vec![Coefficient::Undefined; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                self_correlation(&series[i])
            } else {
                pearson(&series[i], &series[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

fn paired(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<(f64, f64)> {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .collect()
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

fn self_correlation(a: &[Option<f64>]) -> Coefficient {
    let values: Vec<f64> = a.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    if values.len() < 2 || is_constant(values.iter().copied()) {
        Coefficient::Undefined
    } else {
        Coefficient::Defined(1.0)
    }
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Coefficient {
    let pairs = paired(a, b);
    if pairs.len() < 2
        || is_constant(pairs.iter().map(|p| p.0))
        || is_constant(pairs.iter().map(|p| p.1))
    {
        return Coefficient::Undefined;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_finite() {
        Coefficient::Defined(r.clamp(-1.0, 1.0))
    } else {
        Coefficient::Undefined
    }
}

/// `bucket_count` equal-width buckets spanning the observed min/max of
/// `column` in this table. The last bucket is closed on the right. A column
/// holding a single distinct value spans `[v - 0.5, v + 0.5]`.
/// `bucket_count` must lie in `1..=MAX_BUCKETS`.
pub fn distribution(
    table: &Table,
    column: &str,
    bucket_count: usize,
) -> Result<Histogram, SchemaError> {
    if bucket_count == 0 {
        return Err(SchemaError::InvalidBucketCount);
    }
    if bucket_count > MAX_BUCKETS {
        return Err(SchemaError::TooManyBuckets {
            requested: bucket_count,
            max: MAX_BUCKETS,
        });
    }
    let values = present_values(table, column)?;

    let Some((min, max)) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    }) else {
        return Ok(Histogram {
            column: column.to_string(),
            range: None,
            buckets: Vec::new(),
        });
    };

    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (high - low) / bucket_count as f64;

    let mut counts = vec![0u64; bucket_count];
    for v in &values {
        let idx = ((v - low) / width) as usize;
        counts[idx.min(bucket_count - 1)] += 1;
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bucket {
            low: low + i as f64 * width,
            high: if i + 1 == bucket_count {
                high
            } else {
                low + (i + 1) as f64 * width
            },
            count,
        })
        .collect();

    Ok(Histogram {
        column: column.to_string(),
        range: Some((low, high)),
        buckets,
    })
}

/// Count of each domain value of `column`, sorted by value. Values absent
/// from the table still appear with a zero count.
pub fn value_counts(table: &Table, column: &str) -> Result<ValueCounts, SchemaError> {
    let mut counts: BTreeMap<&Value, u64> = table
        .schema()
        .domain(column)?
        .iter()
        .map(|v| (v, 0))
        .collect();
    for v in table.column_values(column)? {
        *counts.entry(v).or_default() += 1;
    }
    Ok(ValueCounts {
        column: column.to_string(),
        counts: counts
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: value.clone(),
                count,
            })
            .collect(),
    })
}

/// Summary of the numeric `value` column per key of `group`. Only groups
/// with at least one present value appear, ordered by key.
pub fn grouped_summary(
    table: &Table,
    group: &str,
    value: &str,
) -> Result<Vec<GroupSummary>, SchemaError> {
    let numbers = table.numeric_values(value)?;
    let mut groups: BTreeMap<&Value, Vec<f64>> = BTreeMap::new();
    for (key, v) in table.column_values(group)?.zip(numbers) {
        if let Some(v) = v.filter(|v| !v.is_nan()) {
            groups.entry(key).or_default().push(v);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_by(f64::total_cmp);
            let count = values.len();
            GroupSummary {
                key: key.clone(),
                count,
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[count - 1],
                mean: values.iter().sum::<f64>() / count as f64,
            }
        })
        .collect())
}

/// Linear-interpolated quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterSpec};
    use crate::data::model::{Column, ColumnKind};

    fn employees() -> Table {
        let rows = [
            ("Sales", "Yes", 30, 4000, 1),
            ("Sales", "No", 45, 6000, 2),
            ("R&D", "No", 38, 5200, 2),
            ("R&D", "No", 52, 9100, 3),
            ("HR", "Yes", 26, 2500, 1),
        ];
        Table::from_rows(
            vec![
                Column::new("Department", ColumnKind::Text),
                Column::new("Attrition", ColumnKind::Text),
                Column::new("Age", ColumnKind::Integer),
                Column::new("MonthlyIncome", ColumnKind::Integer),
                Column::new("JobLevel", ColumnKind::Integer),
            ],
            rows.iter()
                .map(|&(d, a, age, inc, lvl)| {
                    vec![
                        d.into(),
                        a.into(),
                        Value::Integer(age),
                        Value::Integer(inc),
                        Value::Integer(lvl),
                    ]
                })
                .collect(),
        )
    }

    fn none_of(t: &Table) -> Table {
        t.select(&[])
    }

    #[test]
    fn proportion_is_a_percentage() {
        let t = employees();
        assert_eq!(proportion(&t, "Attrition", &"Yes".into()).unwrap(), 40.0);
        assert_eq!(proportion(&t, "Attrition", &"Maybe".into()).unwrap(), 0.0);
    }

    #[test]
    fn empty_table_degrades_gracefully() {
        let empty = none_of(&employees());
        assert_eq!(proportion(&empty, "Attrition", &"Yes".into()).unwrap(), 0.0);
        assert_eq!(mean(&empty, "Age").unwrap(), Statistic::NoData);

        let grid = group_count(&empty, ["Department", "Attrition"]).unwrap();
        assert_eq!(grid.outer_keys.len(), 3);
        assert_eq!(grid.inner_keys.len(), 2);
        assert_eq!(grid.total(), 0);

        let corr = correlation(&empty, &["Age", "MonthlyIncome"]).unwrap();
        assert!(corr.values.iter().flatten().all(|c| *c == Coefficient::Undefined));

        let hist = distribution(&empty, "MonthlyIncome", 10).unwrap();
        assert_eq!(hist.range, None);
        assert!(hist.buckets.is_empty());
        assert!(grouped_summary(&empty, "JobLevel", "MonthlyIncome")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn mean_of_numeric_column() {
        let t = employees();
        assert_eq!(mean(&t, "Age").unwrap(), Statistic::Value(38.2));
        assert_eq!(
            mean(&t, "Department"),
            Err(SchemaError::NotNumeric("Department".into()))
        );
    }

    #[test]
    fn group_count_keeps_zero_cells_from_the_full_domain() {
        let t = employees();
        let sales = apply(&t, &FilterSpec::new().with_one_of("Department", ["Sales"])).unwrap();
        let grid = group_count(&sales, ["Department", "Attrition"]).unwrap();

        // HR and R&D are filtered out but still have rows in the grid.
        assert_eq!(
            grid.outer_keys,
            vec![Value::from("HR"), Value::from("R&D"), Value::from("Sales")]
        );
        assert_eq!(grid.get(&"HR".into(), &"Yes".into()), Some(0));
        assert_eq!(grid.get(&"R&D".into(), &"No".into()), Some(0));
        assert_eq!(grid.get(&"Sales".into(), &"Yes".into()), Some(1));
        assert_eq!(grid.total(), sales.len() as u64);
    }

    #[test]
    fn group_count_outer_totals_match_row_counts() {
        let t = employees();
        let grid = group_count(&t, ["Department", "Attrition"]).unwrap();
        assert_eq!(grid.outer_total(&"R&D".into()), Some(2));
        assert_eq!(grid.total(), 5);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let t = employees();
        let cols = numeric_columns(&t);
        assert_eq!(cols, vec!["Age", "MonthlyIncome", "JobLevel"]);
        let m = correlation(&t, &cols).unwrap();
        for i in 0..cols.len() {
            assert_eq!(m.values[i][i], Coefficient::Defined(1.0));
            for j in 0..cols.len() {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        let r = m.get("Age", "MonthlyIncome").unwrap().value().unwrap();
        assert!(r > 0.9 && r <= 1.0);
    }

    #[test]
    fn constant_column_correlation_is_undefined() {
        let t = employees();
        // JobLevel is 1 in both rows.
        let leavers = t.select(&[0, 4]);
        let m = correlation(&leavers, &["Age", "JobLevel"]).unwrap();
        assert_eq!(m.get("JobLevel", "JobLevel"), Some(Coefficient::Undefined));
        assert_eq!(m.get("Age", "JobLevel"), Some(Coefficient::Undefined));
        assert_eq!(m.get("Age", "Age"), Some(Coefficient::Defined(1.0)));
    }

    #[test]
    fn distribution_spans_observed_range() {
        let t = employees();
        let hist = distribution(&t, "MonthlyIncome", 4).unwrap();
        assert_eq!(hist.range, Some((2500.0, 9100.0)));
        assert_eq!(hist.buckets.len(), 4);
        assert_eq!(hist.buckets[0].low, 2500.0);
        assert_eq!(hist.buckets[3].high, 9100.0);
        // The maximum lands in the last bucket.
        assert_eq!(hist.buckets[3].count, 1);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn distribution_of_single_value_is_centred() {
        let t = employees().select(&[1]);
        let hist = distribution(&t, "Age", 3).unwrap();
        assert_eq!(hist.range, Some((44.5, 45.5)));
        assert_eq!(hist.total(), 1);
    }

    #[test]
    fn distribution_rejects_zero_buckets() {
        assert_eq!(
            distribution(&employees(), "Age", 0),
            Err(SchemaError::InvalidBucketCount)
        );
    }

    #[test]
    fn distribution_rejects_absurd_bucket_counts() {
        assert_eq!(
            distribution(&employees(), "Age", usize::MAX),
            Err(SchemaError::TooManyBuckets {
                requested: usize::MAX,
                max: MAX_BUCKETS
            })
        );
        assert!(distribution(&employees(), "Age", MAX_BUCKETS).is_ok());
    }

    #[test]
    fn non_finite_cells_are_left_out_of_statistics() {
        let t = Table::from_rows(
            vec![
                Column::new("Age", ColumnKind::Float),
                Column::new("MonthlyIncome", ColumnKind::Float),
            ],
            vec![
                vec![Value::Float(30.0), Value::Float(4000.0)],
                vec![Value::Float(f64::NAN), Value::Float(5000.0)],
                vec![Value::Float(45.0), Value::Float(f64::INFINITY)],
                vec![Value::Float(50.0), Value::Float(7000.0)],
            ],
        );

        assert_eq!(mean(&t, "MonthlyIncome").unwrap(), Statistic::Value(16000.0 / 3.0));

        let hist = distribution(&t, "MonthlyIncome", 3).unwrap();
        assert_eq!(hist.range, Some((4000.0, 7000.0)));
        assert_eq!(hist.total(), 3);
        assert!(hist.buckets.iter().all(|b| b.low.is_finite() && b.high.is_finite()));

        // Only rows 0 and 3 have both cells present.
        let corr = correlation(&t, &["Age", "MonthlyIncome"]).unwrap();
        let r = corr.get("Age", "MonthlyIncome").and_then(Coefficient::value).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(corr.get("Age", "Age"), Some(Coefficient::Defined(1.0)));
    }

    #[test]
    fn value_counts_are_dense_and_sorted() {
        let t = employees();
        let level_one = t.select(&[0, 4]);
        let counts = value_counts(&level_one, "JobLevel").unwrap();
        let keys: Vec<Value> = counts.counts.iter().map(|c| c.value.clone()).collect();
        assert_eq!(keys, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(counts.get(&Value::Integer(1)), Some(2));
        assert_eq!(counts.get(&Value::Integer(3)), Some(0));
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn grouped_summary_interpolates_quartiles() {
        let t = employees();
        let summary = grouped_summary(&t, "JobLevel", "MonthlyIncome").unwrap();
        assert_eq!(summary.len(), 3);

        let level_one = &summary[0];
        assert_eq!(level_one.key, Value::Integer(1));
        assert_eq!(level_one.count, 2);
        assert_eq!(level_one.min, 2500.0);
        assert_eq!(level_one.q1, 2875.0);
        assert_eq!(level_one.median, 3250.0);
        assert_eq!(level_one.q3, 3625.0);
        assert_eq!(level_one.max, 4000.0);
        assert_eq!(level_one.mean, 3250.0);
    }

    #[test]
    fn unknown_columns_are_schema_errors() {
        let t = employees();
        let missing = SchemaError::UnknownColumn("Team".into());
        assert_eq!(mean(&t, "Team"), Err(missing.clone()));
        assert_eq!(group_count(&t, ["Team", "Attrition"]), Err(missing.clone()));
        assert_eq!(correlation(&t, &["Age", "Team"]), Err(missing.clone()));
        assert_eq!(value_counts(&t, "Team"), Err(missing));
    }
}
