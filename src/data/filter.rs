use std::collections::{BTreeMap, BTreeSet};

use super::model::{Table, Value};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Constraint on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Keep rows whose value is in the set. An empty set keeps nothing.
    OneOf(BTreeSet<Value>),
    /// Keep rows with `low <= value <= high`. Missing cells pass only when
    /// `keep_missing` is set.
    Range {
        low: f64,
        high: f64,
        keep_missing: bool,
    },
}

impl Predicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::OneOf(selected) => selected.contains(value),
            Predicate::Range {
                low,
                high,
                keep_missing,
            } => match value.as_f64() {
                Some(v) => *low <= v && v <= *high,
                None => value.is_null() && *keep_missing,
            },
        }
    }
}

/// Per-column predicates, combined with AND.
/// A column without a predicate is unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_one_of<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.set(
            column,
            Predicate::OneOf(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn with_range(mut self, column: &str, low: f64, high: f64) -> Self {
        self.set(
            column,
            Predicate::Range {
                low,
                high,
                keep_missing: false,
            },
        );
        self
    }

    pub fn set(&mut self, column: &str, predicate: Predicate) {
        self.predicates.insert(column.to_string(), predicate);
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.predicates.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Predicate> {
        self.predicates.get_mut(column)
    }

    pub fn predicates(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.predicates.iter().map(|(c, p)| (c.as_str(), p))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The unconstrained spec for the given columns: every categorical column
    /// selects its whole domain, every numeric column spans its observed range.
    /// Applying it to `table` returns `table` unchanged.
    pub fn full_domain(
        table: &Table,
        categorical: &[&str],
        numeric: &[&str],
    ) -> Result<Self, SchemaError> {
        let mut spec = FilterSpec::new();
        for &col in categorical {
            spec.set(col, Predicate::OneOf(table.schema().domain(col)?.clone()));
        }
        for &col in numeric {
            let keep_missing = table.schema().domain(col)?.contains(&Value::Null);
            let (low, high) = observed_range(table, col)?.unwrap_or((0.0, 0.0));
            spec.set(
                col,
                Predicate::Range {
                    low,
                    high,
                    keep_missing,
                },
            );
        }
        Ok(spec)
    }
}

/// Smallest and largest numeric value of `column`, `None` if it has none.
pub fn observed_range(table: &Table, column: &str) -> Result<Option<(f64, f64)>, SchemaError> {
    let range = table
        .numeric_values(column)?
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
    Ok(range)
}

// ---------------------------------------------------------------------------
// Applying a spec
// ---------------------------------------------------------------------------

/// Return indices of rows that pass every predicate, in table order.
///
/// A row passes a column predicate when:
/// * The set for that column is empty → nothing selected → fails
/// * The set covers the column's whole domain → passes (no constraint)
/// * Otherwise the value must be in the set / inside the inclusive range
pub fn matching_indices(table: &Table, spec: &FilterSpec) -> Result<Vec<usize>, SchemaError> {
    let schema = table.schema();
    let mut active: Vec<(usize, &Predicate)> = Vec::new();

    for (col, predicate) in spec.predicates() {
        let pos = match predicate {
            Predicate::OneOf(selected) => {
                let pos = schema.position(col)?;
                let domain = schema.domain(col)?;
                // Everything selected, no filtering needed
                if !selected.is_empty() && selected.is_superset(domain) {
                    continue;
                }
                pos
            }
            Predicate::Range { .. } => schema.numeric_position(col)?,
        };
        active.push((pos, predicate));
    }

    log::debug!(
        "Filtering {} rows with {} active predicate(s)",
        table.len(),
        active.len()
    );

    Ok(table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| active.iter().all(|(pos, p)| p.matches(record.get(*pos))))
        .map(|(i, _)| i)
        .collect())
}

/// Stable filter: the rows of `table` satisfying `spec`.
pub fn apply(table: &Table, spec: &FilterSpec) -> Result<Table, SchemaError> {
    let indices = matching_indices(table, spec)?;
    Ok(table.select(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnKind};

    fn employees() -> Table {
        Table::from_rows(
            vec![
                Column::new("Department", ColumnKind::Text),
                Column::new("Attrition", ColumnKind::Text),
                Column::new("Age", ColumnKind::Integer),
                Column::new("MonthlyIncome", ColumnKind::Integer),
            ],
            vec![
                vec!["Sales".into(), "Yes".into(), Value::Integer(30), Value::Integer(4000)],
                vec!["Sales".into(), "No".into(), Value::Integer(45), Value::Integer(6000)],
                vec!["R&D".into(), "No".into(), Value::Integer(52), Value::Integer(7100)],
                vec!["HR".into(), "Yes".into(), Value::Null, Value::Integer(2500)],
            ],
        )
    }

    fn ages(t: &Table) -> Vec<Value> {
        t.column_values("Age").unwrap().cloned().collect()
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let t = employees();
        assert_eq!(apply(&t, &FilterSpec::new()).unwrap(), t);
    }

    #[test]
    fn range_is_inclusive_at_both_ends() {
        let t = employees();
        let spec = FilterSpec::new().with_range("Age", 30.0, 45.0);
        assert_eq!(
            ages(&apply(&t, &spec).unwrap()),
            vec![Value::Integer(30), Value::Integer(45)]
        );
    }

    #[test]
    fn range_drops_missing_values_unless_asked() {
        let t = employees();
        let mut spec = FilterSpec::new().with_range("Age", 0.0, 100.0);
        assert_eq!(apply(&t, &spec).unwrap().len(), 3);

        if let Some(Predicate::Range { keep_missing, .. }) = spec.get_mut("Age") {
            *keep_missing = true;
        }
        assert_eq!(apply(&t, &spec).unwrap().len(), 4);
    }

    #[test]
    fn empty_selection_yields_empty_table() {
        let t = employees();
        let spec = FilterSpec::new().with_one_of("Department", Vec::<Value>::new());
        let out = apply(&t, &spec).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.schema(), t.schema());
    }

    #[test]
    fn predicates_combine_with_and() {
        let t = employees();
        let spec = FilterSpec::new()
            .with_one_of("Department", ["Sales", "R&D"])
            .with_one_of("Attrition", ["No"])
            .with_range("MonthlyIncome", 6500.0, 8000.0);
        assert_eq!(matching_indices(&t, &spec).unwrap(), vec![2]);
    }

    #[test]
    fn full_domain_spec_is_identity() {
        let t = employees();
        let spec = FilterSpec::full_domain(
            &t,
            &["Department", "Attrition"],
            &["Age", "MonthlyIncome"],
        )
        .unwrap();
        assert_eq!(
            spec.get("MonthlyIncome"),
            Some(&Predicate::Range {
                low: 2500.0,
                high: 7100.0,
                keep_missing: false
            })
        );
        assert_eq!(apply(&t, &spec).unwrap(), t);
    }

    #[test]
    fn full_domain_spec_keeps_rows_with_nan_cells() {
        let t = Table::from_rows(
            vec![
                Column::new("Department", ColumnKind::Text),
                Column::new("MonthlyIncome", ColumnKind::Float),
            ],
            vec![
                vec!["Sales".into(), Value::Float(4000.0)],
                vec!["Sales".into(), Value::Float(f64::NAN)],
                vec!["HR".into(), Value::Float(f64::INFINITY)],
                vec!["HR".into(), Value::Float(5000.5)],
            ],
        );
        let spec = FilterSpec::full_domain(&t, &["Department"], &["MonthlyIncome"]).unwrap();
        assert_eq!(
            spec.get("MonthlyIncome"),
            Some(&Predicate::Range {
                low: 4000.0,
                high: 5000.5,
                keep_missing: true
            })
        );
        assert_eq!(apply(&t, &spec).unwrap(), t);
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let t = employees();
        let spec = FilterSpec::new().with_range("Age", 50.0, 40.0);
        assert!(apply(&t, &spec).unwrap().is_empty());
    }

    #[test]
    fn unknown_column_is_a_schema_error() {
        let t = employees();
        let spec = FilterSpec::new().with_one_of("Team", ["Blue"]);
        assert_eq!(
            apply(&t, &spec),
            Err(SchemaError::UnknownColumn("Team".into()))
        );
    }

    #[test]
    fn range_on_text_column_is_a_schema_error() {
        let t = employees();
        let spec = FilterSpec::new().with_range("Department", 0.0, 1.0);
        assert_eq!(
            apply(&t, &spec),
            Err(SchemaError::NotNumeric("Department".into()))
        );
    }

    #[test]
    fn observed_range_skips_missing_cells() {
        let t = employees();
        assert_eq!(observed_range(&t, "Age").unwrap(), Some((30.0, 52.0)));
        let empty = t.select(&[]);
        assert_eq!(observed_range(&empty, "Age").unwrap(), None);
    }
}
