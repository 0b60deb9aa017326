use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{SnapshotOptions, FILTER_CATEGORICAL, FILTER_RANGES};
use crate::dashboard::{self, Snapshot, Variant};
use crate::data::filter::{matching_indices, observed_range, FilterSpec, Predicate};
use crate::data::model::{Table, Value};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// State of one dashboard, independent of rendering.
///
/// The dataset is shared read-only. Every filter edit recomputes the visible
/// rows and throws away the cached snapshot, so a snapshot always belongs to
/// the current filters.
pub struct DashboardState {
    dataset: Arc<Table>,
    variant: Variant,

    /// Per-column filter selections.
    filters: FilterSpec,

    /// Indices of rows passing the current filters (cached).
    visible_indices: Vec<usize>,

    options: SnapshotOptions,

    /// Aggregates for the current filters, built on first request.
    snapshot: Option<Snapshot>,
}

impl DashboardState {
    /// Start with every category selected and every range at its observed bounds.
    pub fn new(
        dataset: Arc<Table>,
        variant: Variant,
        options: SnapshotOptions,
    ) -> Result<Self, SchemaError> {
        let filters = FilterSpec::full_domain(&dataset, &FILTER_CATEGORICAL, &FILTER_RANGES)?;
        let visible_indices = (0..dataset.len()).collect();
        Ok(Self {
            dataset,
            variant,
            filters,
            visible_indices,
            options,
            snapshot: None,
        })
    }

    pub fn dataset(&self) -> &Arc<Table> {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Number of rows the dashboard currently shows.
    pub fn visible_rows(&self) -> usize {
        self.visible_indices.len()
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) -> Result<(), SchemaError> {
        self.visible_indices = match self.variant {
            Variant::Overview => (0..self.dataset.len()).collect(),
            Variant::Explorer => matching_indices(&self.dataset, &self.filters)?,
        };
        self.snapshot = None;
        log::debug!(
            "{} of {} rows visible",
            self.visible_indices.len(),
            self.dataset.len()
        );
        Ok(())
    }

    /// Aggregates for the current filters.
    pub fn snapshot(&mut self) -> Result<&Snapshot, SchemaError> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => {
                let visible = self.dataset.select(&self.visible_indices);
                dashboard::summarize(&visible, self.dataset.len(), self.variant, &self.options)?
            }
        };
        Ok(self.snapshot.insert(snapshot))
    }

    pub fn set_show_raw(&mut self, show_raw: bool) {
        if self.options.show_raw != show_raw {
            self.options.show_raw = show_raw;
            self.snapshot = None;
        }
    }

    // -- Categorical selections --

    /// Read user-typed text as a value of `column`'s kind.
    fn parse_value(&self, column: &str, raw: &str) -> Result<Value, SchemaError> {
        let kind = self.dataset.schema().column(column)?.kind;
        Ok(Value::parse_as(raw, kind))
    }

    /// Edit the selected set of `column`. A column without a set starts from
    /// its full domain.
    fn update_selection(
        &mut self,
        column: &str,
        edit: impl FnOnce(&mut BTreeSet<Value>),
    ) -> Result<(), SchemaError> {
        let domain = self.dataset.schema().domain(column)?;
        let mut selected = match self.filters.get(column) {
            Some(Predicate::OneOf(set)) => set.clone(),
            _ => domain.clone(),
        };
        edit(&mut selected);
        self.filters.set(column, Predicate::OneOf(selected));
        self.refilter()
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_value(&mut self, column: &str, raw: &str) -> Result<(), SchemaError> {
        let value = self.parse_value(column, raw)?;
        self.update_selection(column, |selected| {
            if !selected.remove(&value) {
                selected.insert(value);
            }
        })
    }

    /// Select exactly the given values.
    pub fn select_only<S: AsRef<str>>(
        &mut self,
        column: &str,
        raws: &[S],
    ) -> Result<(), SchemaError> {
        let values = raws
            .iter()
            .map(|raw| self.parse_value(column, raw.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        self.update_selection(column, |selected| *selected = values)
    }

    /// Remove one value from a column's selection.
    pub fn deselect(&mut self, column: &str, raw: &str) -> Result<(), SchemaError> {
        let value = self.parse_value(column, raw)?;
        self.update_selection(column, |selected| {
            selected.remove(&value);
        })
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) -> Result<(), SchemaError> {
        let domain = self.dataset.schema().domain(column)?.clone();
        self.update_selection(column, |selected| *selected = domain)
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) -> Result<(), SchemaError> {
        self.update_selection(column, BTreeSet::clear)
    }

    // -- Numeric ranges --

    /// Move one or both bounds of `column`'s range; `None` keeps the current
    /// bound. An explicit range no longer admits missing values.
    pub fn set_range(
        &mut self,
        column: &str,
        low: Option<f64>,
        high: Option<f64>,
    ) -> Result<(), SchemaError> {
        self.dataset.schema().numeric_position(column)?;
        let (current_low, current_high) = match self.filters.get(column) {
            Some(Predicate::Range { low, high, .. }) => (*low, *high),
            _ => observed_range(&self.dataset, column)?.unwrap_or((0.0, 0.0)),
        };
        self.filters.set(
            column,
            Predicate::Range {
                low: low.unwrap_or(current_low),
                high: high.unwrap_or(current_high),
                keep_missing: false,
            },
        );
        self.refilter()
    }
}
