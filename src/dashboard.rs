use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::{SnapshotOptions, ATTRITION_YES};
use crate::data::aggregate::{
    self, CorrelationMatrix, GroupCounts, GroupSummary, Histogram, Statistic, ValueCounts,
};
use crate::data::columns::{
    AGE, ATTRITION, DEPARTMENT, JOB_LEVEL, JOB_ROLE, MONTHLY_INCOME, OVERTIME,
    WORK_LIFE_BALANCE, YEARS_AT_COMPANY,
};
use crate::data::filter::{self, FilterSpec};
use crate::data::model::{Table, Value};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Which dashboard is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Statistics over the whole dataset; filters are ignored.
    Overview,
    /// Statistics over the rows passing the current filters.
    Explorer,
}

/// Logical chart names, the keys the presentation layer looks results up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartName {
    DepartmentAttrition,
    RoleAttrition,
    IncomeHistogram,
    Correlation,
    IncomeByLevel,
    OvertimeAttrition,
    WorkLifeBalance,
    YearsAttrition,
}

impl ChartName {
    pub const ALL: [ChartName; 8] = [
        ChartName::DepartmentAttrition,
        ChartName::RoleAttrition,
        ChartName::IncomeHistogram,
        ChartName::Correlation,
        ChartName::IncomeByLevel,
        ChartName::OvertimeAttrition,
        ChartName::WorkLifeBalance,
        ChartName::YearsAttrition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartName::DepartmentAttrition => "department-attrition",
            ChartName::RoleAttrition => "role-attrition",
            ChartName::IncomeHistogram => "income-histogram",
            ChartName::Correlation => "correlation",
            ChartName::IncomeByLevel => "income-by-level",
            ChartName::OvertimeAttrition => "overtime-attrition",
            ChartName::WorkLifeBalance => "work-life-balance",
            ChartName::YearsAttrition => "years-attrition",
        }
    }

    /// Human-readable heading.
    pub fn title(self) -> &'static str {
        match self {
            ChartName::DepartmentAttrition => "Attrition by Department",
            ChartName::RoleAttrition => "Attrition by Job Role",
            ChartName::IncomeHistogram => "Monthly Income Distribution",
            ChartName::Correlation => "Correlation Heatmap",
            ChartName::IncomeByLevel => "Monthly Income by Job Level",
            ChartName::OvertimeAttrition => "OverTime vs Attrition",
            ChartName::WorkLifeBalance => "Work-Life Balance Counts",
            ChartName::YearsAttrition => "Years at Company vs Attrition",
        }
    }
}

impl fmt::Display for ChartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregation result, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Chart {
    Counts(GroupCounts),
    Histogram(Histogram),
    Correlation(CorrelationMatrix),
    Summary(Vec<GroupSummary>),
    ValueCounts(ValueCounts),
}

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Percentage of visible rows with `Attrition == Yes`.
    pub attrition_rate: f64,
    pub mean_age: Statistic,
    pub mean_income: Statistic,
    pub visible_rows: usize,
    pub total_rows: usize,
}

/// Everything the presentation layer needs for one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub variant: Variant,
    pub metrics: Metrics,
    pub charts: BTreeMap<ChartName, Chart>,
    /// Visible rows, present only when the raw table is switched on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Table>,
}

impl Snapshot {
    pub fn chart(&self, name: ChartName) -> Option<&Chart> {
        self.charts.get(&name)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline for one interaction: filter (explorer only), then
/// aggregate.
pub fn build_snapshot(
    dataset: &Table,
    variant: Variant,
    filters: &FilterSpec,
    options: &SnapshotOptions,
) -> Result<Snapshot, SchemaError> {
    match variant {
        Variant::Overview => summarize(dataset, dataset.len(), variant, options),
        Variant::Explorer => {
            let visible = filter::apply(dataset, filters)?;
            summarize(&visible, dataset.len(), variant, options)
        }
    }
}

/// Aggregate an already-filtered table.
pub fn summarize(
    visible: &Table,
    total_rows: usize,
    variant: Variant,
    options: &SnapshotOptions,
) -> Result<Snapshot, SchemaError> {
    log::debug!(
        "Summarising {} of {} rows ({variant:?})",
        visible.len(),
        total_rows
    );

    let metrics = Metrics {
        attrition_rate: aggregate::proportion(visible, ATTRITION, &Value::from(ATTRITION_YES))?,
        mean_age: aggregate::mean(visible, AGE)?,
        mean_income: aggregate::mean(visible, MONTHLY_INCOME)?,
        visible_rows: visible.len(),
        total_rows,
    };

    let attrition_by = |column: &str| -> Result<Chart, SchemaError> {
        Ok(Chart::Counts(aggregate::group_count(visible, [column, ATTRITION])?))
    };

    let mut charts = BTreeMap::new();
    charts.insert(ChartName::DepartmentAttrition, attrition_by(DEPARTMENT)?);
    charts.insert(ChartName::RoleAttrition, attrition_by(JOB_ROLE)?);
    charts.insert(
        ChartName::IncomeHistogram,
        Chart::Histogram(aggregate::distribution(
            visible,
            MONTHLY_INCOME,
            options.income_buckets,
        )?),
    );
    charts.insert(
        ChartName::Correlation,
        Chart::Correlation(aggregate::correlation(
            visible,
            &aggregate::numeric_columns(visible),
        )?),
    );
    charts.insert(
        ChartName::IncomeByLevel,
        Chart::Summary(aggregate::grouped_summary(
            visible,
            JOB_LEVEL,
            MONTHLY_INCOME,
        )?),
    );
    charts.insert(ChartName::OvertimeAttrition, attrition_by(OVERTIME)?);
    charts.insert(
        ChartName::WorkLifeBalance,
        Chart::ValueCounts(aggregate::value_counts(visible, WORK_LIFE_BALANCE)?),
    );
    charts.insert(ChartName::YearsAttrition, attrition_by(YEARS_AT_COMPANY)?);

    Ok(Snapshot {
        variant,
        metrics,
        charts,
        rows: options.show_raw.then(|| visible.clone()),
    })
}
