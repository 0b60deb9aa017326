use std::path::PathBuf;

use crate::data::columns::{AGE, DEPARTMENT, JOB_ROLE, MONTHLY_INCOME, OVERTIME};

/// Dataset read when no path is given.
pub const DEFAULT_DATASET_PATH: &str = "EA.csv";

/// Environment variable overriding [`DEFAULT_DATASET_PATH`].
pub const DATASET_ENV_VAR: &str = "ATTRITION_LENS_DATA";

/// Buckets in the monthly income histogram.
pub const DEFAULT_INCOME_BUCKETS: usize = 30;

/// Attrition value counted as "left the company".
pub const ATTRITION_YES: &str = "Yes";

/// Columns the explorer filters by set membership.
pub const FILTER_CATEGORICAL: [&str; 3] = [DEPARTMENT, JOB_ROLE, OVERTIME];

/// Columns the explorer filters by inclusive range.
pub const FILTER_RANGES: [&str; 2] = [AGE, MONTHLY_INCOME];

/// Knobs that shape a dashboard snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub income_buckets: usize,
    /// Include the visible rows in the snapshot.
    pub show_raw: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            income_buckets: DEFAULT_INCOME_BUCKETS,
            show_raw: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    pub snapshot: SnapshotOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            snapshot: SnapshotOptions::default(),
        }
    }
}
