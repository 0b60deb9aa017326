use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use attrition_lens::config::{
    DashboardConfig, SnapshotOptions, DATASET_ENV_VAR, DEFAULT_DATASET_PATH,
    DEFAULT_INCOME_BUCKETS,
};
use attrition_lens::dashboard::Variant;
use attrition_lens::data::columns::{AGE, DEPARTMENT, JOB_ROLE, MONTHLY_INCOME, OVERTIME};
use attrition_lens::report::OutputFormat;
use attrition_lens::state::DashboardState;
use attrition_lens::SchemaError;

#[derive(Debug, Parser)]
#[command(
    name = "attrition-lens",
    version,
    about = "Descriptive statistics for an employee attrition dataset"
)]
pub struct Cli {
    /// Dataset to load (.csv, .tsv, .json or .parquet)
    #[arg(long, global = true, env = DATASET_ENV_VAR, default_value = DEFAULT_DATASET_PATH)]
    pub data: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include the visible rows in the output
    #[arg(long, global = true)]
    pub show_raw: bool,

    /// Buckets in the monthly income histogram (1 to 10000)
    #[arg(long, global = true, default_value_t = DEFAULT_INCOME_BUCKETS)]
    pub bins: usize,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// No log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Statistics over the whole dataset
    Overview,
    /// Statistics over the rows matching the given filters
    Explore(ExploreArgs),
}

#[derive(Debug, Default, Args)]
pub struct ExploreArgs {
    /// Keep only these departments (repeatable)
    #[arg(long = "department", value_name = "NAME")]
    pub departments: Vec<String>,

    /// Drop a department from the selection (repeatable)
    #[arg(long = "exclude-department", value_name = "NAME")]
    pub exclude_departments: Vec<String>,

    /// Keep only these job roles (repeatable)
    #[arg(long = "job-role", value_name = "ROLE")]
    pub job_roles: Vec<String>,

    /// Drop a job role from the selection (repeatable)
    #[arg(long = "exclude-job-role", value_name = "ROLE")]
    pub exclude_job_roles: Vec<String>,

    /// Keep only these overtime values (repeatable)
    #[arg(long = "overtime", value_name = "YES|NO")]
    pub overtime: Vec<String>,

    /// Drop an overtime value from the selection (repeatable)
    #[arg(long = "exclude-overtime", value_name = "YES|NO")]
    pub exclude_overtime: Vec<String>,

    #[arg(long)]
    pub age_min: Option<f64>,

    #[arg(long)]
    pub age_max: Option<f64>,

    #[arg(long)]
    pub income_min: Option<f64>,

    #[arg(long)]
    pub income_max: Option<f64>,
}

impl Cli {
    pub fn variant(&self) -> Variant {
        match self.command {
            Command::Overview => Variant::Overview,
            Command::Explore(_) => Variant::Explorer,
        }
    }

    pub fn config(&self) -> DashboardConfig {
        DashboardConfig {
            dataset_path: self.data.clone(),
            snapshot: SnapshotOptions {
                income_buckets: self.bins,
                show_raw: self.show_raw,
            },
        }
    }
}

impl ExploreArgs {
    /// Turn the flags into filter edits on `state`.
    pub fn apply_to(&self, state: &mut DashboardState) -> Result<(), SchemaError> {
        let selections = [
            (DEPARTMENT, &self.departments, &self.exclude_departments),
            (JOB_ROLE, &self.job_roles, &self.exclude_job_roles),
            (OVERTIME, &self.overtime, &self.exclude_overtime),
        ];
        for (column, only, excluded) in selections {
            if !only.is_empty() {
                state.select_only(column, only)?;
            }
            for value in excluded {
                state.deselect(column, value)?;
            }
        }

        if self.age_min.is_some() || self.age_max.is_some() {
            state.set_range(AGE, self.age_min, self.age_max)?;
        }
        if self.income_min.is_some() || self.income_max.is_some() {
            state.set_range(MONTHLY_INCOME, self.income_min, self.income_max)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_flags_parse() {
        let cli = Cli::try_parse_from([
            "attrition-lens",
            "--format",
            "json",
            "explore",
            "--department",
            "Sales",
            "--department",
            "Human Resources",
            "--exclude-overtime",
            "Yes",
            "--age-min",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.variant(), Variant::Explorer);
        let Command::Explore(args) = &cli.command else {
            panic!("expected explore");
        };
        assert_eq!(args.departments, vec!["Sales", "Human Resources"]);
        assert_eq!(args.exclude_overtime, vec!["Yes"]);
        assert_eq!(args.age_min, Some(30.0));
        assert_eq!(args.age_max, None);
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["attrition-lens", "overview", "--bins", "10", "--show-raw"])
            .unwrap();
        let config = cli.config();
        assert_eq!(config.snapshot.income_buckets, 10);
        assert!(config.snapshot.show_raw);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["attrition-lens", "-q", "-v", "overview"]).is_err());
    }
}
