mod cli;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use attrition_lens::data::loader::load_file;
use attrition_lens::logging::init_logger;
use attrition_lens::report::write_report;
use attrition_lens::state::DashboardState;
use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    let config = cli.config();
    let dataset = load_file(&config.dataset_path)
        .with_context(|| format!("loading dataset {}", config.dataset_path.display()))?;

    let mut state = DashboardState::new(Arc::new(dataset), cli.variant(), config.snapshot)
        .context("preparing dashboard filters")?;
    if let Command::Explore(args) = &cli.command {
        args.apply_to(&mut state).context("applying filters")?;
    }
    log::info!("{} rows after filter", state.visible_rows());

    let snapshot = state.snapshot().context("computing dashboard")?;

    let mut out = io::stdout().lock();
    write_report(&mut out, snapshot, cli.format).context("writing report")?;
    out.flush().context("writing report")?;
    Ok(())
}
