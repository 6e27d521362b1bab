//! `assetsync plan`: show what a sync would do without changing anything.

use assetsync::{ConfigFile, SyncEngine};

use super::common::{format_size, SyncArgs};
use crate::error::CliError;

pub fn run(args: &SyncArgs, file: &ConfigFile) -> Result<(), CliError> {
    let config = args.resolve(file)?;
    let engine = SyncEngine::from_config(&config)?;
    let plan = engine.plan(config.package.as_deref(), &config.target_dir)?;

    if plan.is_noop() {
        println!(
            "{} is up to date ({}).",
            config.target_dir.display(),
            format_size(plan.total_size)
        );
        return Ok(());
    }

    if !plan.diff.tasks.is_empty() {
        println!("Download ({}):", format_size(plan.fetch_bytes()));
        for task in &plan.diff.tasks {
            println!("  + {} ({})", task.relative_path, format_size(task.expected_size));
        }
    }

    if !plan.stale.is_empty() {
        println!("Remove:");
        for path in &plan.stale {
            println!("  - {}", path);
        }
    }

    println!();
    println!(
        "{} to download, {} already present, {} total",
        format_size(plan.fetch_bytes()),
        format_size(plan.diff.pre_skipped_bytes),
        format_size(plan.total_size)
    );

    Ok(())
}
