//! `assetsync sync`: bring the target directory in line with the manifest.

use assetsync::{ConfigFile, SyncEngine};

use super::common::{format_size, SyncArgs};
use crate::error::CliError;
use crate::progress::ConsoleProgress;

pub fn run(args: &SyncArgs, file: &ConfigFile) -> Result<(), CliError> {
    let config = args.resolve(file)?;
    let engine = SyncEngine::from_config(&config)?;

    let token = engine.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Cancelling, waiting for downloads in progress to finish...");
        token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    println!("Endpoint:    {}", config.endpoint);
    if let Some(package) = &config.package {
        println!("Package:     {}", package);
    }
    println!("Target:      {}", config.target_dir.display());
    println!("Concurrency: {}", config.concurrency);
    println!();

    let progress = ConsoleProgress::new();
    let result = engine.install(
        config.package.as_deref(),
        &config.target_dir,
        config.concurrency,
        &progress,
    )?;

    println!();
    println!(
        "Downloaded {} file(s), {}",
        result.files_downloaded.len(),
        format_size(result.bytes_downloaded)
    );
    println!(
        "Up to date: {} entr{} ({})",
        result.entries_skipped,
        if result.entries_skipped == 1 { "y" } else { "ies" },
        format_size(result.bytes_pre_skipped)
    );
    if !result.files_removed.is_empty() {
        println!("Removed {} stale file(s)", result.files_removed.len());
    }

    if result.cancelled {
        return Err(CliError::Cancelled);
    }
    if result.has_failures() {
        println!();
        println!("Failed:");
        for failed in &result.files_failed {
            println!("  {}: {}", failed.path, failed.error);
        }
        for failed in &result.files_not_removed {
            println!("  {} (not removed): {}", failed.path, failed.error);
        }
        return Err(CliError::FilesFailed(result.failure_count()));
    }

    println!("Sync complete.");
    Ok(())
}
