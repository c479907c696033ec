/*!
 * Background crack worker and progress rendering
 *
 * The search itself is CPU bound and runs on a blocking task; progress
 * events come back over an unbounded channel and drive the progress bar.
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use bruteforce_zip::report::format_number;
use bruteforce_zip::{
    ArchiveBruteForcer, CoordinatorPhase, CrackProgress, FilePasswordStore, RunResult,
    ZipOracleFactory,
};

/// Archive crack worker data
pub struct CrackParams {
    pub archive: PathBuf,
    pub output: PathBuf,
}

/// Run the crack on a blocking thread
pub async fn crack_archive(forcer: ArchiveBruteForcer, params: CrackParams) -> Result<RunResult> {
    tokio::task::spawn_blocking(move || crack_archive_blocking(forcer, params))
        .await
        .context("Crack task panicked")?
}

fn crack_archive_blocking(forcer: ArchiveBruteForcer, params: CrackParams) -> Result<RunResult> {
    let mut factory = ZipOracleFactory::new(&params.archive);
    let store = FilePasswordStore::new(&params.output);

    forcer
        .run(&mut factory, &store)
        .with_context(|| format!("Failed to crack {}", params.archive.display()))
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {eta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░-"),
    );
    pb
}

/// Consume progress events until the crack finishes
///
/// With `quiet` set nothing is drawn; events are still drained.
pub async fn render_progress(mut progress_rx: UnboundedReceiver<CrackProgress>, quiet: bool) {
    let mut pb: Option<ProgressBar> = None;

    while let Some(event) = progress_rx.recv().await {
        if quiet {
            continue;
        }

        match event {
            CrackProgress::Started {
                total,
                partitions,
                workers,
            } => {
                println!(
                    "Parallel search: {} workers, {} prefix jobs, {} candidates\n",
                    workers,
                    partitions,
                    format_number(total)
                );
                pb = Some(progress_bar(total));
            }
            CrackProgress::Progress { current, rate, .. } => {
                if let Some(pb) = &pb {
                    pb.set_position(current);
                    pb.set_message(format!("{:.0} pwd/s", rate));
                }
            }
            CrackProgress::WorkerError { partition, reason } => {
                let line = format!("⚠️  Worker error on prefix '{}': {}", partition, reason);
                match &pb {
                    Some(pb) => pb.println(line.yellow().to_string()),
                    None => eprintln!("{}", line.yellow()),
                }
            }
            CrackProgress::Found(_) => {
                if let Some(pb) = &pb {
                    pb.set_message("Password found, stopping workers");
                }
            }
            CrackProgress::Phase(CoordinatorPhase::Done) => {
                if let Some(pb) = pb.take() {
                    pb.finish_with_message("Done");
                }
            }
            CrackProgress::Phase(_) => {}
        }
    }

    if let Some(pb) = pb {
        pb.abandon();
    }
}
