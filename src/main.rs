/*!
 * Encrypted ZIP password recovery CLI
 *
 * Bruteforces a fixed-length password over a character set against a
 * password-protected ZIP archive, using every core but one.
 * - Saves the password to a file on success
 * - Optionally extracts the archive with it
 * - Ctrl-C stops all workers cleanly
 */

mod cli;
mod workers;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use bruteforce_zip::report::format_number;
use bruteforce_zip::{extract_all, ArchiveBruteForcer, RunResult, RunSummary};

use cli::Args;
use workers::CrackParams;

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("bruteforce_zip=debug,warn")
    } else {
        EnvFilter::new("bruteforce_zip=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_statistics(result: &RunResult) {
    let stats = result.stats();

    println!("\n📊 Performance Statistics:");
    println!("   Total attempts: {}", format_number(stats.attempts));
    println!("   Time elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    println!("   Average rate: {:.0} passwords/second", stats.rate());
    if stats.failed_partitions > 0 {
        println!(
            "   Failed prefix jobs: {} of {}",
            stats.failed_partitions, stats.partitions
        );
    }
    if matches!(result, RunResult::Found { .. }) {
        println!("   (attempt count may miss work from workers stopped early)");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = args.to_config().context("Invalid configuration")?;

    if !args.json {
        println!("🚀 Starting offline ZIP password crack");
        println!("📦 Archive: {}", args.archive.display());
        println!("🔤 Charset: {}", config.charset);
        println!("🔢 Length: {}", config.length);
        println!(
            "🕐 Start time: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
    }

    let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();
    let forcer = ArchiveBruteForcer::new(config.clone())?.with_progress(progress_tx);

    let state = forcer.state();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            state.cancel();
        }
    });

    let renderer = tokio::spawn(workers::render_progress(progress_rx, args.json));

    let params = CrackParams {
        archive: args.archive.clone(),
        output: config.output.clone(),
    };
    let result = workers::crack_archive(forcer, params).await;
    let _ = renderer.await;
    let result = result?;

    let mut summary = RunSummary::from(&result);

    let code = match &result {
        RunResult::Found {
            password,
            persist_warning,
            ..
        } => {
            if !args.json {
                println!("\n{}", format!("✅ Password found: {}", password).green().bold());
                match persist_warning {
                    Some(warning) => println!("{}", format!("❌ {}", warning).red()),
                    None => println!("💾 Saved to {}", config.output.display()),
                }
            }

            if let Some(dest) = &args.extract {
                match extract_all(&args.archive, password, dest) {
                    Ok(files) => {
                        if !args.json {
                            println!("📂 Extracted {} file(s) to {}", files.len(), dest.display());
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Extraction failed");
                        if !args.json {
                            println!("{}", format!("⚠️  Extraction failed: {}", e).yellow());
                        }
                        summary.warning.get_or_insert_with(|| e.to_string());
                    }
                }
            }

            ExitCode::SUCCESS
        }
        RunResult::Exhausted { .. } => {
            if !args.json {
                println!("\n{}", "❌ Password not found in search space".red());
            }
            ExitCode::from(1)
        }
        RunResult::Stopped { .. } => {
            if !args.json {
                println!("\n{}", "⏹  Stopped by user".yellow());
            }
            ExitCode::from(130)
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_statistics(&result);
    }

    Ok(code)
}
