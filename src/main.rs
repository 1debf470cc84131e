use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use shastream::{Change, DigestEngine, HashController, SessionState, DEFAULT_CHUNK_SIZE};

/// Streaming SHA-256 file hasher with progress and cooperative
/// cancellation (Ctrl-C).
#[derive(Parser)]
#[command(name = "shastream", version)]
struct Args {
    /// File to hash
    path: PathBuf,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Display the hex digest in uppercase
    #[arg(long)]
    uppercase: bool,

    /// Emit the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let engine = DigestEngine::with_chunk_size(args.chunk_size)?;
    tracing::debug!(chunk_size = engine.chunk_size(), "digest engine ready");
    let mut controller = HashController::with_engine(engine);
    controller.set_uppercase(args.uppercase);
    let changes = controller.subscribe();

    if !controller.start(args.path.display().to_string()) {
        bail!("not an existing file: {}", args.path.display());
    }

    // Ctrl-C requests cooperative cancellation through the session's
    // own handle; the digest acknowledges at the next chunk boundary.
    if let Some(cancel) = controller.cancel_handle() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let total = controller.progress().total;
    let bar = if total > 0 {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_message(format!("Hashing: {}", args.path.display()));

    while controller.state() != SessionState::Idle {
        if !controller.process_next().await {
            break;
        }
        for change in changes.try_iter() {
            if let Change::Progress(progress) = change {
                bar.set_position(progress.processed);
            }
        }
    }
    bar.finish_and_clear();

    if let Some(message) = controller.error_message() {
        bail!("{message}");
    }
    let Some(result) = controller.last_result() else {
        eprintln!("cancelled");
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("SHA-256  {}", controller.hex_output());
    println!("base64   {}", controller.base64_output());
    let secs = result.elapsed.as_secs_f64();
    let throughput = if secs > 0.0 {
        format!(", {}/s", format_size((result.bytes as f64 / secs) as u64, BINARY))
    } else {
        String::new()
    };
    println!(
        "{} ({} in {:.2?}{})",
        result.path.display(),
        format_size(result.bytes, BINARY),
        result.elapsed,
        throughput
    );

    Ok(())
}
