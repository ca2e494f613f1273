//! Main entry point for the zip2index CLI application.
//!
//! Reads one archive, local or remote, and writes its DER index to stdout.
//! On failure nothing is written to stdout; the error goes to stderr and the
//! process exits non-zero.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use zip2index::{Cli, HttpRangeReader, LocalFileReader, ReadAt, ZipIndex};

/// Application entry point.
///
/// Indexing is strictly sequential, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);
    debug!(?cli, "got arguments");

    let archive = cli.archive()?;

    let der = if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::new(archive.to_string()).await?);
        let der = index(reader.clone()).await?;
        info!(transferred = reader.transferred_bytes(), "remote archive indexed");
        der
    } else {
        let reader = LocalFileReader::new(Path::new(archive))
            .with_context(|| format!("cannot open {archive}"))?;
        index(Arc::new(reader)).await?
    };

    if cli.list {
        let table = render_table(&der)?;
        return write_output(cli.output.as_deref(), table.as_bytes()).await;
    }

    write_output(cli.output.as_deref(), &der).await
}

/// Send logs to stderr; stdout is reserved for the index itself.
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(cli: &Cli) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match cli.log_filter() {
            Some(filter) => filter.to_string(),
            None => return,
        },
    };

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("Failed to initialise logging, continuing with none\n{e}");
    }
}

async fn index<R: ReadAt>(reader: Arc<R>) -> Result<Vec<u8>> {
    let size = reader.size();
    Ok(zip2index::run(reader, size).await?)
}

/// Write the finished output in one go, to a file or stdout.
async fn write_output(path: Option<&str>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, data)
            .await
            .with_context(|| format!("cannot write {path}")),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(data).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

/// Decode an index and lay it out as a table.
fn render_table(der: &[u8]) -> Result<String> {
    use std::fmt::Write;

    let entries = ZipIndex::from_der(der)?;
    let mut out = String::new();

    writeln!(
        out,
        "{:>10}  {:>10}  {:>10}  {:>8}  {:<11}  {:>19}  Name",
        "Offset", "Size", "Length", "CRC-32", "Method", "Modified"
    )?;
    writeln!(out, "{}", "-".repeat(90))?;

    let mut total_compressed = 0i64;
    let mut total_original = 0i64;

    for entry in &entries {
        let modified = DateTime::<Utc>::from_timestamp_micros(entry.modified)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "?".to_string());

        writeln!(
            out,
            "{:>10}  {:>10}  {:>10}  {:08x}  {:<11}  {:>19}  {}",
            entry.offset,
            entry.compressed_size,
            entry.original_size,
            entry.checksum,
            entry.compression_method.name(),
            modified,
            entry.name
        )?;

        total_compressed = total_compressed.saturating_add(entry.compressed_size);
        total_original = total_original.saturating_add(entry.original_size);
    }

    writeln!(out, "{}", "-".repeat(90))?;
    writeln!(
        out,
        "{:>10}  {:>10}  {:>10}  {} entries",
        "", total_compressed, total_original, entries.len()
    )?;

    Ok(out)
}
