//! Main entry point for the memzip CLI application.
//!
//! Reads an archive from a file or standard input into a chunked buffer and
//! answers one query against it: list entries, extract the signing
//! certificate entry, or extract an entry by path.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use memzip::{ArchiveSource, BufferOptions, Cli, ZipFileEntry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level().into()),
        )
        .with_writer(io::stderr)
        .init();

    let mut source = load(&cli)?;

    if !cli.quiet && !cli.is_list() {
        eprintln!(
            "Buffered {} in {} blocks",
            format_size(source.len() as u64),
            source.buffer().block_count()
        );
    }

    if cli.is_list() {
        let entries = source.entries().context("failed to read archive entries")?;
        print_entries(&entries, cli.verbose);
        return Ok(());
    }

    let (label, data) = if cli.certificate {
        let data = source
            .certificate_data()
            .context("failed to scan for a certificate entry")?;
        ("certificate entry".to_string(), data)
    } else if let Some(ref path) = cli.entry {
        let data = source
            .file_data(path)
            .with_context(|| format!("failed to scan for {}", path))?;
        (path.clone(), data)
    } else {
        bail!("nothing to do: pass -l, -c or -e PATH");
    };

    let Some(data) = data else {
        bail!("{} not found in {}", label, cli.file);
    };

    write_output(&data, cli.output.as_deref())
        .with_context(|| format!("failed to write {}", label))?;

    if !cli.quiet {
        eprintln!("Extracted {} ({})", label, format_size(data.len() as u64));
    }

    Ok(())
}

/// Read the archive named on the command line into memory.
fn load(cli: &Cli) -> Result<ArchiveSource> {
    let options = BufferOptions::new().block_size(cli.block_size);

    if cli.is_stdin() {
        let stdin = io::stdin().lock();
        ArchiveSource::from_reader_with(stdin, options, cli.chunk_size)
            .context("failed to read standard input")
    } else {
        let file = File::open(Path::new(&cli.file))
            .with_context(|| format!("cannot open {}", cli.file))?;
        ArchiveSource::from_reader_with(file, options, cli.chunk_size)
            .with_context(|| format!("failed to read {}", cli.file))
    }
}

/// Write extracted bytes to `output`, or to stdout when no path is given.
fn write_output(data: &[u8], output: Option<&str>) -> io::Result<()> {
    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(data)?;
            file.flush()
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()
        }
    }
}

/// List entries in stream order.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just entry names, one per line
/// - Verbose format (`-v`): Table with sizes, method and timestamps
fn print_entries(entries: &[ZipFileEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>6}  {:>10}  {:>5}  Name",
        "Length", "Size", "Method", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        let method = match entry.compression_method.as_u16() {
            0 => "Stored".to_string(),
            8 => "Defl".to_string(),
            other => format!("#{}", other),
        };

        println!(
            "{:>10}  {:>10}  {:>6}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            method,
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!("{:>10}  {:>44}  {} files", total_uncompressed, "", file_count);
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
