use clap::Parser;

use crate::buffer::DEFAULT_BLOCK_SIZE;
use crate::io::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "memzip")]
#[command(version)]
#[command(about = "Look up entries of a zip/apk archive held in memory", long_about = None)]
#[command(after_help = "Examples:\n  \
  memzip app.apk -l              list entries in stream order\n  \
  memzip app.apk -c -o cert.rsa  save the signing certificate entry\n  \
  cat app.apk | memzip - -e AndroidManifest.xml > manifest.bin")]
pub struct Cli {
    /// Archive path, or '-' for standard input
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List entries (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely and log more
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract the first signing-certificate entry (*.RSA, *.DSA)
    #[arg(short = 'c', long = "cert")]
    pub certificate: bool,

    /// Extract the entry with exactly this path
    #[arg(short = 'e', long = "entry", value_name = "PATH")]
    pub entry: Option<String>,

    /// Write extracted data to this file instead of standard output
    #[arg(short = 'o', value_name = "OUT")]
    pub output: Option<String>,

    /// Buffer block size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Read chunk size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    pub fn is_stdin(&self) -> bool {
        self.file == "-"
    }

    pub fn is_list(&self) -> bool {
        self.list || (self.verbose && !self.certificate && self.entry.is_none())
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_lookup() {
        let cli = Cli::parse_from(["memzip", "app.apk", "-e", "classes.dex", "-o", "out.dex"]);
        assert_eq!(cli.entry.as_deref(), Some("classes.dex"));
        assert_eq!(cli.output.as_deref(), Some("out.dex"));
        assert!(!cli.is_list());
        assert_eq!(cli.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn verbose_alone_lists() {
        let cli = Cli::parse_from(["memzip", "-", "-v"]);
        assert!(cli.is_stdin());
        assert!(cli.is_list());
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn buffer_settings_are_configurable() {
        let cli = Cli::parse_from([
            "memzip",
            "a.zip",
            "-c",
            "--block-size",
            "4096",
            "--chunk-size",
            "512",
        ]);
        assert!(cli.certificate);
        assert_eq!(cli.block_size, 4096);
        assert_eq!(cli.chunk_size, 512);
    }
}
