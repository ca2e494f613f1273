use clap::{ArgAction, Parser};

use crate::error::{Error, Result};

/// Environment variable consulted when no archive is given on the command line.
pub const FILENAME_ENV: &str = "ENV_ZIP_FILENAME";

#[derive(Parser, Debug)]
#[command(name = "zip2index")]
#[command(version)]
#[command(about = "Write the central directory of a ZIP archive as a DER index", long_about = None)]
#[command(after_help = "Examples:\n  \
  zip2index data.zip > data.idx              index a local archive\n  \
  ENV_ZIP_FILENAME=data.zip zip2index        same, archive taken from the environment\n  \
  zip2index -l https://example.com/a.zip     show the index of a remote archive")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE", env = FILENAME_ENV)]
    pub file: Option<String>,

    /// Write the index to this file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<String>,

    /// Print the index as a table instead of DER
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Log more (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The archive locator, from the command line or the environment.
    pub fn archive(&self) -> Result<&str> {
        self.file.as_deref().filter(|f| !f.is_empty()).ok_or_else(|| {
            Error::Config(format!(
                "no archive given: pass FILE or set {FILENAME_ENV}"
            ))
        })
    }

    pub fn is_http_url(&self) -> bool {
        self.file
            .as_deref()
            .is_some_and(|f| f.starts_with("http://") || f.starts_with("https://"))
    }

    /// Log filter for the requested verbosity, `None` when logging stays off.
    pub fn log_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("warn"),
            2 => Some("info"),
            3 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
