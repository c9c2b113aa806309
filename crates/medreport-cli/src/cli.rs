//! CLI argument definitions for the report generator.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "medreport",
    version,
    about = "Generate narrative stroke-care reports from registry exports",
    long_about = "Generate narrative stroke-care reports from registry CSV exports.\n\n\
                  Report wording is driven by per-language rule files \
                  (<locale-dir>/<language>.json)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Prefix pretty and compact log lines with a timestamp.
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Allow patient values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render reports for the rows of a registry export.
    Generate(GenerateArgs),

    /// List the subject ids of a registry export.
    List(ListArgs),

    /// Load and validate a rule file.
    Check(CheckArgs),
}

/// Where rule files are looked up.
#[derive(Parser)]
pub struct RuleArgs {
    /// Report language; falls back to en_US when no rule file exists.
    #[arg(long = "language", default_value = "en_US")]
    pub language: String,

    /// Directory with <language>.json rule files (default: $MEDREPORT_LOCALE_DIR, else ./locale
    /// if present, else the locale/ directory bundled with the source tree).
    #[arg(long = "locale-dir", value_name = "DIR")]
    pub locale_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct GenerateArgs {
    /// Registry CSV export.
    #[arg(long = "csv", value_name = "FILE")]
    pub csv: PathBuf,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Only render the N-th row (1-based).
    #[arg(long = "subject-id", value_name = "N")]
    pub subject_id: Option<usize>,

    /// Write reports to a file instead of stdout.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write recorded render issues as JSON.
    #[arg(long = "audit", value_name = "FILE")]
    pub audit: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Registry CSV export.
    #[arg(long = "csv", value_name = "FILE")]
    pub csv: PathBuf,
}

#[derive(Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub rules: RuleArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
