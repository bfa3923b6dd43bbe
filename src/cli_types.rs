use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ReportFormat;

#[derive(Parser)]
#[command(name = "partmatch")]
#[command(about = "Match local part models against an online parts catalog", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings, errors and the report
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file (defaults to ./partmatch.toml)
    #[arg(short, long, global = true, env = "PARTMATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve model files to catalog IDs and known colors
    Resolve(ResolveArgs),
    /// Show what would be searched for a model, without network access
    Inspect(InspectArgs),
    /// Fetch the known colors of one catalog item
    Colors(ColorsArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Model files to resolve
    pub files: Vec<PathBuf>,

    /// File listing model paths, one per line
    #[arg(short, long)]
    pub list: Option<PathBuf>,

    /// Directories to scan for model files
    #[arg(short, long = "dir")]
    pub dirs: Vec<PathBuf>,

    /// Known catalog IDs (text or CSV, first column) used to narrow matches
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Report destination (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Pause between models, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Model file to inspect
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ColorsArgs {
    /// Catalog item number, e.g. 3626bpb0123
    pub item_no: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::parse_from([
            "partmatch",
            "--verbose",
            "resolve",
            "a/3626bp01.dat",
            "--list",
            "faces.txt",
            "--dir",
            "parts",
            "--format",
            "json",
            "--delay-ms",
            "0",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.files, vec![PathBuf::from("a/3626bp01.dat")]);
                assert_eq!(args.list, Some(PathBuf::from("faces.txt")));
                assert_eq!(args.dirs, vec![PathBuf::from("parts")]);
                assert_eq!(args.format, Some(ReportFormat::Json));
                assert_eq!(args.delay_ms, Some(0));
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_parse_quiet() {
        let cli = Cli::parse_from(["partmatch", "-q", "resolve", "3626bp01.dat"]);
        assert!(cli.quiet);
        assert!(Cli::try_parse_from(["partmatch", "-q", "-v", "config"]).is_err());
    }

    #[test]
    fn test_parse_colors() {
        let cli = Cli::parse_from(["partmatch", "colors", "3626bpb0123", "--no-color"]);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Colors(ColorsArgs { ref item_no }) if item_no == "3626bpb0123"));
    }
}
