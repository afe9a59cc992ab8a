// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: A single workflow path plus flags for collection mode, verbosity and checking

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recognizer")]
#[command(about = "Run declarative JSON automation workflows")]
#[command(version)]
pub struct Args {
    #[arg(help = "Path to the workflow JSON file")]
    pub input: PathBuf,

    #[arg(
        short,
        long = "await-all",
        alias = "await_all",
        help = "Collect every result before printing instead of streaming"
    )]
    pub await_all: bool,

    #[arg(short, long, help = "Print each job result")]
    pub verbose: bool,

    #[arg(short, long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Resolve every job without executing anything")]
    pub check: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from(["recognizer", "flow.json", "-a", "-v", "--no-color"])
            .unwrap();
        assert_eq!(args.input, PathBuf::from("flow.json"));
        assert!(args.await_all);
        assert!(args.verbose);
        assert!(args.no_color);
        assert!(!args.check);
    }

    #[test]
    fn test_underscore_alias() {
        let args = Args::try_parse_from(["recognizer", "flow.json", "--await_all"]).unwrap();
        assert!(args.await_all);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["recognizer"]).is_err());
    }
}
