//! schedcheck CLI -- analyze, simulate, generate and format schedules.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "schedcheck",
    about = "Serializability, two-phase locking and lock-manager analysis for transaction schedules"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check conflict serializability, 2PL compliance and recoverability
    Analyze(AnalyzeArgs),
    /// Step a schedule through a strict-2PL lock manager
    Simulate(SimulateArgs),
    /// Generate random schedules
    Generate(GenerateArgs),
    /// Analyze generated schedule JSON files
    Verify(VerifyArgs),
    /// Format schedule (.sched) files
    Fmt(FmtArgs),
    /// Print the JSON Schema for the analysis report to stdout
    Schema,
}

/// Where the schedule text comes from.
#[derive(Debug, Args)]
pub struct ScheduleInput {
    /// Schedule text, e.g. "R1(X); W2(X); C1; C2"
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub schedule: Option<String>,
    /// Read the schedule from a file instead
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: ScheduleInput,
    /// Output the full report as JSON
    #[arg(long)]
    pub json: bool,
    /// Also print every lock phase event
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub input: ScheduleInput,
    /// Stop after this many steps
    #[arg(long, default_value_t = schedcheck_core::simulation::DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
    /// Output every snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of schedules to generate
    #[arg(long)]
    pub n_sched: u64,
    /// Number of transactions per schedule
    #[arg(long)]
    pub n_txn: u64,
    /// Number of variables
    #[arg(long)]
    pub n_var: u64,
    /// Number of reads and writes per transaction
    #[arg(long)]
    pub n_op: u64,
    /// Chance in percent that a transaction aborts instead of committing
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub abort_percent: u8,
    /// Output directory for generated schedule files
    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// Input directory containing generated schedule JSON files
    #[arg(long)]
    pub input_dir: PathBuf,
    /// Output results as JSON (one object per file)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct FmtArgs {
    /// Schedule files, or directories to search for .sched files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Check formatting without modifying files (exit 1 if unformatted)
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        App::command().debug_assert();
    }

    #[test]
    fn test_schedule_or_file() {
        let app = App::try_parse_from(["schedcheck", "analyze", "R1(X) C1"]);
        assert!(app.is_ok());
        let app = App::try_parse_from(["schedcheck", "analyze", "--file", "a.sched"]);
        assert!(app.is_ok());
        assert!(App::try_parse_from(["schedcheck", "analyze"]).is_err());
        assert!(App::try_parse_from(["schedcheck", "analyze", "R1(X)", "--file", "a"]).is_err());
    }

    #[test]
    fn test_simulate_defaults() {
        let Ok(App {
            command: Command::Simulate(args),
        }) = App::try_parse_from(["schedcheck", "simulate", "W1(A)"])
        else {
            panic!("simulate should parse");
        };
        assert_eq!(args.max_steps, 1000);
        assert!(!args.json);
    }

    #[test]
    fn test_abort_percent_range() {
        let base = [
            "schedcheck", "generate", "--n-sched", "1", "--n-txn", "2", "--n-var", "2",
            "--n-op", "2", "--output-dir", "out",
        ];
        assert!(App::try_parse_from(base.iter().chain(&["--abort-percent", "100"])).is_ok());
        assert!(App::try_parse_from(base.iter().chain(&["--abort-percent", "101"])).is_err());
    }
}
