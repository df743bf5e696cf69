use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "brl",
    about = "Bookrent Ledger: scripted scenarios against an in-memory rental ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a scenario file and print the notifications it produces
    Simulate(SimulateArgs),
    /// Check the hash chain of an exported journal
    Verify(VerifyArgs),
    /// Rebuild ledger state from an exported journal
    Replay(ReplayArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct SimulateArgs {
    pub scenario: PathBuf,
    /// Configuration file; overrides any `[config]` table in the scenario
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write the resulting journal to this file
    #[arg(long)]
    pub export_journal: Option<PathBuf>,
    /// Replay the journal afterwards and check it matches the live state
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub journal: PathBuf,
    /// Print every entry
    #[arg(long)]
    pub entries: bool,
}

#[derive(Args)]
pub struct ReplayArgs {
    pub journal: PathBuf,
    /// Configuration whose genesis allocations and fee terms the journal ran under
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simulate() {
        let cli = Cli::try_parse_from(["brl", "simulate", "demo.toml"]).unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.scenario, PathBuf::from("demo.toml"));
            assert!(args.config.is_none());
            assert!(!args.verify);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_simulate_with_options() {
        let cli = Cli::try_parse_from([
            "brl",
            "simulate",
            "demo.toml",
            "-c",
            "ledger.toml",
            "--export-journal",
            "out.bin",
            "--verify",
        ])
        .unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("ledger.toml")));
            assert_eq!(args.export_journal, Some(PathBuf::from("out.bin")));
            assert!(args.verify);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verify_entries() {
        let cli = Cli::try_parse_from(["brl", "verify", "journal.bin", "--entries"]).unwrap();
        if let Command::Verify(args) = cli.command {
            assert!(args.entries);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_replay() {
        let cli = Cli::try_parse_from(["brl", "replay", "journal.bin", "--config", "c.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Replay(_)));
    }

    #[test]
    fn parse_config_without_path() {
        let cli = Cli::try_parse_from(["brl", "config"]).unwrap();
        if let Command::Config(args) = cli.command {
            assert!(args.path.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["brl", "--verbose", "--format", "json", "config"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
