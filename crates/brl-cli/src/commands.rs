use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use brl_core::{LedgerConfig, ReplayEngine, Timestamp};
use brl_fabric::Notification;
use brl_ledger::Journal;

use crate::cli::*;
use crate::scenario::{self, Names, Outcome, Scenario};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Simulate(args) => cmd_simulate(args, &cli.format),
        Command::Verify(args) => cmd_verify(args, &cli.format),
        Command::Replay(args) => cmd_replay(args),
        Command::Config(args) => cmd_config(args),
    }
}

/// Render a clock reading as a UTC date, falling back to raw seconds.
pub fn render_time(at: Timestamp) -> String {
    i64::try_from(at.as_secs())
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| at.to_string())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    match path {
        Some(path) => Ok(LedgerConfig::load(path)?),
        None => Ok(LedgerConfig::default()),
    }
}

fn cmd_simulate(args: SimulateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let config = match (&args.config, &scenario.config) {
        (Some(path), _) => LedgerConfig::load(path)?,
        (None, Some(inline)) => inline.clone(),
        (None, None) => LedgerConfig::default(),
    };
    let sim = scenario::run(&scenario, &config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sim.reports)?),
        OutputFormat::Text => {
            for report in &sim.reports {
                let status = match &report.outcome {
                    Outcome::Ok { detail } => format!("{} {}", "✓".green(), detail),
                    Outcome::Failed { error } => format!("{} {}", "✗".red(), error.red()),
                };
                println!(
                    "{} {} {}",
                    format!("[{}]", report.index).dimmed(),
                    report.step.bold(),
                    render_time(report.at).dimmed()
                );
                println!("    {status}");
                for notification in &report.notifications {
                    println!("    {} {}", "→".cyan(), render_notification(notification, &sim.names));
                }
            }
            let failed = sim.reports.iter().filter(|r| !r.outcome.is_ok()).count();
            println!(
                "\n{} steps, {} failed, journal: {} entries",
                sim.reports.len().to_string().bold(),
                failed.to_string().bold(),
                sim.ledger.journal()?.len()
            );
        }
    }

    if let Some(path) = &args.export_journal {
        let bytes = sim.ledger.journal()?.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write journal {}", path.display()))?;
        println!("{} Journal written to {}", "✓".green(), path.display().to_string().bold());
    }

    if args.verify {
        let report = sim.ledger.verify_replay()?;
        anyhow::ensure!(
            report.converged,
            "replayed state diverges from live state after {} entries",
            report.replayed_entries
        );
        println!(
            "{} Replay of {} entries converges with the live state",
            "✓".green().bold(),
            report.replayed_entries
        );
    }
    Ok(())
}

fn read_journal(path: &Path) -> anyhow::Result<Journal> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read journal {}", path.display()))?;
    Journal::from_bytes(&bytes).with_context(|| format!("journal {} rejected", path.display()))
}

fn cmd_verify(args: VerifyArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let journal = read_journal(&args.journal)?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(journal.entries())?);
        return Ok(());
    }

    println!("{} Journal hash chain verified", "✓".green().bold());
    println!("  Entries: {}", journal.len().to_string().bold());
    let head = journal
        .head_hash()
        .map(hex::encode)
        .unwrap_or_else(|| "(empty)".into());
    println!("  Head: {}", head.yellow());

    if args.entries {
        for entry in journal.entries() {
            println!(
                "  {} {} {} {} {} {}",
                format!("#{}", entry.seq).yellow(),
                entry.tx_id.short_id().dimmed(),
                render_time(entry.at),
                entry.caller,
                entry.operation.name().cyan(),
                entry.operation.book()
            );
        }
    }
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let journal = read_journal(&args.journal)?;
    let state = ReplayEngine::rebuild(&config.genesis_balances()?, &journal, &config.rent_terms()?)
        .context("journal does not replay under this configuration")?;

    println!(
        "{} Replayed {} entries",
        "✓".green().bold(),
        journal.len().to_string().bold()
    );
    println!("  Books: {}", state.catalog().len());
    println!("  Rentals: {}", state.registry().rental_count());
    println!("  Balances:");
    for (account, balance) in state.balances().iter() {
        println!("    {} {}", account.to_string().cyan(), balance);
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.path.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn render_notification(notification: &Notification, names: &Names) -> String {
    match notification {
        Notification::Publish { book, title, price, .. } => {
            format!("Publish {} \"{}\" at {}", names.book(book), title, price)
        }
        Notification::RentalCreated {
            book,
            renter,
            start,
            end,
        } => format!(
            "RentalCreated {} by {} from {} to {}",
            names.book(book),
            names.account(renter),
            render_time(*start),
            render_time(*end)
        ),
        Notification::PaymentRecorded {
            book,
            renter,
            recipient,
            amount,
        } => format!(
            "PaymentRecorded {} from {} to {}: {}",
            names.book(book),
            names.account(renter),
            names.account(recipient),
            amount
        ),
        Notification::BalanceReported { account, balance } => {
            format!("BalanceReported {}: {}", names.account(account), balance)
        }
        Notification::RentalHistoryReported {
            renter,
            book,
            start,
            end,
        } => format!(
            "RentalHistoryReported {} by {} from {} to {}",
            names.book(book),
            names.account(renter),
            render_time(*start),
            render_time(*end)
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn render_time_formats_utc() {
        assert_eq!(render_time(Timestamp::zero()), "1970-01-01 00:00:00 UTC");
        assert_eq!(render_time(Timestamp::from_secs(86_400)), "1970-01-02 00:00:00 UTC");
    }

    #[test]
    fn render_time_falls_back_for_out_of_range() {
        let far = Timestamp::from_secs(u64::MAX);
        assert_eq!(render_time(far), far.to_string());
    }

    #[test]
    fn simulate_exports_a_replayable_journal() {
        let dir = tempfile::tempdir().unwrap();
        let scenario_path = dir.path().join("scenario.toml");
        let journal_path = dir.path().join("journal.bin");
        let mut file = std::fs::File::create(&scenario_path).unwrap();
        write!(
            file,
            r#"
[config]
genesis = [{{ account = "r1", amount = 30 }}]

[[step]]
op = "publish"
caller = "author"
book = "b1"
title = "B1"
price = 30

[[step]]
op = "rent"
reader = "r1"
book = "b1"
days = 2
"#
        )
        .unwrap();

        cmd_simulate(
            SimulateArgs {
                scenario: scenario_path,
                config: None,
                export_journal: Some(journal_path.clone()),
                verify: true,
            },
            &OutputFormat::Json,
        )
        .unwrap();

        let journal = read_journal(&journal_path).unwrap();
        assert_eq!(journal.len(), 2);

        let config = LedgerConfig::default().with_allocation("r1", 30);
        let state =
            ReplayEngine::rebuild(&config.genesis_balances().unwrap(), &journal, &config.rent_terms().unwrap())
                .unwrap();
        assert_eq!(state.registry().rental_count(), 1);
    }

    #[test]
    fn corrupted_journal_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.bin");
        std::fs::write(&path, b"not a journal").unwrap();
        assert!(read_journal(&path).is_err());
    }
}
