pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "vitrine",
    about = "Vitrine operator CLI",
    long_about = "Operate the Vitrine recommendation engine: migrations, demo seeds, \
                  one-off block evaluation, analytics reports, and readiness checks.",
    after_help = "Examples:\n  vitrine migrate\n  vitrine recommend --block homepage-related --user u-1\n  vitrine stats --block homepage-related\n  vitrine doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog, history, and placements")]
    Seed,
    #[command(about = "Evaluate one recommendation block for a subject and print the ranking")]
    Recommend {
        #[arg(long, help = "Block name, e.g. homepage-related")]
        block: String,
        #[arg(long, help = "Known user id", conflicts_with = "session")]
        user: Option<String>,
        #[arg(long, help = "Anonymous session id")]
        session: Option<String>,
        #[arg(long, help = "Anchor product id for similarity and cross-sell")]
        anchor: Option<String>,
        #[arg(long, default_value = "home", help = "Page type: home|product|category|cart|checkout|search|other")]
        page: String,
        #[arg(long, default_value = "en-US")]
        locale: String,
        #[arg(long, help = "Bypass the result cache and recompute")]
        fresh: bool,
    },
    #[command(about = "Print the daily analytics rows for a block")]
    Stats {
        #[arg(long, help = "Block name, e.g. homepage-related")]
        block: String,
        #[arg(long, help = "Report date (YYYY-MM-DD), defaults to today")]
        date: Option<String>,
    },
    #[command(about = "Validate configuration, DB connectivity, and schema presence")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Recommend { block, user, session, anchor, page, locale, fresh } => {
            commands::recommend::run(&block, user, session, anchor, &page, &locale, fresh)
        }
        Command::Stats { block, date } => commands::stats::run(&block, date.as_deref()),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
