use anyhow::Result;
use assetcmp::core::error::AnalysisError;
use assetcmp::core::log::init_logging;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{s}', expected DD/MM/YYYY"))
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare the variation of two instruments between two dates
    Compare {
        /// First ticker, e.g. ^BVSP, PETR4.SA, BTC-USD or RF-CDI
        first: String,
        /// Second ticker
        second: String,
        /// Start date (DD/MM/YYYY)
        #[arg(short, long, value_parser = parse_date)]
        start: NaiveDate,
        /// End date (DD/MM/YYYY), today by default
        #[arg(short, long, value_parser = parse_date)]
        end: Option<NaiveDate>,
    },
    /// Compare rolling-window returns of two instruments
    Windows {
        /// First ticker
        first: String,
        /// Second ticker
        second: String,
        /// Years of history to analyse (1-30)
        #[arg(short, long, default_value_t = 10)]
        years: u32,
        /// Window length in months
        #[arg(short, long, default_value_t = 12)]
        months: u32,
    },
}

impl From<Commands> for assetcmp::AppCommand {
    fn from(cmd: Commands) -> assetcmp::AppCommand {
        match cmd {
            Commands::Compare {
                first,
                second,
                start,
                end,
            } => assetcmp::AppCommand::Compare {
                first,
                second,
                start,
                end,
            },
            Commands::Windows {
                first,
                second,
                years,
                months,
            } => assetcmp::AppCommand::Windows {
                first,
                second,
                years,
                months,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => assetcmp::cli::setup::setup(),
        Some(cmd) => assetcmp::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
        if let Some(analysis) = e.downcast_ref::<AnalysisError>() {
            eprintln!("Tip: {}", analysis.hint());
        }
    }
    result
}
