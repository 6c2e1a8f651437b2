//! `wallapop-adjust`: keep listing prices moving
//!
//! # Usage
//!
//! ```bash
//! wallapop-adjust login                 # capture browser cookies once
//! wallapop-adjust configure             # choose an adjustment per listing
//! wallapop-adjust run                   # apply adjustments
//! wallapop-adjust run --dry-run         # show what would change
//! wallapop-adjust status
//! wallapop-adjust reset
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use wallapop_auto_adjust::{
    cli::{failure_report, init_logging, run_adjust, run_configure, run_login, run_reset, run_status},
    config::ConfigLoader,
    utils::get_version,
};

#[derive(Parser)]
#[command(author, about, long_about = None)]
#[command(name = "wallapop-adjust")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Show version information
    #[arg(long)]
    version: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the browser session cookies and save the session
    Login {
        /// Read cookies from a file (JSON object, browser export or Cookie header)
        #[arg(long, value_name = "FILE")]
        cookies: Option<PathBuf>,
    },
    /// Adjust the prices of all configured listings
    Run {
        /// Report changes without applying them
        #[arg(long)]
        dry_run: bool,
    },
    /// Choose the adjustment of each listing and the delay between changes
    Configure,
    /// Show the saved session and product configuration
    Status,
    /// Delete the saved session
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", get_version());
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let result = async {
        let settings = ConfigLoader::new().load(cli.config.as_deref())?;
        init_logging(&settings.logging, cli.verbose);

        match command {
            Command::Login { cookies } => run_login(settings, cookies.as_deref()).await,
            Command::Run { dry_run } => run_adjust(settings, dry_run).await.map(|_| ()),
            Command::Configure => run_configure(settings).await,
            Command::Status => run_status(settings).await,
            Command::Reset => run_reset(settings).await,
        }
    }
    .await;

    if let Err(err) = result {
        eprintln!("{}", failure_report(&err));
        std::process::exit(1);
    }
    Ok(())
}
