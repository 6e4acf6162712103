//! `maillink` -- relay Claude sign-in links from email to Telegram.
//!
//! Provides the following subcommands:
//!
//! - `maillink auth` -- One-time Gmail OAuth consent; writes `token.json`.
//! - `maillink bot` -- Answer `/link` in Telegram (the default).
//! - `maillink forward` -- Forward today's unread login emails once.
//! - `maillink run` -- Forward on a fixed interval until interrupted.
//! - `maillink probe` -- Print today's newest link without sending it.

use clap::{Parser, Subcommand};

mod commands;

/// Claude sign-in link relay.
#[derive(Parser)]
#[command(
    name = "maillink",
    about = "Relay Claude sign-in links from email to Telegram",
    version
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Authorize Gmail access once (opens a browser).
    Auth,

    /// Run the Telegram bot: reply to /link with the latest sign-in link.
    Bot,

    /// Forward today's unread login emails once, then exit.
    Forward {
        /// Print what would be sent; send nothing and mark nothing read.
        #[arg(long)]
        dry_run: bool,
    },

    /// Forward repeatedly until interrupted.
    Run {
        /// Seconds between runs (minimum 60).
        #[arg(long, default_value_t = maillink_services::scheduler::DEFAULT_INTERVAL_SECS)]
        interval: u64,
    },

    /// Show today's newest sign-in link without delivering it.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let env = commands::load_env();

    match cli.command.unwrap_or(Commands::Bot) {
        Commands::Auth => commands::auth::run(&env).await,
        Commands::Bot => commands::bot::run(&env).await,
        Commands::Forward { dry_run } => commands::forward::run(&env, dry_run).await,
        Commands::Run { interval } => commands::run::run(&env, interval).await,
        Commands::Probe => commands::probe::run(&env).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_without_error() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_help_contains_binary_name() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("maillink"));
    }

    #[test]
    fn cli_has_all_subcommands() {
        let cmd = Cli::command();
        let names: Vec<&str> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["auth", "bot", "forward", "run", "probe"] {
            assert!(names.contains(&expected), "missing subcommand {expected}");
        }
    }

    #[test]
    fn no_subcommand_means_bot() {
        let cli = Cli::try_parse_from(["maillink"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn forward_dry_run_flag() {
        let cli = Cli::try_parse_from(["maillink", "forward", "--dry-run"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Forward { dry_run: true }));

        let cli = Cli::try_parse_from(["maillink", "forward"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Forward { dry_run: false }));
    }

    #[test]
    fn run_interval_defaults_to_five_minutes() {
        let cli = Cli::try_parse_from(["maillink", "run"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { interval: 300 }));

        let cli = Cli::try_parse_from(["maillink", "run", "--interval", "900"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { interval: 900 }));
    }

    #[test]
    fn run_interval_must_be_a_number() {
        assert!(Cli::try_parse_from(["maillink", "run", "--interval", "soon"]).is_err());
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["maillink", "probe", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command, Some(Commands::Probe));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["maillink", "gateway"]).is_err());
    }
}
