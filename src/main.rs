use clap::{Args, Parser, Subcommand};

mod auth;
mod cli;
mod client;
mod config;
mod error;
mod model;
mod store;
mod ui;
mod urls;
mod version;

#[cfg(test)]
mod tests;

use cli::CliHandler;
use version::CURRENT_VERSION;

#[derive(Parser)]
#[command(
    name = "shortly",
    about = "URL shortener client",
    long_about = "Shortly - URL shortening from the command line

OVERVIEW:
  This tool talks to a shortly backend: create short URLs, resolve short
  codes back to their targets, and inspect click statistics.

QUICK START:
  shortly login                         # Authenticate with your account
  shortly shorten <URL>                 # Create a short URL
  shortly list                          # List your short URLs
  shortly resolve <CODE>                # Look up the URL behind a code
  shortly stats <CODE>                  # Show click statistics
  shortly status                        # Check authentication and endpoint",
    version = CURRENT_VERSION,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Login with username and password
    Login(LoginArgs),

    /// Logout and drop the stored session
    Logout,

    /// Show authentication status
    #[command(aliases = &["st"])]
    Status,

    /// List your short URLs
    #[command(aliases = &["ls"])]
    List,

    /// Create a short URL
    Shorten(ShortenArgs),

    /// Delete a short URL
    #[command(aliases = &["rm"])]
    Remove(RemoveArgs),

    /// Resolve a short code to its original URL
    Resolve(ResolveArgs),

    /// Show click statistics for a short code
    Stats(StatsArgs),

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    /// Username; prompted for when omitted
    pub username: Option<String>,
}

#[derive(Args)]
pub struct ShortenArgs {
    pub url: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub id: u64,

    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub code: String,

    /// Skip access tracking after resolution
    #[arg(long)]
    pub no_track: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    pub code: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetTimeout { millis: u64 },
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("shortly={}", log_level));
    subscriber.init();

    let mut handler = CliHandler::new(None);
    if let Err(e) = handler.execute(cli.command).await {
        ui::UI::new().error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
