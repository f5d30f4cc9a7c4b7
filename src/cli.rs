use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "teradrop")]
#[command(about = "TeraBox share-link downloader bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server
    Server(ServerArgs),
    /// Register the webhook URL with the Bot API
    SetWebhook(SetWebhookArgs),
    /// Drop activity log entries older than the retention TTL
    Prune,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (defaults to `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct SetWebhookArgs {
    /// Public HTTPS URL of the `/webhook` endpoint
    #[arg(long)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::parse_from(["teradrop", "server", "--address", "127.0.0.1:9000"]);
        match cli.command {
            Commands::Server(args) => {
                assert_eq!(args.address, Some("127.0.0.1:9000".parse().unwrap()))
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["teradrop", "set-webhook", "--url", "https://bot.example/webhook"]);
        assert!(matches!(cli.command, Commands::SetWebhook(ref a) if a.url == "https://bot.example/webhook"));

        let cli = Cli::parse_from(["teradrop", "prune"]);
        assert!(matches!(cli.command, Commands::Prune));
    }
}
