mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::{info, warn};

use teradrop::api::{self, AppState};
use teradrop::config::Config;
use teradrop::fetcher::{FileFetcher, Fetcher};
use teradrop::handlers::{CommandRegistry, Dispatcher};
use teradrop::links::LinkExtractor;
use teradrop::observability::{Metrics, init_tracing};
use teradrop::pipeline::{ChannelReporter, FailureSink, Pipeline};
use teradrop::resolver::ResolverClient;
use teradrop::store::{FjallUserStore, UserStore};
use teradrop::telegram::BotApi;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Prune => Config::load_local(),
        _ => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;
    init_tracing(&config.telemetry.log_level);

    match cli.command {
        Commands::Server(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            serve(config, address).await?
        }
        Commands::SetWebhook(args) => set_webhook(&config, &args.url).await?,
        Commands::Prune => prune(&config)?,
    }

    Ok(())
}

fn bot_api(config: &Config) -> Result<BotApi, AnyError> {
    let token = config
        .telegram
        .bot_token
        .as_deref()
        .ok_or("TELEGRAM_BOT_TOKEN is not set")?;
    Ok(BotApi::new(&config.telegram, token)?)
}

async fn serve(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    info!(path = %config.store.path.display(), "Opening user store");
    let store = Arc::new(FjallUserStore::open(&config.store.path, config.store.history_limit)?);
    let chat = Arc::new(bot_api(&config)?);
    let resolver = Arc::new(ResolverClient::new(&config.resolver)?);
    let fetcher = Arc::new(FileFetcher::new(&config.download)?);
    let extractor = LinkExtractor::new(&config.links.patterns)?;
    let metrics = Arc::new(Metrics::new());

    let reporter = config.telegram.error_channel.map(|channel| {
        Arc::new(ChannelReporter::new(chat.clone(), channel)) as Arc<dyn FailureSink>
    });

    let pipeline = Pipeline::builder()
        .extractor(extractor)
        .resolver(resolver)
        .fetcher(fetcher.clone())
        .chat(chat.clone())
        .store(store.clone())
        .size_limit(config.download.max_file_size.as_u64())
        .maybe_archive_channel(config.telegram.store_channel)
        .maybe_reporter(reporter)
        .metrics(metrics)
        .build();

    let registry = CommandRegistry::with_defaults(chat.clone(), store.clone());
    let dispatcher = Arc::new(Dispatcher::new(registry, Arc::new(pipeline), chat, store.clone()));

    let state = AppState::new(
        dispatcher,
        config.telegram.webhook_secret.clone(),
        config.server.max_body_bytes.as_usize(),
    );

    api::run(address, state.clone()).await?;

    if !state.drain(config.server.shutdown_timeout()).await {
        warn!("Shutdown timeout elapsed with updates still in flight");
    }

    let removed = fetcher.cleanup_all().await;
    info!(removed, "Download directory cleaned");
    store.persist()?;
    info!("Shutdown complete");

    Ok(())
}

async fn set_webhook(config: &Config, url: &str) -> Result<(), AnyError> {
    let api = bot_api(config)?;
    api.set_webhook(url, config.telegram.webhook_secret.as_deref()).await?;
    info!(url, "Webhook registered");
    Ok(())
}

fn prune(config: &Config) -> Result<(), AnyError> {
    let store = FjallUserStore::open(&config.store.path, config.store.history_limit)?;
    let stats = store.prune_logs(config.retention.logs_ttl())?;
    store.persist()?;
    info!(pruned = stats.logs_pruned, kept = stats.logs_kept, "Activity log pruned");
    Ok(())
}
