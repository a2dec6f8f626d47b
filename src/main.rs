use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use limited_sniper::config::LoggingConfig;
use limited_sniper::item_loader;
use limited_sniper::plugins::marketplace::CsrfSession;
use limited_sniper::plugins::{build_http_client, Collaborators};
use limited_sniper::{AppConfig, Dispatcher};

#[derive(Parser, Debug)]
#[command(name = "limited-sniper", version, about)]
struct Args {
    /// File with one `<id>,<price>` pair per line
    #[arg(short, long)]
    file: PathBuf,

    /// Config file name, any format the config crate reads
    #[arg(short, long, default_value = "config")]
    config: String,

    /// Log every cycle
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let mut filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    if verbose {
        filter = filter.add_directive("limited_sniper=debug".parse()?);
    }

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "limited-sniper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;
    if args.verbose {
        config.watcher.verbose = true;
    }
    let _guard = init_tracing(&config.logging, config.watcher.verbose)?;

    info!("Starting Limited Sniper...");

    let items = item_loader::load_items(&args.file).await?;

    let client = build_http_client(&config.http)?;
    let session = Arc::new(CsrfSession::from_config(client.clone(), &config));
    let user = session.authenticate().await?;
    if user.id <= 0 {
        anyhow::bail!("Authentication failed: the session cookie was not accepted");
    }
    info!("Authenticated as {} ({})", user.name, user.id);

    let collaborators = Collaborators::from_config(&config, client, session);
    let dispatcher = Dispatcher::new(config, collaborators);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down...");
                signal_token.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {}", e),
        }
    });

    let report = dispatcher.run(items, shutdown).await?;
    let stats = dispatcher.stats();
    info!(
        "Samples: {}, sample errors: {}, purchase attempts: {}, skipped claims: {}",
        stats.samples, stats.sample_errors, stats.attempts, stats.skipped_claims
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
