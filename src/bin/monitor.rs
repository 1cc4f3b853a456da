use std::sync::Arc;

use clap::Parser;
use fleet_monitor::{
    cache::{CacheService, MemoryCache},
    config::read_config_file,
    directory::StaticDirectory,
    service::MonitorService,
    util::{get_config_path, get_log_level},
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $FLEET_MONITOR_CONFIG or ./monitor.json)
    #[arg(short)]
    file: Option<String>,
}

fn log_filter(level: LevelFilter) -> filter::Targets {
    filter::Targets::new().with_targets(vec![
        ("fleet_monitor", level),
        ("tower_http", LevelFilter::INFO),
    ])
}

fn init() {
    let filter = log_filter(LevelFilter::from_level(get_log_level()));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(get_config_path);
    let config = read_config_file(&path)?;

    let cache = CacheService::new(Arc::new(MemoryCache::new()), config.namespace.clone());
    let directory = Arc::new(StaticDirectory::new(config.resources.clone()));
    let interval = config.interval();
    let api_config = config.api.clone();

    let service = MonitorService::new(cache, directory, config);
    service.start_monitoring(interval).await?;

    #[cfg(feature = "api")]
    {
        use fleet_monitor::api::{ApiState, spawn_api_server};
        spawn_api_server(&api_config, ApiState::new(service.clone())).await?;
    }
    #[cfg(not(feature = "api"))]
    let _ = api_config;

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
    }

    info!("shutting down");
    service.stop_monitoring().await?;

    Ok(())
}
