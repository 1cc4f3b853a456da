use tracing::Level;

const MONITOR_CONFIG: &str = "FLEET_MONITOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./monitor.json";

pub fn get_config_path() -> String {
    std::env::var(MONITOR_CONFIG).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

const MONITOR_LOG: &str = "FLEET_MONITOR_LOG";

const DEFAULT_LOG_LEVEL: Level = Level::DEBUG;

pub fn get_log_level() -> Level {
    let level_from_env = std::env::var(MONITOR_LOG);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| {
        res.parse().unwrap_or(DEFAULT_LOG_LEVEL)
    })
}
