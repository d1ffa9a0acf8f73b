use std::str::FromStr;

use log::LevelFilter;

use crate::config::LoggingConfig;

/// Initialize the global logger from configuration.
///
/// `RUST_LOG` still wins when set, so ad-hoc debugging does not require a
/// config change.
pub fn init(config: &LoggingConfig) {
    let level = LevelFilter::from_str(&config.level).unwrap_or(LevelFilter::Info);

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init(&config);
        init(&config); // second call must not panic
    }
}
