use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::level::Level;

pub const ENV_LEVEL: &str = "ULTRALOG_LEVEL";
pub const ENV_COLOR: &str = "ULTRALOG_COLOR";
pub const ENV_RING_CAPACITY: &str = "ULTRALOG_RING_CAPACITY";
pub const ENV_UTC: &str = "ULTRALOG_UTC";

/// Default time pattern of the terminal renderer, e.g. `01-02|15:04:05`.
pub const DEFAULT_TIME_FORMAT: &str = "%m-%d|%H:%M:%S";
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// When the terminal renderer emits ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Color only if the destination is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Whether to emit colors for a destination that is or is not a terminal.
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            ColorMode::Auto => is_terminal,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" | "on" | "true" => Ok(ColorMode::Always),
            "never" | "off" | "false" => Ok(ColorMode::Never),
            _ => Err(ConfigError::InvalidColorMode(s.to_string())),
        }
    }
}

/// Runtime settings shared by the logger, the async writer and the renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub level: Level,
    pub color: ColorMode,
    /// Slot count of the async writer's ring; must be a power of two.
    pub ring_capacity: usize,
    /// chrono format pattern for terminal timestamps.
    pub time_format: String,
    /// Render timestamps in UTC instead of local time.
    pub utc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Info,
            color: ColorMode::Auto,
            ring_capacity: DEFAULT_RING_CAPACITY,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            utc: false,
        }
    }
}

impl Config {
    /// Defaults overridden by the `ULTRALOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(level) = lookup(ENV_LEVEL) {
            config.level = level.parse()?;
        }
        if let Some(color) = lookup(ENV_COLOR) {
            config.color = color.parse()?;
        }
        if let Some(capacity) = lookup(ENV_RING_CAPACITY) {
            config.ring_capacity = capacity.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_RING_CAPACITY,
                value: capacity.clone(),
            })?;
        }
        if let Some(utc) = lookup(ENV_UTC) {
            config.utc = matches!(utc.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.ring_capacity, 1024);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_LEVEL, "warn"),
            (ENV_COLOR, "never"),
            (ENV_RING_CAPACITY, "4096"),
            (ENV_UTC, "true"),
        ]))
        .unwrap();
        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.ring_capacity, 4096);
        assert!(config.utc);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_LEVEL, "loud")])),
            Err(ConfigError::InvalidLevel(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_COLOR, "rainbow")])),
            Err(ConfigError::InvalidColorMode(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(ENV_RING_CAPACITY, "lots")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
