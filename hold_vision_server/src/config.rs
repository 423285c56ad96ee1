use std::path::PathBuf;

use hold_vision::core_modules::grid_scanner::DEFAULT_STEP;

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
/// Largest accepted request body, uploads included.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Telegram bot token. `None` rejects every login.
    pub bot_token: Option<String>,
    pub uploads_dir: PathBuf,
    pub scan_workers: usize,
    pub scan_step: u32,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            bot_token: None,
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            scan_workers: num_cpus::get(),
            scan_step: DEFAULT_STEP,
            log_json: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`; unset or unparsable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            bind_addr: non_empty("HOLDS_BIND").unwrap_or(defaults.bind_addr),
            bot_token: non_empty("BOT_TOKEN"),
            uploads_dir: non_empty("HOLDS_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            scan_workers: non_empty("HOLDS_SCAN_WORKERS")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|&workers| workers > 0)
                .unwrap_or(defaults.scan_workers),
            scan_step: non_empty("HOLDS_SCAN_STEP")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|&step| step > 0)
                .unwrap_or(defaults.scan_step),
            log_json: non_empty("HOLDS_LOG_JSON")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.log_json),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.bot_token, None);
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.scan_step, 5);
        assert!(config.scan_workers >= 1);
        assert!(!config.log_json);
    }

    #[test]
    fn reads_every_variable() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOLDS_BIND", "127.0.0.1:9000"),
            ("BOT_TOKEN", "123:abc"),
            ("HOLDS_UPLOADS_DIR", "/var/holds"),
            ("HOLDS_SCAN_WORKERS", "3"),
            ("HOLDS_SCAN_STEP", "2"),
            ("HOLDS_LOG_JSON", "yes"),
        ]));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.uploads_dir, PathBuf::from("/var/holds"));
        assert_eq!(config.scan_workers, 3);
        assert_eq!(config.scan_step, 2);
        assert!(config.log_json);
    }

    #[test]
    fn garbage_falls_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "  "),
            ("HOLDS_SCAN_WORKERS", "0"),
            ("HOLDS_SCAN_STEP", "five"),
            ("HOLDS_LOG_JSON", "maybe"),
        ]));
        assert_eq!(config.bot_token, None);
        assert!(config.scan_workers >= 1);
        assert_eq!(config.scan_step, 5);
        assert!(!config.log_json);
    }

    #[test]
    fn zero_step_falls_back_like_zero_workers() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOLDS_SCAN_WORKERS", "0"),
            ("HOLDS_SCAN_STEP", "0"),
        ]));
        assert_eq!(config.scan_step, 5);
        assert!(config.scan_workers >= 1);
    }
}
