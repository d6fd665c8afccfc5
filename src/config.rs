use serde::Deserialize;

/// Server configuration: an optional YAML file with environment overrides.
///
/// The file path comes from `CONFIG_PATH` (default `config.yaml`); a missing
/// file just yields the defaults. `LISTEN` and `UPSTREAM` override the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub upstream_url: String,
    pub connection_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:42069".to_string(),
            upstream_url: "http://httpbin.org".to_string(),
            connection_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_yaml::from_str(&contents)?,
            Err(_) => Config::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.listen_addr = addr;
        }
        if let Ok(url) = std::env::var("UPSTREAM") {
            cfg.upstream_url = url;
        }

        Ok(cfg)
    }
}
