use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{FrostError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub status_http_addr: String,
    pub lookback_days: u32,
    pub refresh_interval: Duration,
    pub domains: Vec<Domain>,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_home = env::var("XDG_DATA_HOME").ok();

        let data_root = data_home
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(home).join(".local/share"));

        Self {
            db_path: data_root.join("frostforecast/frostforecast.duckdb"),
            status_http_addr: "127.0.0.1:8344".to_string(),
            lookback_days: 90,
            refresh_interval: Duration::from_secs(60 * 60 * 4),
            domains: Domain::ALL.to_vec(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    db_path: Option<PathBuf>,
    status_http_addr: Option<String>,
    lookback_days: Option<u32>,
    refresh_interval: Option<String>,
    domains: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("FROST_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("frostforecast/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| FrostError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| FrostError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let lookback_days = match env::var("FROST_LOOKBACK_DAYS") {
        Ok(v) => Some(v.parse::<u32>().map_err(|e| {
            FrostError::Config(format!("bad FROST_LOOKBACK_DAYS in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        db_path: env::var("FROST_DB_PATH").ok().map(PathBuf::from),
        status_http_addr: env::var("FROST_STATUS_HTTP_ADDR").ok(),
        lookback_days,
        refresh_interval: env::var("FROST_REFRESH_INTERVAL").ok(),
        domains: env::var("FROST_DOMAINS").ok(),
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = overrides.status_http_addr {
        cfg.status_http_addr = v;
    }
    if let Some(v) = overrides.lookback_days {
        cfg.lookback_days = v;
    }
    if let Some(v) = overrides.refresh_interval {
        cfg.refresh_interval = humantime::parse_duration(&v).map_err(|e| {
            FrostError::Config(format!("bad refresh_interval in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.domains {
        cfg.domains = parse_domains(&v)
            .map_err(|e| FrostError::Config(format!("bad domains in {source}: {e} (value={v})")))?;
    }
    Ok(())
}

pub fn parse_domains(raw: &str) -> Result<Vec<Domain>> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let domain: Domain = trimmed.parse()?;
        if !out.contains(&domain) {
            out.push(domain);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_expected_endpoints() {
        let cfg = Config::default();
        assert_eq!(cfg.status_http_addr, "127.0.0.1:8344");
        assert!(cfg.db_path.ends_with("frostforecast/frostforecast.duckdb"));
    }

    #[test]
    fn default_covers_all_domains() {
        let cfg = Config::default();
        assert_eq!(cfg.lookback_days, 90);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(14_400));
        assert_eq!(cfg.domains.len(), Domain::ALL.len());
    }

    #[test]
    fn parse_domains_accepts_list() {
        let domains = parse_domains("pipe, warehouse,compute_pool").unwrap();
        assert_eq!(
            domains,
            vec![Domain::Pipe, Domain::Warehouse, Domain::ComputePool]
        );
    }

    #[test]
    fn parse_domains_dedups_and_rejects_unknown() {
        assert_eq!(parse_domains("pipe,pipe").unwrap(), vec![Domain::Pipe]);
        assert!(parse_domains("pipe,igloo").is_err());
    }

    #[test]
    fn apply_file_overrides_updates_refresh_fields() {
        let mut cfg = Config::default();
        let file = ConfigOverrides {
            lookback_days: Some(7),
            refresh_interval: Some("30m".to_string()),
            domains: Some("warehouse,cortex_function".to_string()),
            ..ConfigOverrides::default()
        };

        apply_overrides(&mut cfg, file, "config file").unwrap();

        assert_eq!(cfg.lookback_days, 7);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(1_800));
        assert_eq!(
            cfg.domains,
            vec![Domain::Warehouse, Domain::CortexFunction]
        );
    }

    #[test]
    fn apply_overrides_rejects_bad_interval() {
        let mut cfg = Config::default();
        let file = ConfigOverrides {
            refresh_interval: Some("soon".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(apply_overrides(&mut cfg, file, "config file").is_err());
    }
}
