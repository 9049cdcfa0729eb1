use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use humantime::parse_duration;
use tracing::{info, warn};

pub const DATA_DIR_VAR: &str = "LIFESYNC_DATA_DIR";
pub const SESSION_TTL_VAR: &str = "LIFESYNC_SESSION_TTL";
pub const DEFAULT_SESSION_TTL: &str = "1h";

/// Longest accepted session lifetime, one year.
const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub session_ttl: Duration,
}

impl Config {
    /// Resolve the configuration: the command-line data directory wins
    /// over the environment, which wins over the platform default. The
    /// data directory is created if missing.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir
            .or_else(|| env::var_os(DATA_DIR_VAR).map(PathBuf::from))
            .or_else(find_default_data_dir)
            .ok_or_else(|| anyhow!("Failed to find a data directory."))?;

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}.", data_dir.display()))?;

        let session_ttl = session_ttl(env::var(SESSION_TTL_VAR).ok().as_deref());
        info!(data_dir = %data_dir.display(), ?session_ttl, "configuration loaded");

        Ok(Config {
            data_dir,
            session_ttl,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("db.sqlite")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn theme_path(&self) -> PathBuf {
        self.data_dir.join("theme.json")
    }

    /// The session lifetime as a chrono duration. Out-of-range values
    /// fall back to the default.
    pub fn session_ttl(&self) -> chrono::Duration {
        match chrono::Duration::from_std(self.session_ttl) {
            Ok(ttl) if self.session_ttl <= MAX_SESSION_TTL => ttl,
            _ => {
                warn!(ttl = ?self.session_ttl, "session lifetime out of range, using {}", DEFAULT_SESSION_TTL);
                chrono::Duration::hours(1)
            }
        }
    }
}

fn find_default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "lifesync", "lifesync").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Parse a session lifetime such as "90min". Invalid, zero or longer
/// than a year values fall back to the default.
fn session_ttl(value: Option<&str>) -> Duration {
    let default = Duration::from_secs(60 * 60);
    match value {
        None => default,
        Some(raw) => match parse_duration(raw) {
            Ok(ttl) if ttl > Duration::from_secs(0) && ttl <= MAX_SESSION_TTL => ttl,
            Ok(_) => {
                warn!(
                    "{} must be positive and at most a year, using {}",
                    SESSION_TTL_VAR, DEFAULT_SESSION_TTL
                );
                default
            }
            Err(err) => {
                warn!(%err, "invalid {}, using {}", SESSION_TTL_VAR, DEFAULT_SESSION_TTL);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_parses_human_durations() {
        assert_eq!(session_ttl(None), Duration::from_secs(3600));
        assert_eq!(session_ttl(Some("90min")), Duration::from_secs(90 * 60));
        assert_eq!(session_ttl(Some("soon")), Duration::from_secs(3600));
        assert_eq!(session_ttl(Some("0s")), Duration::from_secs(3600));
        assert_eq!(session_ttl(Some("300000years")), Duration::from_secs(3600));
        assert_eq!(session_ttl(Some("30days")), Duration::from_secs(30 * 24 * 3600));
    }

    #[test]
    fn oversized_session_ttl_converts_to_the_default() {
        let config = Config {
            data_dir: PathBuf::from("."),
            session_ttl: Duration::from_secs(u64::MAX),
        };
        assert_eq!(config.session_ttl(), chrono::Duration::hours(1));

        let config = Config {
            session_ttl: Duration::from_secs(90 * 60),
            ..config
        };
        assert_eq!(config.session_ttl(), chrono::Duration::minutes(90));
    }

    #[test]
    fn explicit_data_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("lifesync");
        let config = Config::load(Some(data_dir.clone())).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(config.database_path(), data_dir.join("db.sqlite"));
        assert_eq!(config.session_path(), data_dir.join("session.json"));
        assert_eq!(config.theme_path(), data_dir.join("theme.json"));
    }
}
