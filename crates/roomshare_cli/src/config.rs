use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use roomshare_classroom::{RoomRegistry, ServiceTiming, DEFAULT_CLASSROOMS};
use roomshare_storage::StorageConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/roomshare.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub storage: StorageConfig,
    pub classroom: ClassroomSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassroomSection {
    pub rooms: Vec<String>,
    pub enforce_registry: bool,
    pub share_delay_ms: u64,
    pub refresh_delay_ms: u64,
    pub poll_interval_secs: u64,
}

impl Default for ClassroomSection {
    fn default() -> Self {
        Self {
            rooms: DEFAULT_CLASSROOMS.iter().map(|room| room.to_string()).collect(),
            enforce_registry: true,
            share_delay_ms: 1000,
            refresh_delay_ms: 500,
            poll_interval_secs: 30,
        }
    }
}

impl ClassroomSection {
    pub fn registry(&self) -> RoomRegistry {
        RoomRegistry::new(self.rooms.iter().cloned())
    }

    pub fn timing(&self) -> ServiceTiming {
        ServiceTiming {
            share_delay: Duration::from_millis(self.share_delay_ms),
            refresh_delay: Duration::from_millis(self.refresh_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

pub fn parse(source: &str) -> Result<RuntimeConfig> {
    toml::from_str(source).context("invalid roomshare config TOML")
}

/// Loads the config file. The default path may be absent, in which case
/// built-in defaults apply; an explicitly named file must exist.
pub fn load(path: &Path, explicit: bool) -> Result<RuntimeConfig> {
    if !explicit && !path.exists() {
        return Ok(RuntimeConfig::default());
    }

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&source).with_context(|| format!("invalid config at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{load, parse};
    use roomshare_storage::{BackendKind, CorruptBlobPolicy};
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("").expect("parse");

        assert_eq!(config.storage.backend, BackendKind::File);
        assert_eq!(config.storage.key, "faculty_pdfs");
        assert_eq!(config.classroom.rooms.len(), 10);
        assert!(config.classroom.enforce_registry);
        assert_eq!(config.classroom.timing().share_delay, Duration::from_millis(1000));
        assert_eq!(config.classroom.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [storage]
            backend = "sqlite"
            path = "var/rooms.db"
            on_corrupt = "reset"
            max_write_attempts = 2

            [classroom]
            rooms = ["A1", "A2"]
            enforce_registry = false
            share_delay_ms = 0
            refresh_delay_ms = 0
            "#,
        )
        .expect("parse");

        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.on_corrupt, CorruptBlobPolicy::Reset);
        assert_eq!(config.storage.max_write_attempts, 2);
        assert_eq!(config.storage.key, "faculty_pdfs");
        assert!(config.classroom.registry().contains("A2"));
        assert!(!config.classroom.enforce_registry);
        assert_eq!(config.classroom.timing().refresh_delay, Duration::ZERO);
        assert_eq!(config.classroom.poll_interval_secs, 30);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(parse("[storage]\nbackend = \"redis\"\n").is_err());
    }

    #[test]
    fn missing_default_file_falls_back_but_explicit_file_fails() {
        let path = Path::new("definitely/not/here/roomshare.toml");

        assert!(load(path, false).is_ok());
        assert!(load(path, true).is_err());
    }
}
