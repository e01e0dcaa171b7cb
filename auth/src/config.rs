use std::path::Path;

use ini::Ini;

/// Mechanics for the one configuration file this service reads: an INI file
/// with at minimum a `[database] filename` key. `listen.port` is read from
/// the same file, defaulting to the protocol's well-known port, so a
/// deployment's existing config file carries both values instead of
/// splitting them across a file and an environment variable.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_filename: String,
    pub listen_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_filename: ":memory:".to_string(),
            listen_port: super::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Loads `path` if it exists; a missing file is not an error, and
    /// missing keys fall back to their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;

        let database_filename = ini
            .section(Some("database"))
            .and_then(|s| s.get("filename"))
            .unwrap_or(":memory:")
            .to_string();

        let listen_port = ini
            .section(Some("listen"))
            .and_then(|s| s.get("port"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(super::DEFAULT_PORT);

        Ok(Self {
            database_filename,
            listen_port,
        })
    }
}
