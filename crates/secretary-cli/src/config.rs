use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use secretary_core::SessionConfig;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SecretaryConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub ui: UiSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub trace: bool,
    #[serde(default = "enabled")]
    pub shell_escape: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            trace: false,
            shell_escape: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UiSection {
    pub editor: Option<String>,
    #[serde(default = "enabled")]
    pub color: bool,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            editor: None,
            color: true,
        }
    }
}

fn enabled() -> bool {
    true
}

impl SecretaryConfig {
    /// Session settings, with the `--database` flag taking precedence.
    pub fn session(&self, database: Option<&str>, trace: bool) -> anyhow::Result<SessionConfig> {
        let default_path = match database.or(self.database.path.as_deref()) {
            Some(path) => expand_home(path)?,
            None => default_database_path()?,
        };
        Ok(SessionConfig {
            default_path: Some(default_path),
            trace: trace || self.session.trace,
            shell_escape: self.session.shell_escape,
        })
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("secretary.db"))
}

/// Load the config; a missing default file yields defaults, a missing
/// explicit one is an error.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<SecretaryConfig> {
    match explicit {
        Some(path) => read_config(&expand_home(path)?),
        None => {
            let path = default_config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                Ok(SecretaryConfig::default())
            }
        }
    }
}

pub fn read_config(path: &Path) -> anyhow::Result<SecretaryConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> anyhow::Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("secretary"));
        }
    }
    Ok(home_dir()?.join(".config").join("secretary"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("secretary"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("secretary"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SecretaryConfig = toml::from_str("").unwrap();
        assert!(config.database.path.is_none());
        assert!(config.session.shell_escape);
        assert!(!config.session.trace);
        assert!(config.ui.color);
    }

    #[test]
    fn test_full_config() {
        let config: SecretaryConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/vault.db"
            [session]
            trace = true
            shell_escape = false
            [ui]
            editor = "nano"
            color = false
            "#,
        )
        .unwrap();
        assert_eq!(config.ui.editor.as_deref(), Some("nano"));

        let session = config.session(None, false).unwrap();
        assert_eq!(session.default_path, Some(PathBuf::from("/tmp/vault.db")));
        assert!(session.trace);
        assert!(!session.shell_escape);
    }

    #[test]
    fn test_flag_overrides_config_path() {
        let config: SecretaryConfig =
            toml::from_str("[database]\npath = \"/tmp/a.db\"\n").unwrap();
        let session = config.session(Some("/tmp/b.db"), false).unwrap();
        assert_eq!(session.default_path, Some(PathBuf::from("/tmp/b.db")));
    }
}
