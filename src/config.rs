//! Credentials file handling.
//!
//! Credentials live in a TOML file of named host entries:
//!
//! ```toml
//! [hosts.prod]
//! host = "company.looker.com"
//! port = 19999
//! client_id = "..."
//! client_secret = "..."
//! ```
//!
//! Resolution precedence: explicit `--host/--client-id/--client-secret`
//! flags bypass the file entirely; otherwise `--host` names an entry (a file
//! with a single entry needs no `--host` at all). On Unix the file must be
//! mode 600 before it is read, and `--alias` writes the resolved entry back
//! under a new name with the same restriction re-applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "looker.toml";
pub const DEFAULT_PORT: u16 = 19999;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub client_id: String,
    pub client_secret: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub hosts: BTreeMap<String, HostEntry>,
}

/// Authentication-related CLI input, prior to resolution.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub config_file: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub alias: Option<String>,
}

/// Pick the config file to use: an explicit path wins, then `./looker.toml`,
/// then the per-user config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|d| d.join("looker-audit").join("config.toml"))
        .unwrap_or(local)
}

/// Resolve credentials from flags and/or the config file, persisting them
/// under `--alias` when requested.
pub fn resolve(options: &AuthOptions) -> Result<HostEntry> {
    let path = config_path(options.config_file.as_deref());

    let entry = match (&options.client_id, &options.client_secret) {
        (Some(client_id), Some(client_secret)) => {
            let host = options.host.clone().ok_or_else(|| {
                Error::Config("--host is required with --client-id/--client-secret".to_string())
            })?;
            HostEntry {
                host,
                port: options.port.unwrap_or(DEFAULT_PORT),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }
        }
        (None, None) => {
            let file = load(&path)?;
            let mut entry = lookup(&file, options.host.as_deref(), &path)?;
            if let Some(port) = options.port {
                entry.port = port;
            }
            entry
        }
        _ => {
            return Err(Error::Config(
                "--client-id and --client-secret must be supplied together".to_string(),
            ))
        }
    };

    if let Some(alias) = &options.alias {
        save_alias(&path, alias, &entry)?;
    }

    Ok(entry)
}

pub fn load(path: &Path) -> Result<CredentialsFile> {
    check_permissions(path)?;
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("could not read config file {}: {e}", path.display()))
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "could not parse config file {}: {e}",
            path.display()
        ))
    })
}

fn lookup(file: &CredentialsFile, host: Option<&str>, path: &Path) -> Result<HostEntry> {
    match host {
        Some(name) => file.hosts.get(name).cloned().ok_or_else(|| {
            Error::Config(format!(
                "host entry '{name}' not found in {}",
                path.display()
            ))
        }),
        // A single entry is unambiguous; no --host needed.
        None => match file.hosts.values().next() {
            Some(entry) if file.hosts.len() == 1 => Ok(entry.clone()),
            _ => Err(Error::Config(format!(
                "config file {} has {} host entries; pick one with --host",
                path.display(),
                file.hosts.len()
            ))),
        },
    }
}

/// Persist credentials under a new alias, keeping the file locked down.
fn save_alias(path: &Path, alias: &str, entry: &HostEntry) -> Result<()> {
    let mut file = if path.exists() {
        load(path)?
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        CredentialsFile::default()
    };
    file.hosts.insert(alias.to_string(), entry.clone());
    let content = toml::to_string_pretty(&file)
        .map_err(|e| Error::Config(format!("could not serialize credentials: {e}")))?;
    fs::write(path, content)?;
    restrict_permissions(path)?;
    info!(path = %path.display(), alias, "saved credentials");
    Ok(())
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
        .permissions()
        .mode();
    if mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "config file {} permissions are {:o} and are not strict enough; \
             change to 600 (rw-------) and try again",
            path.display(),
            mode & 0o777
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
