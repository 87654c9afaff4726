//! Persisted credentials for the analysis provider and the stock host.
//!
//! The store is loaded once at startup and only written by an explicit
//! [`CredentialStore::save`]. The on-disk form is a flat JSON object with the
//! keys `gemini_key`, `ftp_user`, and `ftp_pass`.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "shutterstacker";
const CREDENTIALS_FILE: &str = "credentials.json";

/// The three stored credential values. Empty strings count as absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "gemini_key", default)]
    pub api_key: String,
    #[serde(rename = "ftp_user", default)]
    pub transfer_user: String,
    #[serde(rename = "ftp_pass", default)]
    pub transfer_pass: String,
}

impl Credentials {
    pub fn api_key(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }

    /// Username and password, only when both are present.
    pub fn transfer_auth(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.transfer_user)?, non_empty(&self.transfer_pass)?))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("transfer_user", &self.transfer_user)
            .field("transfer_pass", &mask(&self.transfer_pass))
            .finish()
    }
}

/// Render a secret for display without revealing it.
pub fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "********"
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Credentials plus the file they persist to.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    credentials: Credentials,
}

impl CredentialStore {
    /// Load the store from `path`; a missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let credentials = if path.is_file() {
            let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse credentials {}", path.display()))?
        } else {
            Credentials::default()
        };
        Ok(Self {
            path: Some(path),
            credentials,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(credentials: Credentials) -> Self {
        Self {
            path: None,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the stored credentials and write them through to disk.
    pub fn save(&mut self, credentials: Credentials) -> Result<()> {
        if let Some(path) = &self.path {
            write_credentials(path, &credentials)?;
            tracing::info!(path = %path.display(), "credentials saved");
        }
        self.credentials = credentials;
        Ok(())
    }
}

/// Default location: `<config dir>/shutterstacker/credentials.json`.
pub fn default_credentials_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    Ok(config_dir.join(APP_DIR).join(CREDENTIALS_FILE))
}

fn write_credentials(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(credentials).context("serialize credentials")?;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
