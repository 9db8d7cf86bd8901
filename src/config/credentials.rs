//! Wi-Fi credential store — two-line file (SSID, then password)
//!
//! The format is deliberately primitive: line one is the SSID, line two the
//! password, both trimmed on load. A missing file means the node has never
//! been configured and should boot into access-point mode.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Station credentials loaded from the credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    /// Network SSID
    pub ssid: String,
    /// Network password
    pub password: String,
}

impl WifiCredentials {
    /// True when no usable SSID is configured.
    pub fn is_empty(&self) -> bool {
        self.ssid.is_empty()
    }
}

/// Credential store errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file: {0}")]
    Read(String),
    #[error("failed to write credentials file: {0}")]
    Write(String),
}

/// Path of the credentials file inside a data directory.
pub fn credentials_path(data_dir: &Path) -> PathBuf {
    data_dir.join(super::defaults::CREDENTIALS_FILE_NAME)
}

/// Load credentials from the data directory.
///
/// Returns `None` when the file does not exist (node not yet configured).
pub fn load(data_dir: &Path) -> Result<Option<WifiCredentials>, CredentialsError> {
    let path = credentials_path(data_dir);
    if !path.exists() {
        info!(path = %path.display(), "Credentials file not found");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| CredentialsError::Read(e.to_string()))?;
    let mut lines = raw.lines();
    let ssid = lines.next().unwrap_or_default().trim().to_string();
    let password = lines.next().unwrap_or_default().trim().to_string();

    if ssid.is_empty() {
        warn!(path = %path.display(), "Credentials file present but SSID is empty");
    } else {
        info!("Credentials loaded");
    }

    Ok(Some(WifiCredentials { ssid, password }))
}

/// Load credentials, treating an unreadable file the same as a missing one.
///
/// A node that cannot read its credential file is not configured; it boots
/// into access-point mode rather than halting.
pub fn load_or_unconfigured(data_dir: &Path) -> Option<WifiCredentials> {
    match load(data_dir) {
        Ok(creds) => creds,
        Err(e) => {
            warn!(error = %e, "Failed to read credentials file, treating node as unconfigured");
            None
        }
    }
}

/// Persist credentials to the data directory, overwriting any previous file.
pub fn save(data_dir: &Path, creds: &WifiCredentials) -> Result<(), CredentialsError> {
    let path = credentials_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CredentialsError::Write(e.to_string()))?;
    }
    let contents = format!("{}\n{}\n", creds.ssid, creds.password);
    std::fs::write(&path, contents).map_err(|e| CredentialsError::Write(e.to_string()))?;
    info!("Credentials saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let creds = WifiCredentials {
            ssid: "lab-net".to_string(),
            password: "hunter2".to_string(),
        };
        save(tmp.path(), &creds).unwrap();

        let loaded = load(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded, creds);
    }

    #[test]
    fn test_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_file_treated_as_unconfigured() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory at the credential path makes the read fail
        std::fs::create_dir(credentials_path(tmp.path())).unwrap();

        assert!(load(tmp.path()).is_err());
        assert!(load_or_unconfigured(tmp.path()).is_none());
    }

    #[test]
    fn test_trims_whitespace() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(credentials_path(tmp.path()), "  lab-net \r\n pass \r\n").unwrap();
        let loaded = load(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.ssid, "lab-net");
        assert_eq!(loaded.password, "pass");
    }
}
