//! Locating the desktop client's IndexedDB store on disk.

use std::path::{Path, PathBuf};

use crate::config::home_dir;

use super::error::{CacheError, Result};

const STORE_DIR: &str = "https_teams.microsoft.com_0.indexeddb.leveldb";

const MACOS_CANDIDATES: &[&str] = &[
    "Library/Containers/com.microsoft.teams2/Data/Library/Application Support/Microsoft/MSTeams/EBWebView/WV2Profile_tfw/IndexedDB",
    "Library/Application Support/Microsoft/Teams/IndexedDB",
];

const WINDOWS_CANDIDATES: &[&str] = &[
    "AppData/Local/Packages/MicrosoftTeams_8wekyb3d8bbwe/LocalCache/Microsoft/MSTeams/EBWebView/Default/IndexedDB",
    "AppData/Roaming/Microsoft/Teams/IndexedDB",
];

const LINUX_CANDIDATES: &[&str] = &[".config/Microsoft/Microsoft Teams/IndexedDB"];

/// Store locations probed for `os` (as in [`std::env::consts::OS`]), newest client first.
pub fn candidate_paths_for(os: &str, home: &Path) -> Result<Vec<PathBuf>> {
    let relative = match os {
        "macos" => MACOS_CANDIDATES,
        "windows" => WINDOWS_CANDIDATES,
        "linux" => LINUX_CANDIDATES,
        other => return Err(CacheError::UnsupportedPlatform(other.to_string())),
    };
    Ok(relative
        .iter()
        .map(|dir| home.join(dir).join(STORE_DIR))
        .collect())
}

/// The first existing store directory under `home` for `os`.
pub fn locate_cache_for(os: &str, home: &Path) -> Result<PathBuf> {
    let searched = candidate_paths_for(os, home)?;
    match searched.iter().find(|path| path.is_dir()) {
        Some(found) => {
            tracing::debug!("found cache at {}", found.display());
            Ok(found.clone())
        }
        None => Err(CacheError::CacheNotFound { searched }),
    }
}

/// The first existing store directory under the user's home directory.
pub fn locate_cache() -> Result<PathBuf> {
    let home = home_dir().ok_or(CacheError::CacheNotFound {
        searched: Vec::new(),
    })?;
    locate_cache_for(std::env::consts::OS, &home)
}
