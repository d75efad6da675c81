//! Local cache of raw source datasets.
//!
//! One CSV per key under the cache root. Whether a present file is reused is
//! decided by `CachePolicy`; the default reuses anything on disk regardless
//! of age, which means a stale file suppresses refreshes until removed.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::error::AppError;
use crate::io::export::{read_frame_csv, write_frame_csv};
use crate::series::MacroFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    AlwaysReuse,
    RefreshIfOlderThan(Duration),
}

#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
    policy: CachePolicy,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>, policy: CachePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.csv"))
    }

    /// Return the cached table for `key` if the policy allows reusing it.
    pub fn load(&self, key: &str) -> Option<MacroFrame> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }

        if let CachePolicy::RefreshIfOlderThan(max_age) = self.policy {
            let age = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok());
            match age {
                Some(age) if age <= max_age => {}
                _ => {
                    info!(key, path = %path.display(), "Cached file is stale; refreshing");
                    return None;
                }
            }
        }

        match read_frame_csv(&path) {
            Ok(frame) => {
                info!(key, rows = frame.len(), path = %path.display(), "Loaded cached data");
                Some(frame)
            }
            Err(e) => {
                warn!(key, "Ignoring unreadable cache file: {e}");
                None
            }
        }
    }

    pub fn save(&self, key: &str, frame: &MacroFrame) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            AppError::input(format!("Failed to create cache dir '{}': {e}", self.root.display()))
        })?;
        let path = self.path_for(key);
        write_frame_csv(&path, frame)?;
        info!(key, rows = frame.len(), path = %path.display(), "Saved data to cache");
        Ok(())
    }
}
