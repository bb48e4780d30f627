use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Log file written under the cache directory when `--debug` is given without `--log-file`
pub const LOG_FILE: &str = "orderlens.log";

/// Manages the cache directory (log files and other per-user scratch data)
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Path of the default log file, creating the directory if needed
    pub fn log_path(&self) -> Result<PathBuf> {
        self.ensure_cache_dir()?;
        Ok(self.cache_file(LOG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_creates_dir() {
        let temp = tempfile::tempdir().unwrap();
        let manager = CacheManager::with_dir(temp.path().join("orderlens"));
        let path = manager.log_path().unwrap();
        assert!(temp.path().join("orderlens").is_dir());
        assert_eq!(path, temp.path().join("orderlens").join(LOG_FILE));
    }
}
