//! Style Cache - generated sheet identifier → CSS text
//!
//! Two backends behind one async trait:
//! - `MemoryStyleCache`: concurrent map, lives as long as the process
//! - `DiskStyleCache`: one `{id}.css` file per sheet, survives restarts
//!
//! A cache may be shared by concurrent page renders, so both backends
//! are safe to call from many tasks at once.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::{CartridgeConfig, ConfigError};
use crate::error::{DomError, Result};
use crate::utils::STYLE_SHEET_EXTENSION;

/// Key/value store for serialized style sheets
#[async_trait]
pub trait StyleCache: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Read a sheet. A miss is `Ok(None)`, never an error.
    async fn get(&self, id: &str) -> Result<Option<String>>;

    /// Store a sheet. Once this returns, `get(id)` sees the new text.
    async fn set(&self, id: &str, css: String) -> Result<()>;

    /// Number of stored sheets
    async fn len(&self) -> Result<usize>;
}

/// In-memory cache backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStyleCache {
    entries: DashMap<String, String>,
}

impl MemoryStyleCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StyleCache for MemoryStyleCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn set(&self, id: &str, css: String) -> Result<()> {
        self.entries.insert(id.to_string(), css);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

/// Disk cache writing `{dir}/{id}.css`
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so a reader sees either the old file or the new one.
#[derive(Debug)]
pub struct DiskStyleCache {
    dir: PathBuf,
    next_tmp: AtomicU64,
}

impl DiskStyleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_tmp: AtomicU64::new(0),
        }
    }

    /// Path of the file holding sheet `id`
    ///
    /// Identifiers derive from producer tag names, so anything that could
    /// leave the style folder is rejected.
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let escapes = id.is_empty()
            || id.starts_with('.')
            || id.contains("..")
            || id.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
        if escapes {
            return Err(DomError::InvalidCacheKey(id.to_string()));
        }
        Ok(self.dir.join(format!("{}{}", id, STYLE_SHEET_EXTENSION)))
    }

    fn tmp_path_for(&self, id: &str) -> PathBuf {
        let seq = self.next_tmp.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.tmp", id, std::process::id(), seq))
    }
}

#[async_trait]
impl StyleCache for DiskStyleCache {
    fn name(&self) -> &str {
        "disk"
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(id)?).await {
            Ok(css) => Ok(Some(css)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, id: &str, css: String) -> Result<()> {
        let target = self.path_for(id)?;

        // create_dir_all succeeds when another request already created it
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.tmp_path_for(id);
        tokio::fs::write(&tmp, css).await?;
        if let Err(e) = tokio::fs::rename(&tmp, target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(id, dir = ?self.dir, "style sheet written");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with('.') && name.ends_with(STYLE_SHEET_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Pick the cache backend the configuration asks for
pub fn build_style_cache(
    config: &CartridgeConfig,
) -> std::result::Result<Arc<dyn StyleCache>, ConfigError> {
    let cache: Arc<dyn StyleCache> = if config.persist_styles_to_disk {
        let folder = config
            .styles_sheets_folder
            .as_deref()
            .ok_or(ConfigError::NoStyleSheetsFolder)?;
        Arc::new(DiskStyleCache::new(folder))
    } else {
        Arc::new(MemoryStyleCache::new())
    };

    tracing::info!(backend = cache.name(), "style cache ready");
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryStyleCache::new();
        assert_eq!(cache.get("x-0").await.unwrap(), None);

        cache.set("x-0", "a{}".to_string()).await.unwrap();
        cache.set("x-0", "b{}".to_string()).await.unwrap();

        assert_eq!(cache.get("x-0").await.unwrap().as_deref(), Some("b{}"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disk_cache_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("ct-stylesheets");
        let cache = DiskStyleCache::new(&dir);

        assert_eq!(cache.get("card-0").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 0);

        cache.set("card-0", "p{margin:0}".to_string()).await.unwrap();

        let on_disk = std::fs::read_to_string(dir.join("card-0.css")).unwrap();
        assert_eq!(on_disk, "p{margin:0}");
        assert_eq!(cache.get("card-0").await.unwrap().as_deref(), Some("p{margin:0}"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disk_cache_concurrent_writers() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Arc::new(DiskStyleCache::new(tmp.path().join("styles")));

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.set("shared-0", format!("a{{z-index:{}}}", i)).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let css = cache.get("shared-0").await.unwrap().unwrap();
        assert!(css.starts_with("a{z-index:"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disk_cache_rejects_escaping_identifiers() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("styles");
        let cache = DiskStyleCache::new(&dir);

        for id in ["../../x-0", "a/b-0", "a\\b-0", "..", "", ".hidden-0"] {
            assert!(
                matches!(cache.set(id, "a{}".to_string()).await, Err(DomError::InvalidCacheKey(_))),
                "{id:?} should be rejected"
            );
            assert!(cache.get(id).await.is_err());
        }

        assert!(!tmp.path().join("x-0.css").exists());
        assert_eq!(cache.len().await.unwrap(), 0);

        cache.set("my-widget-0", "a{}".to_string()).await.unwrap();
        assert_eq!(cache.path_for("my-widget-0").unwrap(), dir.join("my-widget-0.css"));
    }

    #[test]
    fn test_build_style_cache_requires_folder_for_disk() {
        let config = CartridgeConfig {
            persist_styles_to_disk: true,
            styles_sheets_folder: None,
            ..CartridgeConfig::default()
        };
        assert!(matches!(
            build_style_cache(&config),
            Err(ConfigError::NoStyleSheetsFolder)
        ));

        let cache = build_style_cache(&CartridgeConfig::default()).unwrap();
        assert_eq!(cache.name(), "memory");

        let disk = CartridgeConfig {
            persist_styles_to_disk: true,
            ..CartridgeConfig::default()
        };
        assert_eq!(build_style_cache(&disk).unwrap().name(), "disk");
    }
}
