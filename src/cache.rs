//! Content-addressed disk chunk cache with a JSON manifest and byte-budget
//! LRU eviction. All mutation goes through one coarse lock so
//! `load`/`save`/eviction never interleave, matching
//! `tools/butterfly-route`'s use of `parking_lot` to guard shared mutable
//! state cheaply.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::chunk::{parse_container, Chunk};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::region::Region;
use crate::tile::TileId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ManifestEntry {
    size: u64,
    #[serde(rename = "lastAccess")]
    last_access: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    entries: HashMap<String, ManifestEntry>,
}

/// Bytes + access-time bounded disk cache for chunk containers.
pub struct ChunkCache {
    root: PathBuf,
    config: CacheConfig,
    state: Arc<Mutex<ManifestFile>>,
}

/// Snapshot of cache occupancy, for integrators and for asserting the
/// byte-budget invariant in tests.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_bytes: u64,
}

fn manifest_key(region_id: &str, tile: TileId) -> String {
    format!("{}_{}_{}_{}", region_id, tile.z, tile.x, tile.y)
}

fn chunk_path(root: &Path, region_id: &str, tile: TileId) -> PathBuf {
    root.join(region_id)
        .join(tile.z.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.iarc", tile.y))
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl ChunkCache {
    /// Open (or create) a cache rooted at `root`, loading its manifest if
    /// one already exists.
    pub async fn open(root: impl Into<PathBuf>, config: CacheConfig) -> Result<Self> {
        let root = root.into();
        let manifest_path = root.join("manifest.json");
        let root_for_blocking = root.clone();
        let manifest_path_for_blocking = manifest_path.clone();

        let manifest = tokio::task::spawn_blocking(move || -> Result<ManifestFile> {
            std::fs::create_dir_all(&root_for_blocking)?;
            match std::fs::read(&manifest_path_for_blocking) {
                Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ManifestFile::default()),
                Err(e) => Err(Error::IOFailed(e)),
            }
        })
        .await
        .expect("cache manifest load task panicked")?;

        Ok(Self {
            root,
            config,
            state: Arc::new(Mutex::new(manifest)),
        })
    }

    /// Read a cached chunk. Returns `Ok(None)` if the tile is not cached;
    /// decode failures for a present file propagate as an error — a
    /// partial or corrupt tile is never silently treated as absent.
    pub async fn load(&self, region: &Region, tile: TileId) -> Result<Option<Chunk>> {
        let path = chunk_path(&self.root, &region.id, tile);
        let key = manifest_key(&region.id, tile);
        let state = self.state.clone();
        let root = self.root.clone();

        let bytes = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let mut manifest = state.lock();
                    if let Some(entry) = manifest.entries.get_mut(&key) {
                        entry.last_access = now_secs();
                    } else {
                        manifest.entries.insert(
                            key.clone(),
                            ManifestEntry {
                                size: bytes.len() as u64,
                                last_access: now_secs(),
                            },
                        );
                    }
                    persist_manifest(&root, &manifest)?;
                    Ok(Some(bytes))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::IOFailed(e)),
            }
        })
        .await
        .expect("cache load task panicked")?;

        match bytes {
            Some(bytes) => Ok(Some(parse_container(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write raw container bytes for a tile (atomic write-then-rename),
    /// update the manifest, and enforce the byte budget.
    pub async fn save(&self, region: &Region, tile: TileId, bytes: &[u8]) -> Result<()> {
        let path = chunk_path(&self.root, &region.id, tile);
        let key = manifest_key(&region.id, tile);
        let size = bytes.len() as u64;
        let state = self.state.clone();
        let root = self.root.clone();
        let max_bytes = self.config.max_bytes;
        let bytes = bytes.to_vec();

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp_path = path.with_extension("iarc.tmp");
            std::fs::write(&tmp_path, &bytes)?;
            std::fs::rename(&tmp_path, &path)?;

            let mut manifest = state.lock();
            manifest.entries.insert(
                key,
                ManifestEntry {
                    size,
                    last_access: now_secs(),
                },
            );
            enforce_budget(&root, &mut manifest, max_bytes)?;
            persist_manifest(&root, &manifest)?;
            Ok(())
        })
        .await
        .expect("cache save task panicked")
    }

    pub fn stats(&self) -> CacheStats {
        let manifest = self.state.lock();
        CacheStats {
            entry_count: manifest.entries.len(),
            total_bytes: manifest.entries.values().map(|e| e.size).sum(),
        }
    }
}

/// Evict entries in ascending `lastAccess` order until total size is at or
/// below `max_bytes`. Runs after writes only.
fn enforce_budget(root: &Path, manifest: &mut ManifestFile, max_bytes: u64) -> Result<()> {
    let mut total: u64 = manifest.entries.values().map(|e| e.size).sum();
    if total <= max_bytes {
        return Ok(());
    }

    let mut by_access: Vec<(String, ManifestEntry)> = manifest
        .entries
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    by_access.sort_by(|a, b| a.1.last_access.partial_cmp(&b.1.last_access).unwrap());

    for (key, entry) in by_access {
        if total <= max_bytes {
            break;
        }
        if let Some(path) = key_to_path(root, &key) {
            let _ = std::fs::remove_file(path);
        }
        manifest.entries.remove(&key);
        total = total.saturating_sub(entry.size);
    }

    Ok(())
}

fn key_to_path(root: &Path, key: &str) -> Option<PathBuf> {
    // region_id is an unconstrained string and may itself contain '_', so the
    // trailing z/x/y fields must be peeled off from the right, not the left.
    let mut parts = key.rsplitn(4, '_');
    let y: u32 = parts.next()?.parse().ok()?;
    let x: u32 = parts.next()?.parse().ok()?;
    let z: u8 = parts.next()?.parse().ok()?;
    let region_id = parts.next()?;
    Some(chunk_path(root, region_id, TileId::new(z, x, y)))
}

fn persist_manifest(root: &Path, manifest: &ManifestFile) -> Result<()> {
    let path = root.join("manifest.json");
    let tmp_path = root.join("manifest.json.tmp");
    let bytes = serde_json::to_vec_pretty(manifest)?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region {
            id: "r".to_string(),
            min_lat: 0.0,
            min_lon: 0.0,
            max_lat: 1.0,
            max_lon: 1.0,
            base_url: "https://example".to_string(),
            chunk_zoom: 12,
        }
    }

    fn sized_bytes(n: usize) -> Vec<u8> {
        vec![0u8; n]
    }

    #[tokio::test]
    async fn missing_tile_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ChunkCache::open(dir.path(), CacheConfig::default())
            .await
            .unwrap();
        let region = region();
        // Raw bytes aren't a valid chunk container, so only exercise the
        // miss path here; save/load round-trips are covered via the codec
        // module plus the eviction tests below.
        assert!(cache
            .load(&region, TileId::new(12, 1, 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lru_eviction_matches_ascending_access_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig { max_bytes: 3000 };
        let cache = ChunkCache::open(dir.path(), config).await.unwrap();
        let region = region();

        let tiles: Vec<TileId> = (1..=4).map(|i| TileId::new(12, i, i)).collect();
        for (i, tile) in tiles.iter().enumerate() {
            // Each save is a distinct instant; sleep a touch so lastAccess
            // strictly orders saves for the eviction assertion below.
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let _ = cache.save(&region, *tile, &sized_bytes(1000)).await;
            let _ = i;
        }

        let stats = cache.stats();
        assert!(stats.total_bytes <= 3000);

        let manifest = cache.state.lock();
        let key1 = manifest_key(&region.id, tiles[0]);
        assert!(!manifest.entries.contains_key(&key1));
        let key4 = manifest_key(&region.id, tiles[3]);
        assert!(manifest.entries.contains_key(&key4));
    }

    #[tokio::test]
    async fn budget_never_exceeded_after_saves() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig { max_bytes: 2500 };
        let cache = ChunkCache::open(dir.path(), config).await.unwrap();
        let region = region();

        for i in 1..=6u32 {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            cache
                .save(&region, TileId::new(12, i, i), &sized_bytes(900))
                .await
                .unwrap();
        }

        assert!(cache.stats().total_bytes <= 2500);
    }

    #[tokio::test]
    async fn manifest_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::default();
        {
            let cache = ChunkCache::open(dir.path(), config).await.unwrap();
            let region = region();
            cache
                .save(&region, TileId::new(12, 1, 1), &sized_bytes(100))
                .await
                .unwrap();
        }

        let reopened = ChunkCache::open(dir.path(), config).await.unwrap();
        assert_eq!(reopened.stats().entry_count, 1);
    }
}
