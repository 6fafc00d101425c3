use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::app::Result;
use crate::media::{CacheTier, Resolution};

pub const DEFAULT_MEMORY_ENTRIES: usize = 64;

/// Two-tier media cache: every body lands on disk, near-viewport bodies are
/// additionally pinned in a bounded in-memory map.
pub struct MediaCache {
    dir: PathBuf,
    memory: Mutex<MemoryTier>,
}

struct MemoryTier {
    entries: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl MemoryTier {
    fn insert(&mut self, key: String, bytes: Vec<u8>) {
        if self.entries.insert(key.clone(), bytes).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

impl MediaCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_memory_capacity(dir, DEFAULT_MEMORY_ENTRIES)
    }

    pub fn with_memory_capacity(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            memory: Mutex::new(MemoryTier {
                entries: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        })
    }

    /// Cache file name: SHA-256 of the resource key, suffixed by fidelity so
    /// a reduced body never shadows a full one.
    fn disk_path(&self, key: &str, resolution: Resolution) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hex::encode(hasher.finalize());
        let suffix = match resolution {
            Resolution::Full => "full",
            Resolution::Reduced => "reduced",
        };
        self.dir.join(format!("{digest}-{suffix}"))
    }

    fn memory_key(key: &str, resolution: Resolution) -> String {
        match resolution {
            Resolution::Full => format!("{key}#full"),
            Resolution::Reduced => format!("{key}#reduced"),
        }
    }

    pub fn store(
        &self,
        key: &str,
        resolution: Resolution,
        tier: CacheTier,
        bytes: &[u8],
    ) -> Result<()> {
        fs::write(self.disk_path(key, resolution), bytes)?;
        if tier == CacheTier::MemoryAndDisk {
            if let Ok(mut memory) = self.memory.lock() {
                memory.insert(Self::memory_key(key, resolution), bytes.to_vec());
            }
        }
        Ok(())
    }

    pub fn lookup(&self, key: &str, resolution: Resolution) -> Option<Vec<u8>> {
        if let Ok(memory) = self.memory.lock() {
            if let Some(bytes) = memory.entries.get(&Self::memory_key(key, resolution)) {
                return Some(bytes.clone());
            }
        }
        fs::read(self.disk_path(key, resolution)).ok()
    }

    pub fn contains(&self, key: &str, resolution: Resolution) -> bool {
        if let Ok(memory) = self.memory.lock() {
            if memory.entries.contains_key(&Self::memory_key(key, resolution)) {
                return true;
            }
        }
        self.disk_path(key, resolution).exists()
    }

    #[cfg(test)]
    fn memory_len(&self) -> usize {
        self.memory.lock().map(|m| m.entries.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_lookup_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path()).unwrap();

        cache
            .store("https://cdn.example.com/p1.jpg", Resolution::Full, CacheTier::MemoryAndDisk, b"bytes")
            .unwrap();

        assert!(cache.contains("https://cdn.example.com/p1.jpg", Resolution::Full));
        assert_eq!(
            cache.lookup("https://cdn.example.com/p1.jpg", Resolution::Full),
            Some(b"bytes".to_vec())
        );
        assert!(!cache.contains("https://cdn.example.com/p1.jpg", Resolution::Reduced));
    }

    #[test]
    fn test_disk_only_skips_memory_tier() {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::new(dir.path()).unwrap();

        cache
            .store("k", Resolution::Reduced, CacheTier::DiskOnly, b"bytes")
            .unwrap();

        assert_eq!(cache.memory_len(), 0);
        assert_eq!(cache.lookup("k", Resolution::Reduced), Some(b"bytes".to_vec()));
    }

    #[test]
    fn test_memory_tier_evicts_oldest_beyond_capacity() {
        let dir = TempDir::new().unwrap();
        let cache = MediaCache::with_memory_capacity(dir.path(), 2).unwrap();

        for key in ["a", "b", "c"] {
            cache
                .store(key, Resolution::Full, CacheTier::MemoryAndDisk, b"x")
                .unwrap();
        }

        assert_eq!(cache.memory_len(), 2);
        // Evicted from memory, still served from disk.
        assert_eq!(cache.lookup("a", Resolution::Full), Some(b"x".to_vec()));
    }
}
