//! 메모리 저장소.

use super::{CacheEntry, CacheMetadata, SeriesStore};
use crate::error::Result;
use async_trait::async_trait;
use replay_core::SeriesKey;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 프로세스 내부 캐시 저장소.
///
/// 프로세스가 끝나면 내용이 사라집니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<SeriesKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn get(&self, key: &SeriesKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &SeriesKey) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    async fn metadata(&self) -> Result<Vec<CacheMetadata>> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .map(CacheEntry::metadata)
            .collect())
    }
}
