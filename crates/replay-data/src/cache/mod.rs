//! 시계열 캐시.
//!
//! `(symbol, timeframe)`별로 가장 최근에 수집한 캔들 시계열 하나를 보관합니다.
//! 항목은 항상 통째로 교체되며, 병합이나 부분 갱신은 하지 않습니다.
//!
//! 저장소 구현은 [`SeriesStore`] trait으로 추상화됩니다.
//! - [`MemoryStore`]: 프로세스 내부 저장소 (테스트, 일회성 실행)
//! - [`RedisSeriesStore`]: Redis 해시 기반 영속 저장소

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::{RedisSeriesStore, RedisStoreConfig};

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replay_core::{is_strictly_ascending, Candle, SeriesKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ============================================================================
// 캐시 항목
// ============================================================================

/// 캐시에 저장되는 시계열 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: SeriesKey,
    /// 시간 오름차순, 중복 없음
    pub candles: Vec<Candle>,
    /// 마지막 저장 시각
    pub last_update: DateTime<Utc>,
    /// 직렬화 크기 추정치 (바이트)
    pub approx_size_bytes: usize,
}

impl CacheEntry {
    /// 새 항목 생성. 저장 시각은 현재 시각입니다.
    pub fn new(key: SeriesKey, candles: Vec<Candle>) -> Self {
        let approx_size_bytes = serde_json::to_vec(&candles)
            .map(|bytes| bytes.len())
            .unwrap_or_default();

        Self {
            key,
            candles,
            last_update: Utc::now(),
            approx_size_bytes,
        }
    }

    /// 저장된 캔들 수.
    pub fn count(&self) -> usize {
        self.candles.len()
    }

    /// 최신 `count`개 캔들만 잘라냄.
    ///
    /// # Errors
    /// 저장된 캔들이 `count`보다 적으면 `DataError::InsufficientCache`.
    pub fn tail(self, count: usize) -> Result<TailSlice> {
        if count > self.count() {
            return Err(DataError::InsufficientCache {
                requested: count,
                available: self.count(),
            });
        }

        let metadata = self.metadata();
        let skip = self.count() - count;
        let candles = self.candles.into_iter().skip(skip).collect();

        Ok(TailSlice { candles, metadata })
    }

    /// 캔들 없이 메타데이터만 추출.
    pub fn metadata(&self) -> CacheMetadata {
        CacheMetadata {
            key: self.key.clone(),
            count: self.candles.len(),
            last_update: self.last_update,
            approx_size_bytes: self.approx_size_bytes,
            first_time: self.candles.first().map(|c| c.time),
            last_time: self.candles.last().map(|c| c.time),
        }
    }
}

/// 캐시 항목 메타데이터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub key: SeriesKey,
    pub count: usize,
    pub last_update: DateTime<Utc>,
    pub approx_size_bytes: usize,
    /// 가장 오래된 캔들 시간 (초)
    pub first_time: Option<i64>,
    /// 가장 최근 캔들 시간 (초)
    pub last_time: Option<i64>,
}

/// 최신 N개 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct TailSlice {
    pub candles: Vec<Candle>,
    pub metadata: CacheMetadata,
}

/// 캐시 전체 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_keys: usize,
    pub total_candles: usize,
    pub total_approx_size_bytes: usize,
}

// ============================================================================
// 저장소 trait
// ============================================================================

/// 캐시 저장소.
///
/// `put`은 원자적이어야 합니다. 실패하면 이전 항목이 그대로 남아 있어야 합니다.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// 항목 조회.
    async fn get(&self, key: &SeriesKey) -> Result<Option<CacheEntry>>;

    /// 항목 저장 (기존 항목 교체).
    async fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// 항목 삭제. 존재했으면 `true`.
    async fn delete(&self, key: &SeriesKey) -> Result<bool>;

    /// 모든 항목 삭제. 삭제한 항목 수를 반환합니다.
    async fn clear(&self) -> Result<usize>;

    /// 모든 항목의 메타데이터.
    async fn metadata(&self) -> Result<Vec<CacheMetadata>>;
}

// ============================================================================
// 캐시 파사드
// ============================================================================

/// 시계열 캐시.
#[derive(Clone)]
pub struct SeriesCache {
    store: Arc<dyn SeriesStore>,
}

impl SeriesCache {
    pub fn new(store: Arc<dyn SeriesStore>) -> Self {
        Self { store }
    }

    /// 메모리 저장소 기반 캐시.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// 항목 조회.
    pub async fn lookup(&self, key: &SeriesKey) -> Result<Option<CacheEntry>> {
        self.store.get(key).await
    }

    /// 최신 `count`개 캔들 조회.
    ///
    /// # Errors
    /// 항목이 없거나 저장된 캔들이 `count`보다 적으면 `DataError::InsufficientCache`.
    pub async fn tail(&self, key: &SeriesKey, count: usize) -> Result<TailSlice> {
        match self.store.get(key).await? {
            Some(entry) => entry.tail(count),
            None => Err(DataError::InsufficientCache {
                requested: count,
                available: 0,
            }),
        }
    }

    /// 항목 교체.
    ///
    /// # Errors
    /// - 시계열이 엄격한 오름차순이 아니면 `DataError::InvalidRequest`
    /// - 저장 실패 시 `DataError::CacheWrite` (캔들 포함, 기존 항목 유지)
    #[instrument(skip(self, key, candles), fields(key = %key, count = candles.len()))]
    pub async fn replace(&self, key: &SeriesKey, candles: Vec<Candle>) -> Result<CacheEntry> {
        if !is_strictly_ascending(&candles) {
            return Err(DataError::InvalidRequest(format!(
                "{} 시계열이 시간 오름차순이 아닙니다",
                key
            )));
        }

        let entry = CacheEntry::new(key.clone(), candles);

        if let Err(e) = self.store.put(&entry).await {
            return Err(DataError::CacheWrite {
                message: e.to_string(),
                candles: entry.candles,
            });
        }

        debug!(
            count = entry.count(),
            size = entry.approx_size_bytes,
            "캐시 항목 교체"
        );

        Ok(entry)
    }

    /// 항목 삭제.
    pub async fn remove(&self, key: &SeriesKey) -> Result<bool> {
        let removed = self.store.delete(key).await?;
        if removed {
            info!(key = %key, "캐시 항목 삭제");
        }
        Ok(removed)
    }

    /// 전체 삭제. 비어 있어도 성공입니다.
    pub async fn clear(&self) -> Result<bool> {
        let removed = self.store.clear().await?;
        info!(removed = removed, "캐시 전체 삭제");
        Ok(true)
    }

    /// 캐시 통계.
    pub async fn stats(&self) -> Result<CacheStats> {
        let metadata = self.store.metadata().await?;

        Ok(metadata.iter().fold(CacheStats::default(), |mut acc, m| {
            acc.total_keys += 1;
            acc.total_candles += m.count;
            acc.total_approx_size_bytes += m.approx_size_bytes;
            acc
        }))
    }

    /// 저장된 모든 항목의 메타데이터 (키 순서).
    pub async fn keys(&self) -> Result<Vec<CacheMetadata>> {
        let mut metadata = self.store.metadata().await?;
        metadata.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(metadata)
    }
}
