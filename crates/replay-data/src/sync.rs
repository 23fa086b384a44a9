//! 캐시 동기화 코디네이터.
//!
//! 요청 하나를 받아 캐시 상태를 판정하고, 필요할 때만 업스트림에서 수집하여
//! 캐시를 교체한 뒤 결과 시계열을 반환합니다.
//!
//! # 동작 흐름
//!
//! ```text
//! 요청 (symbol, timeframe, count)
//!         │
//!         ▼
//! ┌─────────────────────┐
//! │ 1. 키별 Lock 획득    │ ← 같은 심볼+TF는 하나만 처리
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      │ 캐시 충분?  │
//!      └─────┬──────┘
//!        YES │ NO
//!            │   │
//!            │   ▼
//!            │ ┌─────────────────────┐
//!            │ │ 2. 업스트림 수집     │
//!            │ └──────────┬──────────┘
//!            │            │
//!            │   ┌────────▼─────────────┐
//!            │   │ 3. 더 많으면 캐시 교체 │
//!            │   └────────┬─────────────┘
//!            ▼            ▼
//!     ┌─────────────────────┐
//!     │ 4. 시계열 반환       │
//!     └─────────────────────┘
//! ```

use crate::cache::SeriesCache;
use crate::error::{DataError, Result};
use crate::history::{HistoryFetcher, ProgressFn};
use replay_core::{Candle, SeriesKey, Timeframe};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// 시계열 키별 동기화 Lock 맵.
type SyncLockMap = Arc<RwLock<HashMap<SeriesKey, Arc<Mutex<()>>>>>;

/// 동기화 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub key: SeriesKey,
    pub count: usize,
}

impl SyncRequest {
    /// 요청 생성.
    ///
    /// # Errors
    /// 심볼이 비어 있거나 `count`가 0이면 `DataError::InvalidRequest`.
    pub fn new(symbol: &str, timeframe: Timeframe, count: usize) -> Result<Self> {
        let key = SeriesKey::new(symbol, timeframe)?;
        if count == 0 {
            return Err(DataError::InvalidRequest(
                "요청 캔들 수는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(Self { key, count })
    }
}

/// 요청 시점의 캐시 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// 캐시 항목 없음
    NoCache,
    /// 캐시에 요청 수 이상 보유
    CacheSufficient,
    /// 캐시가 요청 수보다 적음
    CacheInsufficient,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::NoCache => write!(f, "no-cache"),
            SyncState::CacheSufficient => write!(f, "cache-sufficient"),
            SyncState::CacheInsufficient => write!(f, "cache-insufficient"),
        }
    }
}

/// 동기화 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// 판정된 캐시 상태
    pub state: SyncState,
    /// 반환 시계열 (시간 오름차순)
    pub candles: Vec<Candle>,
    /// 업스트림에서 받은 캔들 수 (수집하지 않았으면 `None`)
    pub fetched: Option<usize>,
    /// 캐시를 교체했는지 여부
    pub written: bool,
}

/// 캐시 동기화 코디네이터.
#[derive(Clone)]
pub struct SyncCoordinator {
    cache: SeriesCache,
    history: HistoryFetcher,
    min_count: usize,
    max_count: usize,
    sync_locks: SyncLockMap,
}

impl SyncCoordinator {
    pub fn new(cache: SeriesCache, history: HistoryFetcher) -> Self {
        Self {
            cache,
            history,
            min_count: 1,
            max_count: usize::MAX,
            sync_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 허용 요청 수 범위 설정 (양 끝 포함).
    pub fn with_count_bounds(mut self, min_count: usize, max_count: usize) -> Self {
        self.min_count = min_count.max(1);
        self.max_count = max_count.max(self.min_count);
        self
    }

    /// 사용 중인 캐시.
    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// 최근 `count`개 캔들 동기화 후 반환.
    pub async fn sync(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<Candle>> {
        let outcome = self
            .sync_detailed(symbol, timeframe, count, on_progress)
            .await?;
        Ok(outcome.candles)
    }

    /// 동기화 후 판정 상태와 수집/저장 여부까지 반환.
    ///
    /// # Errors
    /// - 잘못된 요청: `DataError::InvalidRequest` (업스트림/캐시 접근 없음)
    /// - 업스트림 실패: `DataError::Upstream` (캐시 변경 없음)
    /// - 캐시 저장 실패: `DataError::CacheWrite` (수집한 시계열 포함)
    #[instrument(skip(self, on_progress))]
    pub async fn sync_detailed(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<SyncOutcome> {
        let request = SyncRequest::new(symbol, timeframe, count)?;
        self.check_bounds(request.count)?;

        // 같은 키의 동기화는 직렬화
        let lock = self.get_or_create_lock(&request.key).await;
        let result = {
            let _guard = lock.lock().await;
            self.sync_locked(&request, on_progress).await
        };
        self.release_lock(&request.key, lock).await;

        result
    }

    async fn sync_locked(
        &self,
        request: &SyncRequest,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<SyncOutcome> {
        let entry = self.cache.lookup(&request.key).await?;
        let cached = entry.as_ref().map(|e| e.count()).unwrap_or(0);

        let state = match &entry {
            None => SyncState::NoCache,
            Some(_) if cached >= request.count => SyncState::CacheSufficient,
            Some(_) => SyncState::CacheInsufficient,
        };

        debug!(
            key = %request.key,
            state = %state,
            cached = cached,
            requested = request.count,
            "캐시 상태 판정"
        );

        // 방금 읽은 항목에서 바로 잘라냄 (저장소 재조회 없음)
        let entry = match entry {
            Some(entry) if state == SyncState::CacheSufficient => {
                let tail = entry.tail(request.count)?;
                info!(key = %request.key, returned = tail.candles.len(), "캐시에서 반환");

                return Ok(SyncOutcome {
                    state,
                    candles: tail.candles,
                    fetched: None,
                    written: false,
                });
            }
            other => other,
        };

        let fetched = self
            .history
            .fetch_history(
                &request.key.symbol,
                request.key.timeframe,
                request.count,
                on_progress,
            )
            .await?;
        let fetched_count = fetched.len();

        // 더 많이 받았을 때만 교체
        if fetched_count > cached {
            self.cache.replace(&request.key, fetched.clone()).await?;
            info!(
                key = %request.key,
                previous = cached,
                stored = fetched_count,
                "캐시 업데이트 완료"
            );

            return Ok(SyncOutcome {
                state,
                candles: fetched,
                fetched: Some(fetched_count),
                written: true,
            });
        }

        // 업스트림이 기존 캐시보다 적게 줌: 캐시 유지, 기존 시계열 반환
        let candles = entry.map(|e| e.candles).unwrap_or_default();
        warn!(
            key = %request.key,
            cached = cached,
            fetched = fetched_count,
            requested = request.count,
            "업스트림 데이터가 캐시보다 많지 않음, 기존 캐시 유지"
        );

        Ok(SyncOutcome {
            state,
            candles,
            fetched: Some(fetched_count),
            written: false,
        })
    }

    fn check_bounds(&self, count: usize) -> Result<()> {
        if count < self.min_count || count > self.max_count {
            return Err(DataError::InvalidRequest(format!(
                "요청 캔들 수 {}는 {}..={} 범위를 벗어납니다",
                count, self.min_count, self.max_count
            )));
        }
        Ok(())
    }

    /// 키별 Lock 조회 또는 생성.
    async fn get_or_create_lock(&self, key: &SeriesKey) -> Arc<Mutex<()>> {
        let locks = self.sync_locks.read().await;
        if let Some(lock) = locks.get(key) {
            return lock.clone();
        }
        drop(locks);

        let mut locks = self.sync_locks.write().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 사용이 끝난 Lock 반환. 대기 중인 요청이 없으면 맵에서 제거합니다.
    async fn release_lock(&self, key: &SeriesKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.sync_locks.write().await;
        drop(lock);

        // 맵만 참조하고 있으면 다른 요청이 없음
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}
