//! CLI 명령어 구현 모듈.

pub mod cache;
pub mod plan;
pub mod sync;

use anyhow::{anyhow, Context, Result};
use replay_core::{AppConfig, CacheBackend, Timeframe};
use replay_data::{
    HistoryFetcher, MemoryStore, RedisSeriesStore, RedisStoreConfig, SeriesCache, SyncCoordinator,
};
use replay_exchange::{BinanceFuturesClient, BinanceFuturesConfig};
use std::sync::Arc;
use tracing::info;

/// 타임프레임 문자열 파싱 ("5m", "1h" 등).
pub fn parse_timeframe(interval: &str) -> Result<Timeframe> {
    interval.parse::<Timeframe>().map_err(|_| {
        let supported: Vec<String> = Timeframe::ALL.iter().map(|tf| tf.to_string()).collect();
        anyhow!(
            "Invalid interval: {}. Supported: {}",
            interval,
            supported.join(", ")
        )
    })
}

/// 설정된 저장소로 캐시 생성.
pub async fn build_cache(config: &AppConfig) -> Result<SeriesCache> {
    let cache = match config.cache.backend {
        CacheBackend::Memory => {
            info!("메모리 캐시 사용");
            SeriesCache::new(Arc::new(MemoryStore::new()))
        }
        CacheBackend::Redis => {
            let store = RedisSeriesStore::connect(&RedisStoreConfig::from(&config.cache))
                .await
                .context("Redis 캐시 연결 실패")?;
            SeriesCache::new(Arc::new(store))
        }
    };
    Ok(cache)
}

/// 설정 기반 과거 데이터 수집기 생성.
pub fn build_history(config: &AppConfig) -> Result<HistoryFetcher> {
    let client = BinanceFuturesClient::new(BinanceFuturesConfig::from(&config.upstream))
        .context("업스트림 클라이언트 생성 실패")?;

    Ok(HistoryFetcher::new(Arc::new(client))
        .with_max_page_size(config.upstream.max_page_size)
        .with_request_delay(config.fetch.request_delay()))
}

/// 설정 기반 동기화 코디네이터 생성.
pub async fn build_coordinator(config: &AppConfig) -> Result<SyncCoordinator> {
    let cache = build_cache(config).await?;
    let history = build_history(config)?;

    Ok(SyncCoordinator::new(cache, history)
        .with_count_bounds(config.fetch.min_candles, config.fetch.max_candles))
}
