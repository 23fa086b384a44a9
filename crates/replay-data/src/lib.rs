//! 과거 캔들 수집 및 캐시 동기화.
//!
//! 이 crate는 다음을 제공합니다:
//! - 요청 수를 업스트림 페이지 한도 이하 구간으로 나누는 배치 계획
//! - 구간 순차 수집, 중복 제거, 정렬을 수행하는 과거 데이터 수집기
//! - 메모리 / Redis 저장소 기반 시계열 캐시
//! - 캐시 상태에 따라 수집 여부를 결정하는 동기화 코디네이터

pub mod cache;
pub mod error;
pub mod history;
pub mod planner;
pub mod sync;

pub use error::{DataError, Result};

pub use cache::{
    CacheEntry, CacheMetadata, CacheStats, MemoryStore, RedisSeriesStore, RedisStoreConfig,
    SeriesCache, SeriesStore, TailSlice,
};
pub use history::{finalize_series, HistoryFetcher, ProgressFn, DEFAULT_REQUEST_DELAY};
pub use planner::{BatchPlanner, DEFAULT_MAX_PAGE_SIZE};
pub use sync::{SyncCoordinator, SyncOutcome, SyncRequest, SyncState};
