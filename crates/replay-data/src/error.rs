//! 데이터 모듈 오류 타입.

use replay_core::{Candle, ReplayError};
use replay_exchange::ExchangeError;
use thiserror::Error;

/// 데이터 수집/캐시 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 업스트림 API 오류 (네트워크, 비정상 상태, 잘못된 응답)
    #[error("Upstream error: {0}")]
    Upstream(#[from] ExchangeError),

    /// 캐시에 저장된 캔들보다 많은 tail 요청
    #[error("Insufficient cache: requested {requested}, available {available}")]
    InsufficientCache { requested: usize, available: usize },

    /// 캐시 쓰기 실패.
    ///
    /// 새로 가져온 시계열은 `candles`에 담겨 있으며 캐시는 이전 상태를 유지합니다.
    #[error("Cache write error: {message}")]
    CacheWrite {
        message: String,
        candles: Vec<Candle>,
    },

    /// 캐시 읽기/연결 오류
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 잘못된 요청
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DataError {
    /// 캐시 쓰기 실패 시 함께 전달된 시계열을 꺼냅니다.
    pub fn into_best_effort(self) -> Option<Vec<Candle>> {
        match self {
            DataError::CacheWrite { candles, .. } => Some(candles),
            _ => None,
        }
    }

    /// 호출자가 전체 동기화를 다시 시도해볼 만한 오류인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Upstream(e) => e.is_retryable(),
            DataError::CacheWrite { .. } | DataError::CacheError(_) => true,
            _ => false,
        }
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        DataError::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<ReplayError> for DataError {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Serialization(msg) => DataError::SerializationError(msg),
            other => DataError::InvalidRequest(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_best_effort_only_for_cache_write() {
        let candle = Candle::new(60, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1));
        let err = DataError::CacheWrite {
            message: "readonly".to_string(),
            candles: vec![candle.clone()],
        };
        assert!(err.is_retryable());
        assert_eq!(err.into_best_effort(), Some(vec![candle]));

        let err = DataError::InsufficientCache {
            requested: 10,
            available: 5,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.into_best_effort(), None);
    }

    #[test]
    fn test_upstream_retryable_passthrough() {
        let err: DataError = ExchangeError::RateLimited.into();
        assert!(err.is_retryable());
        let err: DataError = ExchangeError::SymbolNotFound("X".to_string()).into();
        assert!(!err.is_retryable());
    }
}
