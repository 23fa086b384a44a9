//! 업스트림 거래소 에러 타입.

use thiserror::Error;

/// 업스트림 API 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// API 에러 코드 (비정상 HTTP 상태 포함)
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// 파싱/역직렬화 에러 (잘못된 응답 형식)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 심볼을 찾을 수 없음
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// 잘못된 요청 파라미터
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    ///
    /// 수집 엔진 내부에서는 재시도하지 않으며, 호출자가 전체 동기화를
    /// 다시 시도할지 판단할 때 사용합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::NetworkError(_)
            | ExchangeError::RateLimited
            | ExchangeError::Timeout(_) => true,
            ExchangeError::ApiError { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// 권장 재시도 대기 시간(밀리초) 반환.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ExchangeError::RateLimited => Some(60000), // 1분
            ExchangeError::NetworkError(_) => Some(1000),
            ExchangeError::Timeout(_) => Some(500),
            ExchangeError::ApiError { code, .. } if *code >= 500 => Some(2000),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::NetworkError(err.to_string())
        } else if err.is_decode() {
            ExchangeError::ParseError(err.to_string())
        } else {
            ExchangeError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
