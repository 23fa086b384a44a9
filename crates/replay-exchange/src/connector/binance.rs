//! Binance USDⓈ-M 선물 캔들 커넥터.
//!
//! 공개 `GET /klines` 엔드포인트로 시간 구간 하나의 캔들을 조회합니다.
//! 인증이 필요 없는 공개 API만 사용합니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::PageFetcher;
use async_trait::async_trait;
use replay_core::{normalize_symbol, Candle, TimeWindow, Timeframe, UpstreamConfig};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};

/// 캔들 조회 엔드포인트.
const KLINES_ENDPOINT: &str = "/klines";

/// 캔들 행의 최소 필드 수 (open time, open, high, low, close, volume).
const MIN_ROW_LEN: usize = 6;

// ============================================================================
// 설정
// ============================================================================

/// Binance 선물 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct BinanceFuturesConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for BinanceFuturesConfig {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

impl From<&UpstreamConfig> for BinanceFuturesConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl BinanceFuturesConfig {
    /// 기본 URL 변경 (테스트 서버 등).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

/// Binance 선물 캔들 클라이언트.
pub struct BinanceFuturesClient {
    config: BinanceFuturesConfig,
    client: Client,
}

impl BinanceFuturesClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceFuturesConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// 공개 API 요청 (인증 불필요). 파라미터는 URL 인코딩됩니다.
    async fn public_get(&self, endpoint: &str, params: &[(&str, String)]) -> ExchangeResult<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        debug!(url = %url, params = ?params, "GET");

        let response = self.client.get(&url).query(params).send().await?;

        Self::handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response(response: reqwest::Response) -> ExchangeResult<Value> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            Err(ExchangeError::RateLimited)
        } else if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            // 에러 응답 파싱 시도
            Err(Self::map_error_code(error.code, &error.msg))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> ExchangeError {
        match code {
            -1003 => ExchangeError::RateLimited,
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            -1100 | -1120 | -1130 => ExchangeError::InvalidParameter(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }
}

#[async_trait]
impl PageFetcher for BinanceFuturesClient {
    async fn fetch_page(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: &TimeWindow,
    ) -> ExchangeResult<Vec<Candle>> {
        let body = self
            .public_get(
                KLINES_ENDPOINT,
                &[
                    ("symbol", normalize_symbol(symbol)),
                    ("interval", timeframe.to_binance_interval().to_string()),
                    ("startTime", window.start_time.to_string()),
                    ("endTime", window.end_time.to_string()),
                    ("limit", window.limit.to_string()),
                ],
            )
            .await?;

        parse_klines(&body)
    }
}

// ============================================================================
// 응답 파싱
// ============================================================================

/// `[[openTimeMs, "open", "high", "low", "close", "volume", ...], ...]` 응답을 변환.
///
/// 숫자 필드는 문자열과 JSON 숫자 모두 허용합니다.
pub fn parse_klines(body: &Value) -> ExchangeResult<Vec<Candle>> {
    let rows = body
        .as_array()
        .ok_or_else(|| ExchangeError::ParseError("캔들 응답이 배열이 아닙니다".to_string()))?;

    rows.iter().enumerate().map(|(i, row)| parse_row(i, row)).collect()
}

fn parse_row(index: usize, row: &Value) -> ExchangeResult<Candle> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= MIN_ROW_LEN)
        .ok_or_else(|| ExchangeError::ParseError(format!("{}번째 캔들 행 형식 오류: {}", index, row)))?;

    let open_time_ms = parse_millis(&fields[0])
        .ok_or_else(|| ExchangeError::ParseError(format!("{}번째 캔들 시간 오류: {}", index, fields[0])))?;

    let candle = Candle {
        // 밀리초 → 초
        time: open_time_ms.div_euclid(1000),
        open: parse_decimal(index, "open", &fields[1])?,
        high: parse_decimal(index, "high", &fields[2])?,
        low: parse_decimal(index, "low", &fields[3])?,
        close: parse_decimal(index, "close", &fields[4])?,
        volume: parse_decimal(index, "volume", &fields[5])?,
    };

    if !candle.is_consistent() {
        return Err(ExchangeError::ParseError(format!(
            "{}번째 캔들 OHLC 관계 오류 (time={})",
            index, candle.time
        )));
    }

    Ok(candle)
}

fn parse_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_decimal(index: usize, field: &str, value: &Value) -> ExchangeResult<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ExchangeError::ParseError(format!("{}번째 캔들 {} 값 오류: {}", index, field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_klines_converts_units() {
        let body = json!([
            [1704067200123i64, "42000.10", "42100.00", "41950.5", "42050", "12.345", 1704067499999i64, "0", 10, "0", "0", "0"],
            [1704067500000i64, 42050, 42060.5, 42000, 42010, 3, 1704067799999i64]
        ]);

        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1_704_067_200);
        assert_eq!(candles[0].open, dec!(42000.10));
        assert_eq!(candles[0].low, dec!(41950.5));
        assert_eq!(candles[0].volume, dec!(12.345));
        assert_eq!(candles[1].time, 1_704_067_500);
        assert_eq!(candles[1].high, dec!(42060.5));
    }

    #[test]
    fn test_parse_klines_rejects_malformed() {
        assert!(matches!(
            parse_klines(&json!({"code": -1})),
            Err(ExchangeError::ParseError(_))
        ));
        assert!(matches!(
            parse_klines(&json!([[1704067200000i64, "1", "2"]])),
            Err(ExchangeError::ParseError(_))
        ));
        assert!(matches!(
            parse_klines(&json!([[1704067200000i64, "abc", "2", "1", "1", "1"]])),
            Err(ExchangeError::ParseError(_))
        ));
        // high < open
        assert!(matches!(
            parse_klines(&json!([[1704067200000i64, "3", "2", "1", "1.5", "1"]])),
            Err(ExchangeError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_klines(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_map_error_code() {
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-1121, "Invalid symbol."),
            ExchangeError::SymbolNotFound(_)
        ));
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-1003, "Too many requests"),
            ExchangeError::RateLimited
        ));
        assert!(matches!(
            BinanceFuturesClient::map_error_code(-4000, "other"),
            ExchangeError::ApiError { code: -4000, .. }
        ));
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = BinanceFuturesConfig::default().with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.base_url, "http://127.0.0.1:1234");
    }
}
