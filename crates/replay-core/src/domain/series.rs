//! 캔들 시계열 식별자.

use crate::error::{ReplayError, ReplayResult};
use crate::types::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt;

/// (심볼, 타임프레임) 쌍으로 이루어진 시계열 키.
///
/// 심볼은 생성 시 공백 제거 후 대문자로 정규화됩니다 (예: "btcusdt" → "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    /// 새 시계열 키를 생성합니다.
    ///
    /// # Errors
    /// 심볼이 비어 있으면 `ReplayError::InvalidInput`을 반환합니다.
    pub fn new(symbol: &str, timeframe: Timeframe) -> ReplayResult<Self> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ReplayError::InvalidInput("심볼이 비어 있습니다".to_string()));
        }
        Ok(Self { symbol, timeframe })
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.timeframe)
    }
}

/// 업스트림 형식으로 심볼 정규화 ("btc/usdt " → "BTCUSDT").
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().replace('/', "").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_key_normalizes_symbol() {
        let key = SeriesKey::new(" btc/usdt ", Timeframe::M15).unwrap();
        assert_eq!(key.symbol, "BTCUSDT");
        assert_eq!(key.to_string(), "BTCUSDT:15m");
    }

    #[test]
    fn test_series_key_rejects_empty_symbol() {
        assert!(SeriesKey::new("   ", Timeframe::H1).is_err());
    }
}
