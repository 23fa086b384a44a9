//! OHLCV 캔들 데이터.
//!
//! 리플레이/백테스트 차트가 소비하는 표준 캔들 형식입니다.
//! 시간은 UTC 기준 초 단위 epoch이며 타임프레임 구간 시작에 정렬됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간 (초 단위 epoch)
    pub time: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub volume: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 캔들 시작 시간을 `DateTime<Utc>`로 반환합니다.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// `low <= open, close <= high` 관계가 성립하는지 확인합니다.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// 시간이 엄격하게 증가하는(중복 없는) 시계열인지 확인합니다.
pub fn is_strictly_ascending(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].time < w[1].time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(time: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(time, open, high, low, close, dec!(1))
    }

    #[test]
    fn test_consistency() {
        assert!(candle(0, dec!(10), dec!(12), dec!(9), dec!(11)).is_consistent());
        assert!(candle(0, dec!(10), dec!(10), dec!(10), dec!(10)).is_consistent());
        assert!(!candle(0, dec!(13), dec!(12), dec!(9), dec!(11)).is_consistent());
        assert!(!candle(0, dec!(10), dec!(12), dec!(10.5), dec!(11)).is_consistent());
    }

    #[test]
    fn test_direction_and_range() {
        let c = candle(0, dec!(10), dec!(12), dec!(9), dec!(11));
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
        assert_eq!(c.range(), dec!(3));
    }

    #[test]
    fn test_open_time() {
        let c = candle(1_704_067_200, dec!(1), dec!(1), dec!(1), dec!(1));
        let t = c.open_time().unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_strictly_ascending() {
        let a = candle(60, dec!(1), dec!(1), dec!(1), dec!(1));
        let b = candle(120, dec!(1), dec!(1), dec!(1), dec!(1));
        assert!(is_strictly_ascending(&[a.clone(), b.clone()]));
        assert!(!is_strictly_ascending(&[b.clone(), a.clone()]));
        assert!(!is_strictly_ascending(&[a.clone(), a]));
        assert!(is_strictly_ascending(&[]));
    }
}
