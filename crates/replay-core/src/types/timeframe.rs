//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 업스트림 간격 문자열 변환과 배치 계획에 필요한 밀리초 단위 연산을 제공합니다.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 1970-01-01(목요일)부터 첫 월요일(1970-01-05)까지의 오프셋 (밀리초).
const WEEK_ANCHOR_OFFSET_MS: i64 = 4 * 24 * 60 * 60 * 1000;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1분봉
    #[serde(rename = "1m")]
    M1,
    /// 3분봉
    #[serde(rename = "3m")]
    M3,
    /// 5분봉
    #[serde(rename = "5m")]
    M5,
    /// 15분봉
    #[serde(rename = "15m")]
    M15,
    /// 30분봉
    #[serde(rename = "30m")]
    M30,
    /// 1시간봉
    #[serde(rename = "1h")]
    H1,
    /// 2시간봉
    #[serde(rename = "2h")]
    H2,
    /// 4시간봉
    #[serde(rename = "4h")]
    H4,
    /// 6시간봉
    #[serde(rename = "6h")]
    H6,
    /// 8시간봉
    #[serde(rename = "8h")]
    H8,
    /// 12시간봉
    #[serde(rename = "12h")]
    H12,
    /// 일봉
    #[serde(rename = "1d")]
    D1,
    /// 3일봉
    #[serde(rename = "3d")]
    D3,
    /// 주봉
    #[serde(rename = "1w")]
    W1,
    /// 월봉
    #[serde(rename = "1M")]
    MN1,
}

impl Timeframe {
    /// 지원되는 모든 타임프레임.
    pub const ALL: [Timeframe; 15] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::D3,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M3 => Duration::from_secs(3 * 60),
            Timeframe::M5 => Duration::from_secs(5 * 60),
            Timeframe::M15 => Duration::from_secs(15 * 60),
            Timeframe::M30 => Duration::from_secs(30 * 60),
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::H2 => Duration::from_secs(2 * 60 * 60),
            Timeframe::H4 => Duration::from_secs(4 * 60 * 60),
            Timeframe::H6 => Duration::from_secs(6 * 60 * 60),
            Timeframe::H8 => Duration::from_secs(8 * 60 * 60),
            Timeframe::H12 => Duration::from_secs(12 * 60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
            Timeframe::D3 => Duration::from_secs(3 * 24 * 60 * 60),
            Timeframe::W1 => Duration::from_secs(7 * 24 * 60 * 60),
            Timeframe::MN1 => Duration::from_secs(30 * 24 * 60 * 60), // 근사값
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// 이 타임프레임의 밀리초 단위 값을 반환합니다.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    /// 길이가 고정된 타임프레임인지 확인합니다 (월봉은 달마다 길이가 다름).
    pub fn is_fixed_length(&self) -> bool {
        !matches!(self, Timeframe::MN1)
    }

    /// 주어진 시각(밀리초)이 속한 캔들 구간의 시작 시각을 반환합니다.
    ///
    /// 주봉은 월요일 00:00 UTC, 월봉은 매월 1일 00:00 UTC 기준으로 정렬됩니다.
    pub fn bucket_start_ms(&self, ts_ms: i64) -> i64 {
        match self {
            Timeframe::MN1 => month_start_ms(ts_ms).unwrap_or(ts_ms),
            Timeframe::W1 => {
                let step = self.as_millis();
                let shifted = ts_ms - WEEK_ANCHOR_OFFSET_MS;
                shifted - shifted.rem_euclid(step) + WEEK_ANCHOR_OFFSET_MS
            }
            _ => {
                let step = self.as_millis();
                ts_ms - ts_ms.rem_euclid(step)
            }
        }
    }

    /// 구간 시작 시각에서 캔들 `buckets`개만큼 이동한 시각 (음수면 과거 방향).
    ///
    /// 월봉은 달력 기준 월 단위로 이동하므로 `ts_ms`는 월 시작 시각이어야 합니다.
    pub fn shift_ms(&self, ts_ms: i64, buckets: i64) -> i64 {
        let approx = ts_ms.saturating_add(buckets.saturating_mul(self.as_millis()));
        if self.is_fixed_length() {
            return approx;
        }

        // chrono 표현 범위를 벗어나면 30일 근사값으로 대체
        shift_months_ms(ts_ms, buckets).unwrap_or(approx)
    }

    /// 바이낸스 간격 문자열로 변환합니다.
    pub fn to_binance_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::D3 => "3d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1M",
        }
    }

    /// 바이낸스 간격 문자열에서 파싱합니다.
    pub fn from_binance_interval(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tf| tf.to_binance_interval() == s)
    }
}

fn month_start_ms(ts_ms: i64) -> Option<i64> {
    let t = DateTime::<Utc>::from_timestamp_millis(ts_ms)?;
    let start = Utc.with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0).single()?;
    Some(start.timestamp_millis())
}

fn shift_months_ms(ts_ms: i64, months: i64) -> Option<i64> {
    let t = DateTime::<Utc>::from_timestamp_millis(ts_ms)?;
    let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let shifted = if months >= 0 {
        t.checked_add_months(step)?
    } else {
        t.checked_sub_months(step)?
    };
    Some(shifted.timestamp_millis())
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_binance_interval())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_binance_interval(s.trim()).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}
