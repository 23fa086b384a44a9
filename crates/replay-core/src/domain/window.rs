//! 배치 요청 시간 구간.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 업스트림 한 번의 요청이 다루는 시간 구간.
///
/// `start_time`과 `end_time`은 밀리초 epoch이며 양 끝을 포함합니다.
/// `end_time`은 구간의 마지막 캔들 시작 시각이므로
/// `end_time - start_time == (limit - 1) * timeframe_ms` 입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// 첫 캔들 시작 시각 (밀리초)
    pub start_time: i64,
    /// 마지막 캔들 시작 시각 (밀리초)
    pub end_time: i64,
    /// 이 구간에 포함되는 캔들 슬롯 수
    pub limit: usize,
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}] x{}", self.start_time, self.end_time, self.limit)
    }
}
