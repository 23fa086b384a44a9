//! 배치 계획.
//!
//! 요청한 캔들 수를 업스트림 페이지 한도 이하의 시간 구간들로 나눕니다.
//! `now`에서 과거 방향으로 걸어가며 구간을 잘라내고, 결과는 오래된 순서입니다.
//! 월봉은 달력 기준 월 단위로 걸어갑니다.
//!
//! ```text
//!  total = 250, page = 100
//!
//!  |<-- 50 -->|<------ 100 ------>|<------ 100 ------>| now
//!   window 0    window 1            window 2
//! ```

use replay_core::{TimeWindow, Timeframe};
use std::collections::VecDeque;

/// 업스트림 요청당 최대 캔들 수 (Binance 선물 klines 한도).
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1500;

/// 배치 계획기.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
    max_page_size: usize,
}

impl Default for BatchPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGE_SIZE)
    }
}

impl BatchPlanner {
    /// 새 계획기 생성. 페이지 크기는 최소 1입니다.
    pub fn new(max_page_size: usize) -> Self {
        Self {
            max_page_size: max_page_size.max(1),
        }
    }

    /// 페이지 크기 한도.
    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// 구간 목록 계산.
    ///
    /// 각 구간의 `end_time`은 잘라낸 경계에서 한 캔들 뒤로 물러나
    /// 다음 구간의 첫 캔들과 겹치지 않습니다.
    ///
    /// # 인자
    /// - `total_count`: 필요한 총 캔들 수
    /// - `timeframe`: 캔들 간격
    /// - `now`: 계획의 끝 경계 (밀리초, 구간 시작 시각)
    pub fn plan(&self, total_count: usize, timeframe: Timeframe, now: i64) -> Vec<TimeWindow> {
        let mut windows = VecDeque::new();
        let mut remaining = total_count;
        let mut end_time = now;

        while remaining > 0 {
            let batch_size = remaining.min(self.max_page_size);
            let start_time = timeframe.shift_ms(end_time, -(batch_size as i64));

            windows.push_front(TimeWindow {
                start_time,
                end_time: timeframe.shift_ms(end_time, -1),
                limit: batch_size,
            });

            end_time = start_time;
            remaining -= batch_size;
        }

        windows.into()
    }
}
