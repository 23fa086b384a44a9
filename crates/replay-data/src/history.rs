//! 과거 캔들 수집기.
//!
//! 배치 계획에 따라 업스트림 페이지를 순서대로 하나씩 요청하고,
//! 결과를 합쳐 중복 제거 · 정렬 · 개수 맞춤을 수행합니다.
//!
//! # 동작 흐름
//!
//! ```text
//! plan(count) ──► page 0 ──(delay)──► page 1 ──(delay)──► ... ──► page N-1
//!                                                                   │
//!                               concat ◄────────────────────────────┘
//!                                 │
//!                       sort + dedup (time) ──► 최신 count개
//! ```

use crate::error::Result;
use crate::planner::{BatchPlanner, DEFAULT_MAX_PAGE_SIZE};
use chrono::Utc;
use replay_core::{Candle, TimeWindow, Timeframe};
use replay_exchange::PageFetcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// 배치 요청 간 기본 딜레이.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);

/// 진행 상황 콜백 `(batch_index, total_batches, message)`.
///
/// `batch_index`는 1부터 시작합니다. 관찰 용도로만 호출되며 흐름에 영향을 주지 않습니다.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize, &str) + Send + Sync);

/// 현재 시각(밀리초)을 반환하는 시계.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// 과거 캔들 수집기.
#[derive(Clone)]
pub struct HistoryFetcher {
    fetcher: Arc<dyn PageFetcher>,
    planner: BatchPlanner,
    request_delay: Duration,
    clock: Clock,
}

impl HistoryFetcher {
    /// 기본 설정(페이지 1500개, 딜레이 100ms)으로 생성.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            planner: BatchPlanner::new(DEFAULT_MAX_PAGE_SIZE),
            request_delay: DEFAULT_REQUEST_DELAY,
            clock: system_clock,
        }
    }

    /// 요청당 최대 캔들 수 설정.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.planner = BatchPlanner::new(max_page_size);
        self
    }

    /// 배치 요청 간 딜레이 설정 (테스트에서는 0).
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// 시계 교체.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// 현재 시각 기준으로 `count`개 캔들을 가져올 구간 목록 (오래된 순서).
    pub fn plan(&self, timeframe: Timeframe, count: usize) -> Vec<TimeWindow> {
        // 현재 형성 중인 캔들의 시작 시각: 마지막 구간은 직전에 마감된 캔들에서 끝남
        let end = timeframe.bucket_start_ms((self.clock)());
        self.planner.plan(count, timeframe, end)
    }

    /// 최근 `count`개 캔들 수집.
    ///
    /// 한 배치라도 실패하면 즉시 오류를 반환하며 부분 결과는 돌려주지 않습니다.
    /// 업스트림에 과거 데이터가 부족하면 `count`보다 적게 반환될 수 있습니다.
    #[instrument(skip(self, on_progress))]
    pub async fn fetch_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<Candle>> {
        let windows = self.plan(timeframe, count);
        let total = windows.len();

        debug!(
            symbol = symbol,
            timeframe = %timeframe,
            count = count,
            batches = total,
            "과거 데이터 수집 시작"
        );

        // count는 호출자 입력이므로 미리 할당하지 않음
        let mut all = Vec::new();

        for (i, window) in windows.iter().enumerate() {
            let page = self.fetcher.fetch_page(symbol, timeframe, window).await?;

            debug!(
                symbol = symbol,
                batch = i + 1,
                total = total,
                window = %window,
                received = page.len(),
                "배치 수신"
            );

            let received = page.len();
            all.extend(page);

            if let Some(progress) = on_progress {
                progress(
                    i + 1,
                    total,
                    &format!("배치 {}/{} 로드 완료 ({}개)", i + 1, total, received),
                );
            }

            // 자체 rate limit: 마지막 배치 뒤에는 대기하지 않음
            if i + 1 < total && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let fetched = all.len();
        let series = finalize_series(all, count);

        if series.len() < count {
            warn!(
                symbol = symbol,
                timeframe = %timeframe,
                requested = count,
                returned = series.len(),
                "업스트림 과거 데이터가 요청보다 적음"
            );
        }

        info!(
            symbol = symbol,
            timeframe = %timeframe,
            batches = total,
            fetched = fetched,
            returned = series.len(),
            "과거 데이터 수집 완료"
        );

        Ok(series)
    }
}

/// 시간순 정렬, 중복 시간 제거(먼저 받은 캔들 유지), 최신 `count`개만 남김.
pub fn finalize_series(mut candles: Vec<Candle>, count: usize) -> Vec<Candle> {
    // 안정 정렬이므로 같은 시간의 캔들은 수신 순서를 유지
    candles.sort_by_key(|c| c.time);
    candles.dedup_by_key(|c| c.time);

    if candles.len() > count {
        candles.drain(..candles.len() - count);
    }

    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use replay_core::is_strictly_ascending;
    use replay_exchange::{ExchangeError, ExchangeResult};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // 2024-01-01 00:07:30 UTC
    fn fixed_clock() -> i64 {
        1_704_067_650_000
    }

    fn candle(time: i64, close: Decimal) -> Candle {
        Candle::new(time, close, close, close, close, dec!(1))
    }

    /// 구간의 모든 슬롯에 캔들을 생성하는 가짜 업스트림.
    struct SlotFetcher {
        calls: AtomicUsize,
        windows: Mutex<Vec<TimeWindow>>,
        fail_on_call: Option<usize>,
        overlap: bool,
    }

    impl SlotFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                windows: Mutex::new(Vec::new()),
                fail_on_call: None,
                overlap: false,
            }
        }
    }

    #[async_trait]
    impl PageFetcher for SlotFetcher {
        async fn fetch_page(
            &self,
            _symbol: &str,
            timeframe: Timeframe,
            window: &TimeWindow,
        ) -> ExchangeResult<Vec<Candle>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.windows.lock().unwrap().push(*window);

            if self.fail_on_call == Some(call) {
                return Err(ExchangeError::ApiError {
                    code: 500,
                    message: "boom".to_string(),
                });
            }

            let step = timeframe.as_millis();
            // 겹침 모드: 이전 구간의 마지막 캔들을 한 번 더 포함
            let start = if self.overlap {
                window.start_time - step
            } else {
                window.start_time
            };

            Ok((0..)
                .map(|i| start + i * step)
                .take_while(|t| *t <= window.end_time)
                .map(|t| candle(t / 1000, Decimal::from(call as i64)))
                .collect())
        }
    }

    fn fetcher_with(upstream: Arc<SlotFetcher>, page: usize) -> HistoryFetcher {
        HistoryFetcher::new(upstream)
            .with_max_page_size(page)
            .with_request_delay(Duration::ZERO)
            .with_clock(fixed_clock)
    }

    #[tokio::test]
    async fn test_fetch_history_batches_and_spacing() {
        let upstream = Arc::new(SlotFetcher::new());
        let history = fetcher_with(upstream.clone(), 100);

        let candles = history
            .fetch_history("BTCUSDT", Timeframe::M5, 250, None)
            .await
            .unwrap();

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
        let limits: Vec<usize> = upstream.windows.lock().unwrap().iter().map(|w| w.limit).collect();
        assert_eq!(limits, vec![50, 100, 100]);

        assert_eq!(candles.len(), 250);
        assert!(candles.windows(2).all(|w| w[1].time - w[0].time == 300));
        // 마지막 캔들은 직전에 마감된 00:00 ~ 00:05 구간
        assert_eq!(candles.last().unwrap().time, 1_704_067_200);
    }

    #[test]
    fn test_plan_ends_at_last_closed_candle() {
        let history = fetcher_with(Arc::new(SlotFetcher::new()), 1500);
        let windows = history.plan(Timeframe::H1, 10);
        assert_eq!(windows.len(), 1);
        // 00:07:30 → 마지막 마감 1시간봉은 전날 23:00
        assert_eq!(windows[0].end_time, 1_704_063_600_000);
        assert_eq!(windows[0].start_time, 1_704_063_600_000 - 9 * 3_600_000);
    }

    #[test]
    fn test_plan_monthly_ends_at_previous_month() {
        let history = fetcher_with(Arc::new(SlotFetcher::new()), 1500);
        let windows = history.plan(Timeframe::MN1, 12);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_time, 1_672_531_200_000); // 2023-01-01
        assert_eq!(windows[0].end_time, 1_701_388_800_000); // 2023-12-01
    }

    #[tokio::test]
    async fn test_huge_count_reaches_upstream_without_preallocating() {
        let upstream = Arc::new(SlotFetcher {
            fail_on_call: Some(0),
            ..SlotFetcher::new()
        });
        let count = 1usize << 40;
        let history = fetcher_with(upstream.clone(), count);

        let err = history
            .fetch_history("BTCUSDT", Timeframe::M1, count, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Upstream(_)));
        assert_eq!(upstream.windows.lock().unwrap()[0].limit, count);
    }

    #[tokio::test]
    async fn test_fetch_history_overlapping_pages_are_deduplicated() {
        let upstream = Arc::new(SlotFetcher {
            overlap: true,
            ..SlotFetcher::new()
        });
        let history = fetcher_with(upstream.clone(), 100);

        let candles = history
            .fetch_history("BTCUSDT", Timeframe::M5, 250, None)
            .await
            .unwrap();

        assert_eq!(candles.len(), 250);
        assert!(is_strictly_ascending(&candles));

        // 겹친 캔들은 먼저 받은 배치(더 오래된 배치) 값을 유지
        let first_of_second_batch = upstream.windows.lock().unwrap()[1].start_time / 1000;
        let kept = candles
            .iter()
            .find(|c| c.time == first_of_second_batch - 300)
            .unwrap();
        assert_eq!(kept.close, dec!(0));
    }

    #[tokio::test]
    async fn test_fetch_history_failure_aborts() {
        let upstream = Arc::new(SlotFetcher {
            fail_on_call: Some(1),
            ..SlotFetcher::new()
        });
        let history = fetcher_with(upstream.clone(), 100);

        let err = history
            .fetch_history("BTCUSDT", Timeframe::M5, 250, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Upstream(_)));
        // 실패 이후 배치는 요청하지 않음
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_progress_reported_after_each_page() {
        let upstream = Arc::new(SlotFetcher::new());
        let history = fetcher_with(upstream, 100);
        let seen = Mutex::new(Vec::new());
        let on_progress = |i: usize, n: usize, msg: &str| {
            seen.lock().unwrap().push((i, n, msg.to_string()));
        };

        history
            .fetch_history("BTCUSDT", Timeframe::M5, 250, Some(&on_progress))
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let indices: Vec<(usize, usize)> = seen.iter().map(|(i, n, _)| (*i, *n)).collect();
        assert_eq!(indices, vec![(1, 3), (2, 3), (3, 3)]);
        assert!(seen[0].2.contains("1/3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_pages() {
        let upstream = Arc::new(SlotFetcher::new());
        let history = HistoryFetcher::new(upstream)
            .with_max_page_size(100)
            .with_request_delay(Duration::from_millis(100))
            .with_clock(fixed_clock);

        let started = tokio::time::Instant::now();
        history
            .fetch_history("BTCUSDT", Timeframe::M5, 250, None)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        // 3개 배치 → 2번 대기
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }

    #[test]
    fn test_finalize_series_trims_to_newest() {
        let candles: Vec<Candle> = (1..=10).map(|t| candle(t * 60, dec!(1))).collect();
        let out = finalize_series(candles, 4);
        let times: Vec<i64> = out.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![420, 480, 540, 600]);
    }

    #[test]
    fn test_finalize_series_keeps_first_duplicate() {
        let input = vec![
            candle(120, dec!(1)),
            candle(60, dec!(2)),
            candle(120, dec!(3)),
        ];
        let out = finalize_series(input, 10);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].time, 60);
        assert_eq!(out[1].close, dec!(1));
    }

    proptest! {
        #[test]
        fn prop_finalize_series_strictly_ascending(
            times in proptest::collection::vec(0i64..500, 0..300),
            count in 0usize..400,
        ) {
            let input: Vec<Candle> = times.iter().map(|t| candle(*t * 60, dec!(1))).collect();
            let mut distinct = times.clone();
            distinct.sort_unstable();
            distinct.dedup();

            let out = finalize_series(input, count);

            prop_assert!(is_strictly_ascending(&out));
            prop_assert_eq!(out.len(), distinct.len().min(count));
            // 최신 count개
            let expected: Vec<i64> = distinct
                .iter()
                .skip(distinct.len().saturating_sub(count))
                .map(|t| t * 60)
                .collect();
            let actual: Vec<i64> = out.iter().map(|c| c.time).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
