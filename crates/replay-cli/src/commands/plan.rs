//! 배치 계획 미리보기 명령어.
//!
//! 업스트림에 요청하지 않고 현재 시각 기준 요청 구간만 출력합니다.

use chrono::{TimeZone, Utc};
use replay_core::{TimeWindow, Timeframe};
use replay_data::HistoryFetcher;

/// 구간 목록 계산 후 출력.
pub fn show_plan(history: &HistoryFetcher, timeframe: Timeframe, count: usize) -> Vec<TimeWindow> {
    let windows = history.plan(timeframe, count);

    println!(
        "\n{} 캔들 {}개 → 요청 {}회",
        timeframe,
        count,
        windows.len()
    );
    for (i, window) in windows.iter().enumerate() {
        println!(
            "  #{:<3} {} ~ {}  limit={}",
            i + 1,
            format_millis(window.start_time),
            format_millis(window.end_time),
            window.limit
        );
    }

    windows
}

fn format_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_core::AppConfig;

    #[test]
    fn test_plan_uses_configured_page_size() {
        let mut config = AppConfig::default();
        config.upstream.max_page_size = 1000;
        let history = crate::commands::build_history(&config).unwrap();

        let windows = show_plan(&history, Timeframe::M15, 2500);
        let limits: Vec<usize> = windows.iter().map(|w| w.limit).collect();
        assert_eq!(limits, vec![500, 1000, 1000]);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(1_704_067_200_000), "2024-01-01 00:00");
    }
}
