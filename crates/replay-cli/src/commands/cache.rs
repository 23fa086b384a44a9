//! 캐시 관리 명령어.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use replay_core::{SeriesKey, Timeframe};
use replay_data::{CacheMetadata, CacheStats, SeriesCache};

/// 캐시 통계와 항목 목록 출력.
pub async fn show_stats(cache: &SeriesCache) -> Result<CacheStats> {
    let stats = cache.stats().await?;
    let entries = cache.keys().await?;

    println!("\n=== 캐시 통계 ===");
    println!("시계열 수: {}", stats.total_keys);
    println!("캔들 수:   {}", stats.total_candles);
    println!("크기(추정): {}", format_bytes(stats.total_approx_size_bytes));

    if !entries.is_empty() {
        println!(
            "\n{:<24} {:>8} {:>10}  {:<16}  {:<16}  {}",
            "KEY", "COUNT", "SIZE", "FIRST", "LAST", "UPDATED"
        );
        for entry in &entries {
            println!("{}", format_row(entry));
        }
    }

    Ok(stats)
}

/// 시계열 하나 삭제.
pub async fn remove_series(cache: &SeriesCache, symbol: &str, timeframe: Timeframe) -> Result<bool> {
    let key = SeriesKey::new(symbol, timeframe)?;
    let removed = cache.remove(&key).await?;

    if removed {
        println!("삭제됨: {}", key);
    } else {
        println!("캐시에 없음: {}", key);
    }

    Ok(removed)
}

/// 전체 캐시 삭제.
pub async fn clear_all(cache: &SeriesCache) -> Result<()> {
    let before = cache.stats().await?.total_keys;
    cache.clear().await?;
    println!("캐시 전체 삭제 완료 ({}개 시계열)", before);
    Ok(())
}

fn format_row(entry: &CacheMetadata) -> String {
    format!(
        "{:<24} {:>8} {:>10}  {:<16}  {:<16}  {}",
        entry.key.to_string(),
        entry.count,
        format_bytes(entry.approx_size_bytes),
        format_secs(entry.first_time),
        format_secs(entry.last_time),
        entry.last_update.format("%Y-%m-%d %H:%M:%S")
    )
}

fn format_secs(time: Option<i64>) -> String {
    time.and_then(|t| Utc.timestamp_opt(t, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
