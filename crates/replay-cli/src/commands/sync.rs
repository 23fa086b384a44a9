//! 캔들 동기화 명령어.
//!
//! 캐시를 확인하고 필요하면 업스트림에서 수집한 뒤, 결과를 요약 출력하거나 CSV로 저장합니다.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use replay_core::{AppConfig, Candle, Timeframe};
use replay_data::{DataError, SyncCoordinator, SyncOutcome};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// 동기화 설정.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: usize,
    /// CSV 출력 경로 (없으면 요약만 출력)
    pub output_path: Option<String>,
}

/// 동기화 결과.
#[derive(Debug)]
pub enum SyncReport {
    /// 정상 동기화
    Synced(SyncOutcome),
    /// 수집은 성공했으나 캐시 저장 실패
    Unsaved(Vec<Candle>),
}

impl SyncReport {
    pub fn candles(&self) -> &[Candle] {
        match self {
            SyncReport::Synced(outcome) => &outcome.candles,
            SyncReport::Unsaved(candles) => candles,
        }
    }
}

/// 동기화 실행.
///
/// 캐시 저장에 실패해도 수집한 시계열은 출력하고 경고만 남깁니다.
pub async fn run_sync(app: &AppConfig, config: SyncConfig) -> Result<SyncReport> {
    let coordinator = super::build_coordinator(app).await?;
    let report = sync_with_progress(&coordinator, &config).await?;

    print_summary(&config, &report);

    if let Some(path) = &config.output_path {
        let written = write_csv(path, report.candles())?;
        info!(path = %path, count = written, "CSV 저장 완료");
        println!("저장 위치: {}", path);
    }

    Ok(report)
}

async fn sync_with_progress(
    coordinator: &SyncCoordinator,
    config: &SyncConfig,
) -> Result<SyncReport> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .context("진행 표시줄 템플릿 오류")?
            .progress_chars("#>-"),
    );

    let progress_bar = pb.clone();
    let on_progress = move |batch: usize, total: usize, message: &str| {
        progress_bar.set_length(total as u64);
        progress_bar.set_position(batch as u64);
        progress_bar.set_message(message.to_string());
    };

    let result = coordinator
        .sync_detailed(
            &config.symbol,
            config.timeframe,
            config.count,
            Some(&on_progress),
        )
        .await;

    match result {
        Ok(outcome) => {
            pb.finish_and_clear();
            Ok(SyncReport::Synced(outcome))
        }
        Err(DataError::CacheWrite { message, candles }) => {
            pb.finish_and_clear();
            warn!(error = %message, "캐시 저장 실패, 수집한 데이터만 반환");
            Ok(SyncReport::Unsaved(candles))
        }
        Err(e) => {
            pb.abandon();
            Err(e).with_context(|| format!("{} {} 동기화 실패", config.symbol, config.timeframe))
        }
    }
}

fn print_summary(config: &SyncConfig, report: &SyncReport) {
    let candles = report.candles();
    println!(
        "\n{} {} 캔들 {}개 (요청 {}개)",
        config.symbol.to_uppercase(),
        config.timeframe,
        candles.len(),
        config.count
    );

    match report {
        SyncReport::Synced(outcome) => match outcome.fetched {
            Some(fetched) if outcome.written => {
                println!("[{}] 업스트림 수집 {}개, 캐시 갱신됨", outcome.state, fetched)
            }
            Some(fetched) => println!("[{}] 업스트림 수집 {}개, 캐시 유지", outcome.state, fetched),
            None => println!("[{}] 캐시에서 반환", outcome.state),
        },
        SyncReport::Unsaved(_) => println!("캐시 저장 실패: 이번 결과는 저장되지 않았습니다"),
    }

    if let (Some(first), Some(last)) = (candles.first(), candles.last()) {
        println!("구간: {} ~ {}", format_time(first), format_time(last));
    }
}

fn format_time(candle: &Candle) -> String {
    candle
        .open_time()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| candle.time.to_string())
}

/// 캔들을 CSV로 저장. 기록한 행 수를 반환합니다.
pub fn write_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path).with_context(|| format!("파일 생성 실패: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // CSV 헤더 작성
    writeln!(writer, "time,open,high,low,close,volume")?;

    for candle in candles {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            candle.time, candle.open, candle.high, candle.low, candle.close, candle.volume
        )?;
    }

    writer.flush()?;
    Ok(candles.len())
}
