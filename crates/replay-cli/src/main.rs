//! 캔들 시계열 캐시 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # BTCUSDT 5분봉 최근 1000개 동기화
//! replay sync -s BTCUSDT -i 5m -n 1000
//!
//! # 동기화 후 CSV 저장
//! replay sync -s ethusdt -i 1h -n 2000 -o data/ethusdt_1h.csv
//!
//! # 캐시 상태 확인 / 삭제
//! replay cache stats
//! replay cache remove -s BTCUSDT -i 5m
//! replay cache clear
//!
//! # 요청 구간 미리보기
//! replay plan -i 15m -n 5000
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use replay_cli::commands::{self, cache, plan, sync::SyncConfig};
use replay_core::{init_logging, AppConfig, LogConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "과거 캔들 수집 및 캐시 관리 CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 캔들 동기화 (캐시 우선, 부족하면 업스트림 수집)
    Sync {
        /// 심볼 (예: BTCUSDT)
        #[arg(short, long)]
        symbol: String,

        /// 타임프레임 (1m, 5m, 15m, 1h, 4h, 1d 등)
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// 캔들 수
        #[arg(short = 'n', long, default_value = "1000")]
        count: usize,

        /// CSV 출력 파일 경로
        #[arg(short, long)]
        output: Option<String>,
    },

    /// 캐시 관리
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// 요청 구간 미리보기 (업스트림 호출 없음)
    Plan {
        /// 타임프레임
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// 캔들 수
        #[arg(short = 'n', long, default_value = "1000")]
        count: usize,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// 캐시 통계 및 항목 목록
    Stats,

    /// 시계열 하나 삭제
    Remove {
        /// 심볼
        #[arg(short, long)]
        symbol: String,

        /// 타임프레임
        #[arg(short, long)]
        interval: String,
    },

    /// 전체 삭제
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    // RUST_LOG / LOG_FORMAT 환경 변수가 설정 파일보다 우선
    init_logging(LogConfig::from_settings(&config.logging))?;

    info!(config = %cli.config, backend = ?config.cache.backend, "설정 로드 완료");

    if let Err(e) = run(cli.command, &config).await {
        error!("명령 실패: {:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Sync {
            symbol,
            interval,
            count,
            output,
        } => {
            let timeframe = commands::parse_timeframe(&interval)?;
            let sync_config = SyncConfig {
                symbol,
                timeframe,
                count,
                output_path: output,
            };
            commands::sync::run_sync(config, sync_config).await?;
        }

        Commands::Cache { action } => {
            let series_cache = commands::build_cache(config).await?;
            match action {
                CacheAction::Stats => {
                    cache::show_stats(&series_cache).await?;
                }
                CacheAction::Remove { symbol, interval } => {
                    let timeframe = commands::parse_timeframe(&interval)?;
                    cache::remove_series(&series_cache, &symbol, timeframe).await?;
                }
                CacheAction::Clear => cache::clear_all(&series_cache).await?,
            }
        }

        Commands::Plan { interval, count } => {
            let timeframe = commands::parse_timeframe(&interval)?;
            let history = commands::build_history(config)?;
            plan::show_plan(&history, timeframe, count);
        }
    }

    Ok(())
}
