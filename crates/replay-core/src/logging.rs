//! tracing 기반 로깅 초기화.
//!
//! 설정 파일의 `[logging]` 섹션을 기본으로 하고, 환경 변수가 있으면 우선합니다.
//! - `RUST_LOG`: 레벨 필터 (예: `info`, `replay_data=debug`)
//! - `LOG_FORMAT`: 출력 형식 (`pretty`, `json`, `compact`)

use crate::config::LoggingConfig;
use crate::error::{ReplayError, ReplayResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 개발용 여러 줄 형식
    #[default]
    Pretty,
    /// 로그 수집기용 JSON 한 줄 형식
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 최종 로깅 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` 지시어
    pub level: String,
    pub format: LogFormat,
    /// 파일명/줄 번호 포함 여부
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_file: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// 설정 파일 값에 `RUST_LOG`/`LOG_FORMAT` 환경 변수를 덮어써서 생성합니다.
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self::resolve(
            settings,
            std::env::var("RUST_LOG").ok(),
            std::env::var("LOG_FORMAT").ok(),
        )
    }

    /// 우선순위: 환경 변수 > 설정 파일 > `Pretty`.
    ///
    /// 빈 값이나 알 수 없는 형식 문자열은 무시합니다.
    fn resolve(
        settings: &LoggingConfig,
        rust_log: Option<String>,
        log_format: Option<String>,
    ) -> Self {
        let level = rust_log
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| settings.level.clone());

        let format = log_format
            .and_then(|v| v.parse().ok())
            .or_else(|| settings.format.parse().ok())
            .unwrap_or_default();

        Self {
            level,
            format,
            ..Default::default()
        }
    }
}

/// 전역 subscriber 설치.
///
/// # Errors
/// 레벨 지시어가 잘못되었거나 이미 초기화되었으면 `ReplayError::Config`.
pub fn init_logging(config: LogConfig) -> ReplayResult<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ReplayError::Config(format!("로그 레벨 '{}': {}", config.level, e)))?;

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| ReplayError::Config(format!("로깅 초기화 실패: {}", e)))?;

    tracing::debug!(level = %config.level, format = ?config.format, "로깅 초기화");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: &str, format: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: format.to_string(),
        }
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("fancy".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_settings_used_without_env() {
        let config = LogConfig::resolve(&settings("replay_data=debug", "compact"), None, None);
        assert_eq!(config.level, "replay_data=debug");
        assert_eq!(config.format, LogFormat::Compact);

        let config = LogConfig::resolve(&settings("info", "fancy"), None, None);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_overrides_settings() {
        let config = LogConfig::resolve(
            &settings("info", "pretty"),
            Some("warn".to_string()),
            Some("json".to_string()),
        );
        assert_eq!(config, LogConfig::new("warn").with_format(LogFormat::Json));

        // 잘못된 환경 값은 설정 파일 값으로 대체
        let config = LogConfig::resolve(
            &settings("info", "compact"),
            Some("  ".to_string()),
            Some("xml".to_string()),
        );
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_from_settings_reads_log_format() {
        // 이 crate에서 LOG_FORMAT을 건드리는 테스트는 이것 하나뿐
        std::env::set_var("LOG_FORMAT", "json");
        let config = LogConfig::from_settings(&settings("info", "pretty"));
        std::env::remove_var("LOG_FORMAT");

        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let err = init_logging(LogConfig::new("replay_data=loud")).unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
    }
}
