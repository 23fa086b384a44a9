//! # Replay Core
//!
//! 과거 캔들 수집/캐시 엔진의 핵심 도메인 타입을 제공합니다.
//!
//! - OHLCV 캔들 및 시계열 키
//! - 타임프레임 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
