//! 업스트림 시세 API 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - PageFetcher trait: 시간 구간 하나의 캔들 페이지 조회
//! - Binance USDⓈ-M 선물 캔들 커넥터
//! - 업스트림 에러 분류

pub mod connector;
pub mod error;
pub mod traits;

pub use connector::binance::{BinanceFuturesClient, BinanceFuturesConfig};
pub use error::*;
pub use traits::*;
