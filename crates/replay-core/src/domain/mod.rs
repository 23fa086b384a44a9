//! 도메인 모델.
//!
//! - `Candle` - OHLCV 캔들
//! - `SeriesKey` - (심볼, 타임프레임) 캐시 키
//! - `TimeWindow` - 배치 요청 구간

mod candle;
mod series;
mod window;

pub use candle::*;
pub use series::*;
pub use window::*;
