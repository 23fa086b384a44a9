//! 업스트림 페이지 조회 인터페이스.

use async_trait::async_trait;
use replay_core::{Candle, TimeWindow, Timeframe};

use crate::error::ExchangeResult;

/// 시간 구간 하나에 해당하는 캔들 페이지를 조회하는 trait.
///
/// 구현체는 요청 한 번만 수행하며 재시도하지 않습니다.
/// 반환값은 표준 `Candle` 형식(초 단위 시간, Decimal 가격)이어야 합니다.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 구간 내 캔들 조회.
    ///
    /// # 인자
    /// * `symbol` - 업스트림 심볼 (예: "BTCUSDT")
    /// * `timeframe` - 타임프레임
    /// * `window` - 요청 구간 (밀리초, 양 끝 포함)
    async fn fetch_page(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: &TimeWindow,
    ) -> ExchangeResult<Vec<Candle>>;
}
