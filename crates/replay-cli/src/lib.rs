//! 캔들 시계열 CLI 도구.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 캐시 동기화 및 CSV 내보내기
//! - 캐시 상태 조회/삭제
//! - 배치 계획 미리보기

pub mod commands;
