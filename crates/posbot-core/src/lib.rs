//! # PosBot Core
//!
//! 포지션 리포트 봇의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 포지션 스냅샷 및 방향 판별
//! - 오픈 주문 표시 라인
//! - 시장 구분 (현물/선물)
//! - 로깅 인프라

pub mod logging;
pub mod types;

pub use logging::*;
pub use types::*;
