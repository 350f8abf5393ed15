//! Binance USDⓈ-M 선물 거래소 연동.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 요청 서명 (정규 쿼리 문자열 + HMAC-SHA256)
//! - 서명된 REST 클라이언트 (포지션/오픈 주문/티커 조회)
//! - 제한된 재시도 및 타임아웃 처리
//! - 에러 분류 (네트워크/인증/응답 파싱)

pub mod client;
pub mod error;
pub mod signer;

pub use client::{FuturesClient, FuturesConfig, PositionReader};
pub use error::*;
pub use signer::{canonical_query, sign};
