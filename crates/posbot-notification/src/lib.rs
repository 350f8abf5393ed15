//! # PosBot Notification
//!
//! 텔레그램 메시지 전송 및 리포트 포맷팅.
//!
//! - `MessageSender` trait: 아웃바운드 메시지 전송 seam
//! - `TelegramSender`: sendMessage API 호출 (타임아웃 + 제한된 재시도)
//! - `report`: 포지션/주문 스냅샷을 텍스트 리포트로 변환하는 순수 함수

pub mod report;
pub mod telegram;
pub mod types;

pub use report::{format_help, format_status};
pub use telegram::{TelegramConfig, TelegramSender};
pub use types::*;
