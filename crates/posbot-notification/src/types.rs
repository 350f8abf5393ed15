//! 알림 타입 및 trait 정의.

use async_trait::async_trait;
use thiserror::Error;

/// 알림 관련 에러.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 네트워크/타임아웃 에러
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 전송 실패 (비정상 상태 코드 또는 응답 해석 불가)
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// 알림 작업을 위한 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 아웃바운드 메시지 전송 인터페이스.
///
/// 디스패처가 의존하는 seam으로, 테스트에서 모킹됩니다.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// 지정한 채팅으로 텍스트 메시지를 전송합니다.
    async fn send_message(&self, chat_id: i64, text: &str) -> NotificationResult<()>;
}
