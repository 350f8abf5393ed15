//! 애플리케이션 공유 상태.
//!
//! 시작 시점에 구성된 뒤 읽기 전용으로 모든 동시 요청에 공유됩니다.
//! 가변 공유 상태가 없으므로 잠금이 필요하지 않습니다.

use posbot_exchange::PositionReader;
use posbot_notification::MessageSender;
use std::sync::Arc;

/// 웹훅 서버의 공유 상태.
pub struct AppState {
    /// 거래소 읽기 클라이언트
    pub exchange: Arc<dyn PositionReader>,
    /// 아웃바운드 메시지 전송기
    pub sender: Arc<dyn MessageSender>,
    /// 명령어 사용이 허가된 사용자명 목록
    pub allowed_users: Vec<String>,
    /// 조회 대상 심볼
    pub symbol: String,
}

impl AppState {
    /// 새 상태를 생성합니다.
    pub fn new(
        exchange: Arc<dyn PositionReader>,
        sender: Arc<dyn MessageSender>,
        allowed_users: Vec<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            sender,
            allowed_users,
            symbol: symbol.into(),
        }
    }

    /// 사용자명이 허가 목록에 있는지 확인합니다.
    pub fn is_authorized(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == username)
    }
}
