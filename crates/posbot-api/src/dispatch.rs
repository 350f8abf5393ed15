//! 인바운드 명령어 디스패처.
//!
//! 한 건의 웹훅 호출은 `Received → Validated → Authorized → Routed →
//! Replied` 단계를 거치며, 어느 게이트에서든 탈락하면 응답 없이 조용히
//! 종료됩니다 (미인가 발신자에게 봇의 존재를 확인시켜 주지 않기 위한
//! 의도된 동작). 핸들러 내부의 모든 실패는 이 모듈 최상단에서 잡혀
//! "ERROR" 응답으로 변환됩니다.

use crate::state::AppState;
use posbot_notification::{format_help, format_status, NotificationResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

// ============================================================================
// 인바운드 페이로드
// ============================================================================

/// 텔레그램 웹훅 업데이트.
///
/// 파이프라인이 사용하는 필드만 매핑하며, 누락될 수 있는 필드는 모두
/// `Option`으로 두고 검증은 [`CommandEnvelope::from_update`]에서 합니다.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<IncomingMessage>,
}

/// 인바운드 메시지.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: Option<i64>,
    pub chat: Option<IncomingChat>,
    pub text: Option<String>,
}

/// 채팅 정보. 발신자 식별에는 `chat.username`을 사용합니다.
#[derive(Debug, Deserialize)]
pub struct IncomingChat {
    pub id: Option<i64>,
    pub username: Option<String>,
}

// ============================================================================
// 명령어 봉투
// ============================================================================

/// 검증을 통과한 인바운드 명령어.
///
/// 웹훅 호출마다 새로 만들어지고 응답 전송 후 버려집니다.
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    pub chat_id: i64,
    pub username: String,
    pub text: String,
    pub message_id: i64,
}

impl CommandEnvelope {
    /// 업데이트에서 봉투를 추출합니다.
    ///
    /// chat id, 사용자명, 본문 텍스트, 메시지 ID 중 하나라도 없으면
    /// 명령어가 아닌 것으로 보고 `None`을 반환합니다 (무응답 드랍).
    pub fn from_update(update: TelegramUpdate) -> Option<Self> {
        let message = update.message?;
        let chat = message.chat?;

        Some(Self {
            chat_id: chat.id?,
            username: chat.username?,
            text: message.text?,
            message_id: message.message_id?,
        })
    }
}

// ============================================================================
// 명령어 라우팅
// ============================================================================

/// 봇 명령어.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// 포지션 상태 리포트
    Status,
    /// 도움말
    Help,
}

impl BotCommand {
    /// 텍스트에서 명령어를 파싱합니다.
    ///
    /// 소문자 변환, 공백 제거, 선행 `/` 제거 후 매칭하며,
    /// 알 수 없는 텍스트는 상태 리포트로 라우팅됩니다 (기본 경로).
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        let normalized = normalized.strip_prefix('/').unwrap_or(&normalized);

        match normalized {
            "help" => BotCommand::Help,
            // "status"와 "bot_status" 외의 모든 텍스트도 상태 조회로 폴백
            _ => BotCommand::Status,
        }
    }
}

// ============================================================================
// 파이프라인
// ============================================================================

/// 웹훅 업데이트 한 건을 처리합니다.
///
/// 웹훅 응답과 분리된 백그라운드 태스크에서 실행되며, 어떤 실패도
/// 호출자에게 전파하지 않습니다.
pub async fn process_update(state: Arc<AppState>, update: TelegramUpdate) {
    // Received → Validated
    let Some(envelope) = CommandEnvelope::from_update(update) else {
        debug!("Inbound payload is not a command, dropping");
        return;
    };

    info!(
        chat_id = envelope.chat_id,
        username = %envelope.username,
        text = %envelope.text,
        "Command received"
    );

    // Validated → Authorized
    if !state.is_authorized(&envelope.username) {
        debug!(username = %envelope.username, "Sender not in allow list, dropping");
        return;
    }

    // Authorized → Routed → Replied
    let command = BotCommand::parse(&envelope.text);
    if let Err(e) = run_command(&state, &envelope, command).await {
        error!(
            chat_id = envelope.chat_id,
            username = %envelope.username,
            error = %e,
            "Command handling failed"
        );

        // 최후 방어선: 실패를 사용자에게 고정 텍스트로 알림 (best effort)
        if let Err(e) = state.sender.send_message(envelope.chat_id, "ERROR").await {
            error!(chat_id = envelope.chat_id, error = %e, "Failed to deliver error reply");
        }
    }
}

/// 라우팅된 명령어를 실행하고 응답을 전송합니다.
async fn run_command(
    state: &AppState,
    envelope: &CommandEnvelope,
    command: BotCommand,
) -> NotificationResult<()> {
    let text = match command {
        BotCommand::Status => {
            let position = state.exchange.get_open_position(&state.symbol).await;

            // 포지션이 있을 때만 주문 목록을 조회 (플랫이면 리포트에 쓰이지 않음)
            let orders = match &position {
                Some(p) if !p.is_flat() => state.exchange.get_open_orders(&state.symbol).await,
                _ => Vec::new(),
            };

            format_status(position.as_ref(), &orders)
        }
        BotCommand::Help => format_help(),
    };

    state.sender.send_message(envelope.chat_id, &text).await
}
