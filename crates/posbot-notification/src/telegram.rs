//! 텔레그램 메시지 전송.
//!
//! Telegram Bot API의 `sendMessage`를 호출합니다. 짧은 타임아웃과
//! 제한된 재시도를 적용하며, 응답 본문은 파싱 성공 여부 외에는
//! 무시합니다.

use crate::types::{MessageSender, NotificationError, NotificationResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// 텔레그램 전송 설정.
///
/// # 보안
/// - `Debug` 구현은 봇 토큰을 마스킹합니다.
#[derive(Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: SecretString,
    /// API 기본 URL
    pub api_base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 최대 전송 시도 횟수
    pub max_attempts: u32,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"***REDACTED***")
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_secs: 3,
            max_attempts: 2,
        }
    }

    /// API 기본 URL 교체 (테스트용).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    ///
    /// `TELEGRAM_BOT_TOKEN`이 필요합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        Some(Self::new(SecretString::from(bot_token)))
    }
}

/// 텔레그램 메시지 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    /// sendMessage 1회 호출.
    async fn try_send(&self, url: &str, params: &serde_json::Value) -> NotificationResult<()> {
        let response = self
            .client
            .post(url)
            .json(params)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        // 본문은 파싱 가능 여부만 확인하고 버림
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, chat_id: i64, text: &str) -> NotificationResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base_url,
            self.config.bot_token.expose_secret()
        );
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let mut last_error = None;
        for attempt in 1..=self.config.max_attempts {
            match self.try_send(&url, &params).await {
                Ok(()) => {
                    debug!(chat_id = chat_id, "Telegram message sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        chat_id = chat_id,
                        attempt = attempt,
                        error = %e,
                        "Telegram send attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| NotificationError::SendFailed("no attempts made".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sender(base_url: &str) -> TelegramSender {
        let config = TelegramConfig::new(SecretString::from("test-token".to_string()))
            .with_api_base_url(base_url);
        TelegramSender::new(config)
    }

    #[test]
    fn test_config_debug_masks_token() {
        let config = TelegramConfig::new(SecretString::from("123456:ABCDEF".to_string()));
        let debug = format!("{:?}", config);

        assert!(!debug.contains("ABCDEF"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_send_message_posts_chat_id_and_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottest-token/sendMessage")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "chat_id": 42,
                "text": "hello",
            })))
            .with_status(200)
            .with_body(r#"{"ok": true, "result": {}}"#)
            .expect(1)
            .create_async()
            .await;

        let sender = test_sender(&server.url());
        let result = sender.send_message(42, "hello").await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_bounded_retry_then_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottest-token/sendMessage")
            .with_status(502)
            .with_body("bad gateway")
            .expect(2)
            .create_async()
            .await;

        let sender = test_sender(&server.url());
        let result = sender.send_message(42, "hello").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(NotificationError::SendFailed(_))));
    }
}
