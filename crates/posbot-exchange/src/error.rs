//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 인증/서명 거부
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 거래소가 반환한 에러 응답
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// 200 응답이지만 본문을 해석할 수 없음
    #[error("Parse error: {0}")]
    Parse(String),
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Timeout(_) | ExchangeError::Network(_))
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ExchangeError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}
