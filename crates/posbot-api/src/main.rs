//! 포지션 봇 웹훅 서버.
//!
//! 텔레그램 웹훅을 수신해 거래소 포지션 상태를 조회하고
//! 텍스트 리포트로 응답하는 Axum 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use posbot_api::middleware::{ip_allowlist_middleware, IpAllowlist};
use posbot_api::routes::webhook_router;
use posbot_api::state::AppState;
use posbot_core::logging::init_logging_from_env;
use posbot_exchange::{FuturesClient, FuturesConfig};
use posbot_notification::{TelegramConfig, TelegramSender};

/// 서버 설정 구조체.
struct ServerConfig {
    /// 바인딩할 호스트 주소
    host: String,
    /// 바인딩할 포트
    port: u16,
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드.
    ///
    /// - `WEBHOOK_HOST`: 바인딩 주소 (기본값: "0.0.0.0")
    /// - `WEBHOOK_PORT`: 바인딩 포트 (기본값: 8443)
    fn from_env() -> Self {
        let host = std::env::var("WEBHOOK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("WEBHOOK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8443);

        Self { host, port }
    }

    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// 허가 사용자명 목록 로드.
///
/// `ALLOWED_USERNAMES`: 쉼표 구분 텔레그램 사용자명 목록.
fn load_allowed_users() -> Vec<String> {
    std::env::var("ALLOWED_USERNAMES")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 애플리케이션 라우터 생성.
fn create_router(state: Arc<AppState>, allowlist: Arc<IpAllowlist>) -> Router {
    webhook_router()
        .layer(from_fn_with_state(allowlist, ip_allowlist_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    init_logging_from_env().map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!("Starting position bot webhook server...");

    let config = ServerConfig::from_env();
    let addr = config
        .socket_addr()
        .context("invalid WEBHOOK_HOST/WEBHOOK_PORT")?;

    // 거래소 클라이언트 생성 (BINANCE_API_KEY / BINANCE_API_SECRET)
    let exchange_config = FuturesConfig::from_env()
        .context("BINANCE_API_KEY and BINANCE_API_SECRET must be set")?;
    let exchange = FuturesClient::new(exchange_config)?;

    // 텔레그램 전송기 생성 (TELEGRAM_BOT_TOKEN)
    let telegram_config =
        TelegramConfig::from_env().context("TELEGRAM_BOT_TOKEN must be set")?;
    let sender = TelegramSender::new(telegram_config);

    let allowed_users = load_allowed_users();
    if allowed_users.is_empty() {
        warn!("ALLOWED_USERNAMES is empty, every command will be dropped");
    }

    let symbol = std::env::var("SYMBOL").unwrap_or_else(|_| "BTCUSDT".to_string());

    let state = Arc::new(AppState::new(
        Arc::new(exchange),
        Arc::new(sender),
        allowed_users,
        symbol.clone(),
    ));

    info!(
        symbol = %symbol,
        allowed_users = state.allowed_users.len(),
        "Application state initialized"
    );

    let allowlist = Arc::new(IpAllowlist::telegram());
    let app = create_router(state, allowlist);

    info!(%addr, "Webhook server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // 프록시 헤더가 없을 때 IP 필터가 TCP 연결 주소를 쓸 수 있도록
    // ConnectInfo를 확장에 주입
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Ctrl+C 수신 시 graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
    }
    info!("Shutdown signal received");
}
