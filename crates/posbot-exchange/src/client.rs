//! Binance USDⓈ-M 선물 REST 클라이언트.
//!
//! 서명된 읽기 요청(포지션/오픈 주문/티커)을 발행하고 응답을 도메인
//! 타입으로 변환합니다. 읽기 경로의 실패는 클라이언트 내부에서 흡수되어
//! 호출자에게는 빈 결과로 전달됩니다 (티커는 타입화된 에러 반환).

use crate::error::{ExchangeError, ExchangeResult};
use crate::signer::{canonical_query, sign};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use posbot_core::{Market, OrderKind, OrderLine, Position};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

/// 포지션 조회 최대 시도 횟수.
const POSITION_ATTEMPTS: u32 = 3;

// ============================================================================
// 설정
// ============================================================================

/// 선물 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct FuturesConfig {
    /// API 키 (헤더로 전송)
    pub api_key: String,
    /// API 시크릿 (서명 키로만 사용, 전송되지 않음)
    pub api_secret: SecretString,
    /// 선물 REST API 기본 URL
    pub futures_base_url: String,
    /// 현물 REST API 기본 URL (티커 공개 엔드포인트용)
    pub spot_base_url: String,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl fmt::Debug for FuturesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("FuturesConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("futures_base_url", &self.futures_base_url)
            .field("spot_base_url", &self.spot_base_url)
            .field("recv_window", &self.recv_window)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FuturesConfig {
    /// 새 설정 생성.
    pub fn new(api_key: String, api_secret: SecretString) -> Self {
        Self {
            api_key,
            api_secret,
            futures_base_url: "https://fapi.binance.com".to_string(),
            spot_base_url: "https://api.binance.com".to_string(),
            recv_window: 10000,
            timeout_secs: 2,
        }
    }

    /// 선물 기본 URL 교체 (테스트용).
    pub fn with_futures_base_url(mut self, url: impl Into<String>) -> Self {
        self.futures_base_url = url.into();
        self
    }

    /// 현물 기본 URL 교체 (테스트용).
    pub fn with_spot_base_url(mut self, url: impl Into<String>) -> Self {
        self.spot_base_url = url.into();
        self
    }

    /// 수신 윈도우 설정.
    pub fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// `BINANCE_API_KEY`, `BINANCE_API_SECRET`이 필요하며,
    /// `BINANCE_RECV_WINDOW`는 선택입니다.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").ok()?;
        let api_secret = std::env::var("BINANCE_API_SECRET").ok()?;
        let recv_window = std::env::var("BINANCE_RECV_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10000);

        Some(
            Self::new(api_key, SecretString::from(api_secret)).with_recv_window(recv_window),
        )
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRiskEntry {
    symbol: String,
    position_amt: String,
    notional: String,
    entry_price: String,
    mark_price: String,
    un_realized_profit: String,
    isolated_wallet: String,
    leverage: String,
    liquidation_price: String,
    update_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderEntry {
    orig_type: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    stop_price: String,
    #[serde(default)]
    activate_price: Option<String>,
    #[serde(default)]
    price_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerPriceEntry {
    price: String,
}

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i32,
    msg: String,
}

// ============================================================================
// 선물 클라이언트
// ============================================================================

/// 포지션/오픈 주문 읽기 인터페이스.
///
/// 디스패처가 의존하는 seam으로, 테스트에서 모킹됩니다.
/// 두 호출 모두 실패를 내부에서 흡수하며 절대 에러를 전파하지 않습니다.
#[async_trait]
pub trait PositionReader: Send + Sync {
    /// 심볼의 오픈 포지션 스냅샷을 조회합니다. 실패 또는 데이터 없음이면 `None`.
    async fn get_open_position(&self, symbol: &str) -> Option<Position>;

    /// 심볼의 오픈 주문 목록을 조회합니다. 실패하면 빈 목록.
    async fn get_open_orders(&self, symbol: &str) -> Vec<OrderLine>;
}

/// Binance USDⓈ-M 선물 클라이언트.
pub struct FuturesClient {
    config: FuturesConfig,
    client: Client,
}

impl FuturesClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: FuturesConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 현재 타임스탬프(밀리초) 반환.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    /// 서명된 GET 요청.
    ///
    /// `params`는 서명 대상 파라미터 전체를 최종 순서대로 담아야 하며,
    /// `signature`는 이 함수가 마지막에 덧붙입니다.
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = canonical_query(params);
        let signature = sign(&self.config.api_secret, &query);
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.futures_base_url, endpoint, query, signature
        );

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// 공개 GET 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query = canonical_query(params);
        let full_url = if query.is_empty() {
            url.to_string()
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self.client.get(&full_url).send().await?;
        Self::handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::from)?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::Parse(e.to_string())
            })
        } else if let Ok(err) = serde_json::from_str::<BinanceErrorBody>(&body) {
            Err(Self::map_error_code(err.code, &err.msg))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> ExchangeError {
        match code {
            // -1022: 서명 불일치, -2014/-2015: API 키 거부
            -1022 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(s: &str) -> Decimal {
        s.parse().unwrap_or(Decimal::ZERO)
    }

    /// 포지션 응답 엔트리를 도메인 타입으로 변환.
    fn to_position(entry: PositionRiskEntry) -> Position {
        Position {
            symbol: entry.symbol,
            position_amt: Self::parse_decimal(&entry.position_amt),
            notional: Self::parse_decimal(&entry.notional),
            entry_price: Self::parse_decimal(&entry.entry_price),
            mark_price: Self::parse_decimal(&entry.mark_price),
            unrealized_profit: Self::parse_decimal(&entry.un_realized_profit),
            isolated_wallet: Self::parse_decimal(&entry.isolated_wallet),
            leverage: Self::parse_decimal(&entry.leverage),
            liquidation_price: Self::parse_decimal(&entry.liquidation_price),
            update_time: DateTime::from_timestamp_millis(entry.update_time)
                .unwrap_or_else(Utc::now),
        }
    }

    /// 주문 응답 엔트리를 표시 라인으로 변환.
    ///
    /// 가격 해석 규칙:
    /// - `trailing_stop_market`: `activatePrice` + `priceRate`
    /// - `stop_market`: `stopPrice`
    /// - 그 외: `price`
    fn to_order_line(entry: OpenOrderEntry) -> OrderLine {
        let kind = OrderKind::from_orig_type(&entry.orig_type);

        match kind {
            OrderKind::TrailingStopMarket => {
                let activation =
                    Self::parse_decimal(entry.activate_price.as_deref().unwrap_or_default());
                let rate = Self::parse_decimal(entry.price_rate.as_deref().unwrap_or_default());
                OrderLine {
                    kind,
                    display_price: activation,
                    activation_price: Some(activation),
                    price_rate: Some(rate),
                }
            }
            OrderKind::StopMarket => OrderLine {
                kind,
                display_price: Self::parse_decimal(&entry.stop_price),
                activation_price: None,
                price_rate: None,
            },
            OrderKind::Other(_) => OrderLine {
                kind,
                display_price: Self::parse_decimal(&entry.price),
                activation_price: None,
                price_rate: None,
            },
        }
    }

    /// 포지션 1회 조회.
    async fn fetch_position(&self, symbol: &str) -> ExchangeResult<Vec<PositionRiskEntry>> {
        let params = [
            ("timestamp", Self::timestamp_ms().to_string()),
            ("symbol", symbol.to_string()),
            ("recvWindow", self.config.recv_window.to_string()),
        ];
        self.signed_get("/fapi/v2/positionRisk", &params).await
    }

    /// 티커 가격을 조회합니다.
    ///
    /// 현물은 공개 엔드포인트를, 선물은 서명된 엔드포인트를 사용합니다.
    /// 실패하면 가격 대신 구분 가능한 에러를 반환하므로 호출자는 예외
    /// 처리 없이 분기할 수 있습니다.
    pub async fn get_ticker_price(
        &self,
        symbol: &str,
        market: Market,
    ) -> ExchangeResult<Decimal> {
        let entry: TickerPriceEntry = match market {
            Market::Spot => {
                let url = format!("{}/api/v3/ticker/price", self.config.spot_base_url);
                let params = [("symbol", symbol.to_string())];
                self.public_get(&url, &params).await?
            }
            Market::Futures => {
                let params = [
                    ("timestamp", Self::timestamp_ms().to_string()),
                    ("symbol", symbol.to_string()),
                ];
                self.signed_get("/fapi/v1/ticker/price", &params).await?
            }
        };

        entry
            .price
            .parse()
            .map_err(|_| ExchangeError::Parse(format!("invalid price: {}", entry.price)))
    }
}

#[async_trait]
impl PositionReader for FuturesClient {
    async fn get_open_position(&self, symbol: &str) -> Option<Position> {
        // 고정 3회 시도, 시도 간 대기 없음. 타임스탬프는 시도마다 새로 생성.
        for attempt in 1..=POSITION_ATTEMPTS {
            match self.fetch_position(symbol).await {
                Ok(entries) => return entries.into_iter().next().map(Self::to_position),
                Err(e) => {
                    warn!(
                        symbol = %symbol,
                        attempt = attempt,
                        error = %e,
                        "Position query attempt failed"
                    );
                }
            }
        }

        warn!(
            symbol = %symbol,
            attempts = POSITION_ATTEMPTS,
            "Position query gave up, treating as no data"
        );
        None
    }

    async fn get_open_orders(&self, symbol: &str) -> Vec<OrderLine> {
        let params = [
            ("symbol", symbol.to_string()),
            ("timestamp", Self::timestamp_ms().to_string()),
            ("recvWindow", self.config.recv_window.to_string()),
        ];

        match self
            .signed_get::<Vec<OpenOrderEntry>>("/fapi/v1/openOrders", &params)
            .await
        {
            Ok(entries) => entries.into_iter().map(Self::to_order_line).collect(),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Open orders query failed, treating as empty");
                Vec::new()
            }
        }
    }
}
