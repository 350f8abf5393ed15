//! 발신 IP 허용 목록 미들웨어.
//!
//! 웹훅 엔드포인트는 텔레그램의 공개 서버 대역에서 오는 요청만
//! 수락합니다. 클라이언트 IP는 리버스 프록시 헤더를 우선 신뢰하고
//! (`X-Forwarded-For` → `X-Real-IP`), 없으면 TCP 연결 주소를 씁니다.
//! IP를 알아낼 수 없는 요청은 거부합니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// 텔레그램 웹훅 발신 대역.
///
/// https://core.telegram.org/bots/webhooks 에 공지된 대역 목록.
const TELEGRAM_CIDR_RANGES: &[&str] = &[
    "91.108.56.0/22",
    "91.108.4.0/22",
    "91.108.8.0/22",
    "91.108.16.0/22",
    "91.108.12.0/22",
    "149.154.160.0/20",
    "91.105.192.0/23",
    "91.108.20.0/22",
    "185.76.151.0/24",
    "2001:b28:f23d::/48",
    "2001:b28:f23f::/48",
    "2001:67c:4e8::/48",
    "2001:b28:f23c::/48",
    "2a0a:f280::/32",
];

/// CIDR 표기 IP 대역.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidrRange {
    V4 { network: u32, prefix: u8 },
    V6 { network: u128, prefix: u8 },
}

impl CidrRange {
    /// 주소가 이 대역에 속하는지 확인합니다. 주소 패밀리가 다르면 false.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self, addr) {
            (CidrRange::V4 { network, prefix }, IpAddr::V4(v4)) => {
                let mask = v4_mask(*prefix);
                (u32::from(v4) & mask) == (*network & mask)
            }
            (CidrRange::V6 { network, prefix }, IpAddr::V6(v6)) => {
                let mask = v6_mask(*prefix);
                (u128::from(v6) & mask) == (*network & mask)
            }
            _ => false,
        }
    }
}

fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for CidrRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, prefix_part) = s
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length: {}", s))?;

        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| format!("invalid prefix length: {}", s))?;

        match IpAddr::from_str(addr_part).map_err(|_| format!("invalid address: {}", s))? {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(format!("prefix out of range: {}", s));
                }
                Ok(CidrRange::V4 {
                    network: u32::from(v4),
                    prefix,
                })
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(format!("prefix out of range: {}", s));
                }
                Ok(CidrRange::V6 {
                    network: u128::from(v6),
                    prefix,
                })
            }
        }
    }
}

/// 허용 대역 집합.
#[derive(Debug, Clone)]
pub struct IpAllowlist {
    ranges: Vec<CidrRange>,
}

impl IpAllowlist {
    /// 텔레그램 공개 대역으로 허용 목록을 생성합니다.
    pub fn telegram() -> Self {
        let ranges = TELEGRAM_CIDR_RANGES
            .iter()
            .map(|s| {
                s.parse()
                    .unwrap_or_else(|e| panic!("invalid built-in CIDR range: {}", e))
            })
            .collect();
        Self { ranges }
    }

    /// 주소가 허용 대역 중 하나에 속하는지 확인합니다.
    pub fn allows(&self, addr: IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(addr))
    }
}

/// 요청에서 클라이언트 IP를 추출합니다.
///
/// `X-Forwarded-For`의 첫 항목, `X-Real-IP`, TCP 연결 주소 순으로
/// 시도합니다.
fn client_ip(request: &Request) -> Option<IpAddr> {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(addr) = IpAddr::from_str(first.trim()) {
                    return Some(addr);
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(addr) = IpAddr::from_str(value.trim()) {
                return Some(addr);
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// 발신 IP가 허용 목록 밖이면 403으로 차단합니다.
pub async fn ip_allowlist_middleware(
    State(allowlist): State<Arc<IpAllowlist>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(addr) = client_ip(&request) else {
        warn!("Request without identifiable client IP, denying");
        return access_denied();
    };

    if !allowlist.allows(addr) {
        warn!(ip = %addr, "Request from outside the allow list, denying");
        return access_denied();
    }

    next.run(request).await
}

fn access_denied() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"detail": "Access denied"}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[test]
    fn test_cidr_parse_v4() {
        let range: CidrRange = "149.154.160.0/20".parse().unwrap();
        assert_eq!(
            range,
            CidrRange::V4 {
                network: u32::from_be_bytes([149, 154, 160, 0]),
                prefix: 20
            }
        );
    }

    #[test]
    fn test_cidr_parse_rejects_garbage() {
        assert!("149.154.160.0".parse::<CidrRange>().is_err());
        assert!("not-an-ip/20".parse::<CidrRange>().is_err());
        assert!("149.154.160.0/33".parse::<CidrRange>().is_err());
        assert!("2a0a:f280::/129".parse::<CidrRange>().is_err());
    }

    #[test]
    fn test_v4_contains_boundaries() {
        let range: CidrRange = "149.154.160.0/20".parse().unwrap();

        assert!(range.contains("149.154.160.1".parse().unwrap()));
        assert!(range.contains("149.154.175.255".parse().unwrap()));
        assert!(!range.contains("149.154.176.0".parse().unwrap()));
        assert!(!range.contains("149.154.159.255".parse().unwrap()));
    }

    #[test]
    fn test_v6_contains() {
        let range: CidrRange = "2a0a:f280::/32".parse().unwrap();

        assert!(range.contains("2a0a:f280::1".parse().unwrap()));
        assert!(range.contains("2a0a:f280:ffff::1".parse().unwrap()));
        assert!(!range.contains("2a0a:f281::1".parse().unwrap()));
    }

    #[test]
    fn test_family_mismatch_is_false() {
        let v4: CidrRange = "91.108.4.0/22".parse().unwrap();
        let v6: CidrRange = "2a0a:f280::/32".parse().unwrap();

        assert!(!v4.contains("2a0a:f280::1".parse().unwrap()));
        assert!(!v6.contains("91.108.4.1".parse().unwrap()));
    }

    #[test]
    fn test_telegram_allowlist_accepts_known_ranges() {
        let allowlist = IpAllowlist::telegram();

        assert!(allowlist.allows("91.108.56.10".parse().unwrap()));
        assert!(allowlist.allows("149.154.167.220".parse().unwrap()));
        assert!(allowlist.allows("2001:b28:f23d::1".parse().unwrap()));
        assert!(!allowlist.allows("8.8.8.8".parse().unwrap()));
        assert!(!allowlist.allows("127.0.0.1".parse().unwrap()));
    }

    fn test_app() -> Router {
        let allowlist = Arc::new(IpAllowlist::telegram());
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(allowlist, ip_allowlist_middleware))
    }

    async fn get_with_forwarded_for(ip: &str) -> StatusCode {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-forwarded-for", ip)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_middleware_allows_telegram_ip() {
        assert_eq!(get_with_forwarded_for("149.154.167.220").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_denies_unknown_ip() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-forwarded-for", "8.8.8.8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"detail": "Access denied"}));
    }

    #[tokio::test]
    async fn test_middleware_denies_without_client_ip() {
        let response = test_app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_middleware_uses_first_forwarded_entry() {
        // 프록시 체인에서 최초 클라이언트 주소만 평가
        assert_eq!(
            get_with_forwarded_for("8.8.8.8, 149.154.167.220").await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_with_forwarded_for("149.154.167.220, 10.0.0.1").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_middleware_falls_back_to_real_ip_header() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-real-ip", "91.108.4.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
