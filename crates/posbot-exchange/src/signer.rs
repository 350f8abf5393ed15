//! 서명된 요청을 위한 정규 쿼리 문자열 및 HMAC-SHA256 서명.
//!
//! 서버는 서명 검증 시 쿼리 문자열을 바이트 단위로 재현하므로,
//! 정규화는 파라미터 삽입 순서를 그대로 보존해야 합니다.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 파라미터 목록에서 정규 쿼리 문자열을 생성합니다.
///
/// `key=value` 쌍을 슬라이스 순서 그대로 `&`로 연결합니다. 정렬하지 않으며,
/// 마지막에 구분자를 붙이지 않습니다. `signature`를 제외한 모든 파라미터가
/// 확정된 뒤에 호출해야 합니다.
pub fn canonical_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// 정규 쿼리 문자열을 HMAC-SHA256으로 서명합니다.
///
/// 시크릿을 키로 사용하며 결과를 소문자 16진수로 반환합니다.
/// 부수 효과가 없는 결정적 함수입니다.
pub fn sign(secret: &SecretString, query: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_sign_known_vector() {
        // Binance API 문서의 서명 예제
        // https://binance-docs.github.io/apidocs/futures/en/#signed-trade-and-user_data-endpoint-security
        let secret = secret("NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j");
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            sign(&secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_sign_deterministic() {
        let secret = secret("secret");
        let query = "timestamp=1000&symbol=BTCUSDT&recvWindow=10000";

        assert_eq!(sign(&secret, query), sign(&secret, query));
    }

    #[test]
    fn test_sign_sensitive_to_input() {
        let secret_a = secret("secret");
        let secret_b = secret("secrez");
        let query = "timestamp=1000&symbol=BTCUSDT";
        let perturbed = "timestamp=1001&symbol=BTCUSDT";

        assert_ne!(sign(&secret_a, query), sign(&secret_a, perturbed));
        assert_ne!(sign(&secret_a, query), sign(&secret_b, query));
    }

    #[test]
    fn test_sign_is_lowercase_hex() {
        let signature = sign(&secret("secret"), "a=1");

        assert_eq!(signature.len(), 64);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_canonical_query_preserves_order() {
        let params = [
            ("timestamp", "1000".to_string()),
            ("symbol", "BTCUSDT".to_string()),
            ("recvWindow", "10000".to_string()),
        ];

        assert_eq!(
            canonical_query(&params),
            "timestamp=1000&symbol=BTCUSDT&recvWindow=10000"
        );
    }

    #[test]
    fn test_canonical_query_append_keeps_prefix() {
        let mut params = vec![
            ("zebra", "1".to_string()),
            ("alpha", "2".to_string()),
        ];
        let before = canonical_query(&params);

        params.push(("middle", "3".to_string()));
        let after = canonical_query(&params);

        assert!(after.starts_with(&before));
        assert_eq!(after, "zebra=1&alpha=2&middle=3");
    }

    #[test]
    fn test_canonical_query_empty_and_single() {
        assert_eq!(canonical_query(&[]), "");
        assert_eq!(
            canonical_query(&[("symbol", "BTCUSDT".to_string())]),
            "symbol=BTCUSDT"
        );
    }
}
