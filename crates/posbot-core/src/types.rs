//! 시스템 전반에서 사용되는 공통 타입.
//!
//! 이 모듈은 거래소 조회 결과를 표현하는 타입을 정의합니다:
//! - `Position` - 한 심볼의 오픈 포지션 스냅샷
//! - `OrderLine` - 리포트에 표시할 오픈 주문 한 줄
//! - `Market` - 티커 조회 대상 시장 구분

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 포지션 방향.
///
/// `position_amt`의 부호에서 파생됩니다 (양수 = Long, 음수 = Short, 0 = Flat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    /// 롱 포지션
    Long,
    /// 숏 포지션
    Short,
    /// 포지션 없음
    Flat,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "Long"),
            PositionSide::Short => write!(f, "Short"),
            PositionSide::Flat => write!(f, "Flat"),
        }
    }
}

/// 한 심볼의 오픈 포지션 스냅샷.
///
/// 조회 시점의 상태를 그대로 담는 일시적 값이며, 요청 간에 보존되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼 (예: "BTCUSDT")
    pub symbol: String,
    /// 부호 있는 포지션 수량 (양수 = Long, 음수 = Short)
    pub position_amt: Decimal,
    /// 명목 가치 (절대값)
    pub notional: Decimal,
    /// 평균 진입 가격
    pub entry_price: Decimal,
    /// 현재 마크 가격
    pub mark_price: Decimal,
    /// 미실현 손익
    pub unrealized_profit: Decimal,
    /// 격리 지갑 잔고
    pub isolated_wallet: Decimal,
    /// 레버리지
    pub leverage: Decimal,
    /// 청산 가격
    pub liquidation_price: Decimal,
    /// 거래소 기준 마지막 업데이트 시각
    pub update_time: DateTime<Utc>,
}

impl Position {
    /// 포지션 수량의 부호에서 방향을 판별합니다.
    pub fn side(&self) -> PositionSide {
        if self.position_amt > Decimal::ZERO {
            PositionSide::Long
        } else if self.position_amt < Decimal::ZERO {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }

    /// 오픈 포지션이 없는 상태인지 확인합니다.
    pub fn is_flat(&self) -> bool {
        self.position_amt.is_zero()
    }
}

/// 오픈 주문 유형.
///
/// 표시 가격의 해석 규칙이 유형마다 다릅니다:
/// - `TrailingStopMarket`: 활성화 가격과 콜백 비율 표시
/// - `StopMarket`: 스톱 가격 표시
/// - 그 외: 일반 주문 가격 표시
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// 스톱 마켓 주문
    StopMarket,
    /// 트레일링 스톱 마켓 주문
    TrailingStopMarket,
    /// 그 외 주문 유형 (소문자 원본 문자열 보존)
    Other(String),
}

impl OrderKind {
    /// 거래소의 `origType` 필드에서 주문 유형을 판별합니다.
    pub fn from_orig_type(orig_type: &str) -> Self {
        match orig_type.to_lowercase().as_str() {
            "stop_market" => OrderKind::StopMarket,
            "trailing_stop_market" => OrderKind::TrailingStopMarket,
            other => OrderKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::StopMarket => write!(f, "stop_market"),
            OrderKind::TrailingStopMarket => write!(f, "trailing_stop_market"),
            OrderKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// 리포트에 표시할 오픈 주문 한 줄.
///
/// `display_price`는 주문 유형별 해석 규칙이 이미 적용된 가격입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// 주문 유형
    pub kind: OrderKind,
    /// 유형별 규칙이 적용된 표시 가격
    pub display_price: Decimal,
    /// 활성화 가격 (트레일링 스톱 전용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_price: Option<Decimal>,
    /// 콜백 비율 (트레일링 스톱 전용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_rate: Option<Decimal>,
}

/// 티커 조회 대상 시장.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    /// 현물 시장 (공개 엔드포인트, 서명 불필요)
    Spot,
    /// USDⓈ-M 선물 시장 (서명 필요)
    Futures,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position_with_amt(amt: Decimal) -> Position {
        Position {
            symbol: "BTCUSDT".to_string(),
            position_amt: amt,
            notional: dec!(1000),
            entry_price: dec!(50000),
            mark_price: dec!(51000),
            unrealized_profit: dec!(20),
            isolated_wallet: dec!(100),
            leverage: dec!(10),
            liquidation_price: dec!(45000),
            update_time: Utc::now(),
        }
    }

    #[test]
    fn test_position_side_from_sign() {
        assert_eq!(position_with_amt(dec!(0.5)).side(), PositionSide::Long);
        assert_eq!(position_with_amt(dec!(-0.5)).side(), PositionSide::Short);
        assert_eq!(position_with_amt(Decimal::ZERO).side(), PositionSide::Flat);
    }

    #[test]
    fn test_position_is_flat() {
        assert!(position_with_amt(Decimal::ZERO).is_flat());
        assert!(!position_with_amt(dec!(0.001)).is_flat());
    }

    #[test]
    fn test_order_kind_from_orig_type() {
        assert_eq!(
            OrderKind::from_orig_type("STOP_MARKET"),
            OrderKind::StopMarket
        );
        assert_eq!(
            OrderKind::from_orig_type("trailing_stop_market"),
            OrderKind::TrailingStopMarket
        );
        assert_eq!(
            OrderKind::from_orig_type("LIMIT"),
            OrderKind::Other("limit".to_string())
        );
    }

    #[test]
    fn test_order_kind_display() {
        assert_eq!(OrderKind::StopMarket.to_string(), "stop_market");
        assert_eq!(
            OrderKind::TrailingStopMarket.to_string(),
            "trailing_stop_market"
        );
        assert_eq!(
            OrderKind::Other("limit".to_string()).to_string(),
            "limit"
        );
    }
}
