//! 포지션 스냅샷을 텍스트 리포트로 변환하는 순수 함수.
//!
//! I/O와 실패 경로가 없으며, 같은 입력에 대해 항상 같은 텍스트를
//! 생성합니다. 이 모듈이 포맷팅의 단위 테스트 표면입니다.

use posbot_core::{OrderKind, OrderLine, Position};

/// 오픈 포지션이 없을 때의 고정 응답.
const NO_POSITION_TEXT: &str = "No open positions";

/// 포지션/오픈 주문 스냅샷을 상태 리포트로 포맷합니다.
///
/// 포지션이 없거나 수량이 0이면 고정된 "No open positions" 메시지를
/// 반환합니다. 주문 라인은 거래소가 반환한 순서를 그대로 유지합니다.
pub fn format_status(position: Option<&Position>, orders: &[OrderLine]) -> String {
    let Some(position) = position.filter(|p| !p.is_flat()) else {
        return NO_POSITION_TEXT.to_string();
    };

    let mut text = String::from("---------- POSITION ----------\n\n");
    text.push_str(&format!("Side:   {}\n", position.side()));
    text.push_str(&format!("Base:   {}\n", position.isolated_wallet));
    text.push_str(&format!("Leverage:    {}\n", position.leverage));
    text.push_str(&format!("Entry Price:   {}\n", position.entry_price));

    for order in orders {
        match (&order.kind, order.price_rate) {
            (OrderKind::TrailingStopMarket, Some(rate)) => {
                text.push_str(&format!(
                    "{}: activation price:   {} | price rate: {}\n",
                    order.kind, order.display_price, rate
                ));
            }
            _ => {
                text.push_str(&format!("{}:   {}\n", order.kind, order.display_price));
            }
        }
    }

    text.push_str("\n\n");
    text.push_str(&format!("Current price: {:.2}", position.mark_price));
    text.push_str(&format!("\nProfit: $ {:.2}", position.unrealized_profit));

    text
}

/// 지원하는 명령어를 나열하는 고정 도움말.
pub fn format_help() -> String {
    "/bot_status -- Give status report\n/help -- Show commands".to_string()
}
