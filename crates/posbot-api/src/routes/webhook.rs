//! 텔레그램 웹훅 엔드포인트.
//!
//! 핸들러는 본문 파싱 결과와 무관하게 항상 `{"success": true}`를
//! 반환합니다. 텔레그램은 비성공 응답을 받으면 같은 업데이트를
//! 재전송하므로, 처리 불가능한 페이로드도 여기서 수락하고 버립니다.
//! 실제 명령어 처리는 응답과 분리된 백그라운드 태스크에서 수행됩니다.

use crate::dispatch::{self, TelegramUpdate};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// 웹훅 라우터를 생성합니다.
pub fn webhook_router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(receive_update))
}

/// POST /webhook
///
/// `Json` 추출기를 쓰지 않고 원시 바이트를 직접 파싱합니다.
/// 추출기는 잘못된 본문에 4xx를 돌려주는데, 이 엔드포인트의 계약은
/// 무조건 수락이기 때문입니다.
async fn receive_update(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<TelegramUpdate>(&body) {
        Ok(update) => {
            tokio::spawn(dispatch::process_update(state, update));
        }
        Err(e) => {
            debug!(error = %e, "Webhook body is not a valid update, dropping");
        }
    }

    Json(json!({"success": true}))
}
