//! 웹훅 서버 및 명령어 디스패처.
//!
//! 인바운드 텔레그램 웹훅을 수신해 즉시 성공 응답을 돌려주고,
//! 명령어 파이프라인(검증 → 인가 → 라우팅 → 응답)을 백그라운드
//! 태스크로 수행합니다.

pub mod dispatch;
pub mod middleware;
pub mod routes;
pub mod state;
