//! Riot API 연동 레이어
//!
//! - `client`: 캐시/게이트/병합/재시도를 엮는 클라이언트와 리소스 접근자
//! - `cache`: MongoDB 기반 TTL 캐시
//! - `limiter`: 동시 호출 게이트 (카운팅 세마포어)
//! - `dedup`: in-flight 요청 병합
//! - `model`: 리소스별 응답 스키마
//! - `error`: 조회 에러 분류
//! - `metrics`: 운영 카운터

pub mod cache;
pub mod client;
pub mod dedup;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod model;

// 편의를 위한 re-export
pub use cache::ApiCache;
pub use client::{RankedLookup, RiotClient};
pub use error::FetchError;
