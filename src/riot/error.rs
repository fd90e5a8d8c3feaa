//! Riot API 조회 에러 분류
//!
//! 파이프라인에서 재시도할지 즉시 포기할지를 이 타입으로 구분합니다.
//! 재시도는 파이프라인 한 곳에서만 수행하며, 상위 레이어는 재-재시도하지
//! 않습니다.

/// 업스트림 조회 실패
///
/// `Clone`인 이유: 동일 키에 대한 동시 요청이 하나의 in-flight Future를
/// 공유하므로, 실패도 모든 대기자에게 복제되어 전달되어야 합니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// API 키 미설정. 재시도 대상이 아님.
    #[error("no Riot API key configured")]
    Configuration,

    /// DNS/연결/타임아웃. 선형 백오프로 재시도 후 소진 시 반환.
    #[error("network error after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    /// 429 재시도 한도 소진. 서버가 지시한 지연을 모두 소모한 뒤의 종단 실패.
    #[error("rate limit retries exhausted (429)")]
    RateLimitExhausted,

    /// 401/403. 키가 만료/차단된 상태이므로 재시도 없이 즉시 실패.
    #[error("authentication rejected ({status})")]
    Auth { status: u16 },

    /// 404. 존재하지 않는 리소스.
    #[error("resource not found")]
    NotFound,

    /// 그 외 비-2xx (5xx 재시도 소진 포함).
    #[error("upstream error {status}: {status_text}")]
    Upstream { status: u16, status_text: String },

    /// 2xx였지만 본문이 기대한 스키마와 다름. 런타임에 터지는 대신 여기서 닫음.
    #[error("malformed {resource} payload: {message}")]
    Decode {
        resource: &'static str,
        message: String,
    },
}

impl FetchError {
    /// 핸들러에서 HTTP 상태 코드로 내려줄 때 사용
    pub fn http_status(&self) -> u16 {
        match self {
            FetchError::Configuration => 503,
            FetchError::Network { .. } => 502,
            FetchError::RateLimitExhausted => 429,
            FetchError::Auth { .. } => 502,
            FetchError::NotFound => 404,
            FetchError::Upstream { status, .. } => {
                if *status >= 500 { 502 } else { *status }
            }
            FetchError::Decode { .. } => 502,
        }
    }
}
