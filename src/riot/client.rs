//! Riot API 클라이언트
//!
//! 모든 업스트림 호출은 이 한 곳을 지나갑니다. 순서는 항상
//! 캐시 확인 → 게이트 퍼밋 획득 → in-flight 합류/등록 → 재시도 파이프라인
//! → 캐시 기록 → 퍼밋 반납(Drop). 재시도는 파이프라인 안에서만 합니다.

use futures_util::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::{
    ApiCache, TTL_ACCOUNT, TTL_MATCH, TTL_MATCH_IDS, TTL_RANKED, TTL_STATIC, TTL_SUMMONER,
    TTL_VERSION,
};
use super::dedup::FlightGroup;
use super::error::FetchError;
use super::limiter::{FetchGate, GateSnapshot};
use super::metrics::ClientMetrics;
use super::model::{
    decode, AccountDto, CurrentGameInfo, LeagueEntryDto, MatchDto, StaticKind, SummonerDto,
};
use crate::config::Riot as RiotConfig;

/// 네트워크/5xx 공용 시도 예산
const MAX_RETRIES: u32 = 3;
/// 429 전용 재시도 예산 (네트워크 카운터와 별도)
const MAX_RATE_LIMIT_RETRIES: u32 = 3;
/// 선형 백오프 기본 지연: delay = base * attempt
const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Retry-After 헤더가 없을 때의 기본 대기 (초)
const DEFAULT_RATE_LIMIT_DELAY_SECS: u64 = 2;

const DDRAGON_HOST: &str = "https://ddragon.leagueoflegends.com";

/// 신선도가 의미 있는 조회 결과 (랭크 스냅샷 기록 여부 판단용)
pub struct RankedLookup {
    pub entries: Vec<LeagueEntryDto>,
    /// 캐시 히트가 아니라 방금 업스트림에서 받아온 데이터인지
    pub fresh: bool,
}

pub struct RiotClient {
    http: reqwest::Client,
    api_key: Option<String>,
    /// summoner/league/spectator용 플랫폼 호스트 (kr 등)
    platform_host: String,
    /// account/match용 리전 호스트 (asia 등)
    region_host: String,
    gate: FetchGate,
    flights: FlightGroup,
    cache: ApiCache,
    metrics: Arc<ClientMetrics>,
    base_delay: Duration,
}

impl RiotClient {
    pub fn new(config: &RiotConfig, cache: ApiCache) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            platform_host: format!("https://{}.api.riotgames.com", config.platform),
            region_host: format!("https://{}.api.riotgames.com", config.region),
            gate: FetchGate::default(),
            flights: FlightGroup::new(),
            cache,
            metrics: Arc::new(ClientMetrics::default()),
            base_delay: BASE_RETRY_DELAY,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub fn gate_snapshot(&self) -> GateSnapshot {
        self.gate.snapshot()
    }

    /// Riot ID(`name#tag`) → 계정 (24시간 캐시)
    pub async fn account_by_riot_id(&self, name: &str, tag: &str) -> Result<AccountDto, FetchError> {
        let key = format!(
            "account:{}:{}",
            name.to_lowercase(),
            tag.to_lowercase()
        );
        let url = format!(
            "{}/riot/account/v1/accounts/by-riot-id/{}/{}",
            self.region_host,
            urlencoding::encode(name),
            urlencoding::encode(tag)
        );
        let (value, _) = self.fetch_cached(&key, &url, TTL_ACCOUNT, true).await?;
        decode("account", &value)
    }

    /// PUUID → 소환사 프로필 (24시간 캐시)
    pub async fn summoner_by_puuid(&self, puuid: &str) -> Result<SummonerDto, FetchError> {
        let key = format!("summoner:{}", puuid);
        let url = format!(
            "{}/lol/summoner/v4/summoners/by-puuid/{}",
            self.platform_host, puuid
        );
        let (value, _) = self.fetch_cached(&key, &url, TTL_SUMMONER, true).await?;
        decode("summoner", &value)
    }

    /// PUUID → 랭크 엔트리 목록 (30분 캐시)
    ///
    /// `fresh`가 true면 방금 받아온 데이터이므로 호출자가 스냅샷을 남겨야 합니다.
    pub async fn ranked_entries(&self, puuid: &str) -> Result<RankedLookup, FetchError> {
        let key = format!("ranked:{}", puuid);
        let url = format!(
            "{}/lol/league/v4/entries/by-puuid/{}",
            self.platform_host, puuid
        );
        let (value, fresh) = self.fetch_cached(&key, &url, TTL_RANKED, true).await?;
        let entries = decode("ranked", &value)?;
        Ok(RankedLookup { entries, fresh })
    }

    /// 최근 경기 ID 페이지 (5분 캐시)
    pub async fn match_ids(
        &self,
        puuid: &str,
        offset: u32,
        count: u32,
    ) -> Result<Vec<String>, FetchError> {
        let key = format!("matches:{}:{}:{}", puuid, offset, count);
        let url = format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?start={}&count={}",
            self.region_host, puuid, offset, count
        );
        let (value, _) = self.fetch_cached(&key, &url, TTL_MATCH_IDS, true).await?;
        decode("match ids", &value)
    }

    /// 경기 상세 (7일 캐시, in-flight 병합의 주 대상)
    pub async fn match_detail(&self, match_id: &str) -> Result<MatchDto, FetchError> {
        let key = format!("match:{}", match_id);
        let url = format!("{}/lol/match/v5/matches/{}", self.region_host, match_id);
        let (value, _) = self.fetch_cached(&key, &url, TTL_MATCH, true).await?;
        decode("match", &value)
    }

    /// 진행 중 게임. 항상 실시간 확인 (캐시/병합 없음).
    pub async fn live_game(&self, puuid: &str) -> Result<CurrentGameInfo, FetchError> {
        let url = format!(
            "{}/lol/spectator/v5/active-games/by-summoner/{}",
            self.platform_host, puuid
        );
        let _permit = self.gate.acquire().await;
        self.metrics.record_upstream_call();
        let value = fetch_pipeline(
            self.http.clone(),
            self.api_key.clone(),
            url,
            Arc::clone(&self.metrics),
            self.base_delay,
            true,
        )
        .await?;
        decode("live game", &value)
    }

    /// 현재 데이터 버전 문자열 (6시간 캐시, 공개 CDN이라 키 없이 조회)
    pub async fn data_version(&self) -> Result<String, FetchError> {
        let url = format!("{}/api/versions.json", DDRAGON_HOST);
        let (value, _) = self.fetch_cached("version", &url, TTL_VERSION, false).await?;
        let versions: Vec<String> = decode("versions", &value)?;
        versions
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Decode {
                resource: "versions",
                message: "empty version list".to_string(),
            })
    }

    /// 챔피언/아이템/스펠 카탈로그 (24시간 캐시)
    pub async fn static_catalog(
        &self,
        kind: StaticKind,
        version: &str,
    ) -> Result<Arc<Value>, FetchError> {
        let key = format!("static:{}:{}", kind.key_name(), version);
        let url = format!(
            "{}/cdn/{}/data/en_US/{}",
            DDRAGON_HOST,
            version,
            kind.file_name()
        );
        let (value, _) = self.fetch_cached(&key, &url, TTL_STATIC, false).await?;
        Ok(value)
    }

    /// 캐시 → 게이트 → in-flight 병합 → 파이프라인 → 캐시 기록
    ///
    /// 캐시 읽기/쓰기 실패는 미스로 취급하고 경고만 남깁니다
    /// (다음 조회가 덮어쓰면 자가 치유되는 멱등 쓰기).
    async fn fetch_cached(
        &self,
        key: &str,
        url: &str,
        ttl_secs: i64,
        authed: bool,
    ) -> Result<(Arc<Value>, bool), FetchError> {
        match self.cache.get(key, ttl_secs).await {
            Ok(Some(value)) => {
                self.metrics.record_cache_hit();
                return Ok((Arc::new(value), false));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("[Riot] cache read failed for {}: {:#}", key, e);
            }
        }
        self.metrics.record_cache_miss();

        let _permit = self.gate.acquire().await;

        let (result, joined) = {
            let http = self.http.clone();
            let api_key = self.api_key.clone();
            let cache = self.cache.clone();
            let metrics = Arc::clone(&self.metrics);
            let base_delay = self.base_delay;
            let url = url.to_string();
            let cache_key = key.to_string();

            self.flights
                .run(key, move || {
                    async move {
                        metrics.record_upstream_call();
                        let value =
                            fetch_pipeline(http, api_key, url, metrics, base_delay, authed).await?;
                        if let Err(e) = cache.set(&cache_key, &value).await {
                            tracing::warn!("[Riot] cache write failed for {}: {:#}", cache_key, e);
                        }
                        Ok(Arc::new(value))
                    }
                    .boxed()
                })
                .await
        };

        if joined {
            self.metrics.record_dedup_join();
        }

        result.map(|value| (value, true))
    }
}

/// 단일 논리 조회의 재시도 상태 기계
///
/// - 네트워크 오류/5xx: `base * attempt` 선형 백오프, 총 MAX_RETRIES회
/// - 429: 서버가 지시한 지연만큼 대기, 별도 카운터로 MAX_RATE_LIMIT_RETRIES회
/// - 401/403/404/기타 비-2xx: 즉시 종단
///
/// 명시적 루프이므로 호출자가 Future를 drop하면 다음 await 지점에서 중단됩니다.
async fn fetch_pipeline(
    http: reqwest::Client,
    api_key: Option<String>,
    url: String,
    metrics: Arc<ClientMetrics>,
    base_delay: Duration,
    authed: bool,
) -> Result<Value, FetchError> {
    let api_key = if authed {
        match api_key {
            Some(key) => Some(key),
            None => return Err(FetchError::Configuration),
        }
    } else {
        None
    };

    let path = resource_path(&url).to_string();
    let mut attempts: u32 = 0;
    let mut rate_limit_retries: u32 = 0;

    loop {
        attempts += 1;
        let started = Instant::now();

        let mut request = http.get(&url);
        if let Some(key) = &api_key {
            request = request.header("X-Riot-Token", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                if attempts >= MAX_RETRIES {
                    return Err(FetchError::Network {
                        attempts,
                        message: e.to_string(),
                    });
                }
                metrics.record_retry();
                tracing::warn!(
                    "[Riot] network error on {} (attempt {}/{}): {}",
                    path, attempts, MAX_RETRIES, e
                );
                tokio::time::sleep(base_delay * attempts).await;
                continue;
            }
        };

        let status = response.status();
        tracing::debug!(
            "[Riot] {} -> {} in {}ms",
            path,
            status.as_u16(),
            started.elapsed().as_millis()
        );
        observe_rate_limits(&metrics, response.headers(), &path);

        if status.is_success() {
            return response.json::<Value>().await.map_err(|e| FetchError::Decode {
                resource: "response body",
                message: e.to_string(),
            });
        }

        match status.as_u16() {
            429 => {
                if rate_limit_retries >= MAX_RATE_LIMIT_RETRIES {
                    return Err(FetchError::RateLimitExhausted);
                }
                rate_limit_retries += 1;
                let delay = retry_after_seconds(response.headers())
                    .unwrap_or(DEFAULT_RATE_LIMIT_DELAY_SECS);
                metrics.record_rate_limit_wait();
                tracing::warn!(
                    "[Riot] rate limited on {}, waiting {}s ({}/{})",
                    path, delay, rate_limit_retries, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
            401 | 403 => {
                return Err(FetchError::Auth {
                    status: status.as_u16(),
                })
            }
            404 => return Err(FetchError::NotFound),
            500..=599 => {
                if attempts >= MAX_RETRIES {
                    return Err(upstream_error(status));
                }
                metrics.record_retry();
                tracing::warn!(
                    "[Riot] upstream {} on {} (attempt {}/{})",
                    status.as_u16(), path, attempts, MAX_RETRIES
                );
                tokio::time::sleep(base_delay * attempts).await;
            }
            _ => return Err(upstream_error(status)),
        }
    }
}

fn upstream_error(status: StatusCode) -> FetchError {
    FetchError::Upstream {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
    }
}

/// 로그용으로 스킴/호스트를 뗀 경로
fn resource_path(url: &str) -> &str {
    url.find("://")
        .and_then(|scheme_end| {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map(|slash| &rest[slash..])
        })
        .unwrap_or(url)
}

fn retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("Retry-After")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// 레이트리밋 헤더 관측 (요청 차단에는 쓰지 않음 — 그건 게이트의 일)
///
/// `X-App-Rate-Limit: 20:1,100:120` 식의 `limit:window` 목록과 대응하는
/// count 헤더를 비교해, 어느 창이든 90% 이상 차면 경고합니다.
fn observe_rate_limits(metrics: &ClientMetrics, headers: &HeaderMap, path: &str) {
    for (limit_header, count_header, scope) in [
        ("X-App-Rate-Limit", "X-App-Rate-Limit-Count", "app"),
        ("X-Method-Rate-Limit", "X-Method-Rate-Limit-Count", "method"),
    ] {
        let limits = headers.get(limit_header).and_then(|v| v.to_str().ok());
        let counts = headers.get(count_header).and_then(|v| v.to_str().ok());
        if let (Some(limits), Some(counts)) = (limits, counts) {
            if let Some(usage) = rate_limit_usage(limits, counts) {
                if usage >= 0.9 {
                    metrics.record_near_limit_warning();
                    tracing::warn!(
                        "[Riot] {} quota at {:.0}% on {}",
                        scope,
                        usage * 100.0,
                        path
                    );
                }
            }
        }
    }
}

/// `limit:window` / `count:window` 목록에서 가장 높은 사용률을 계산
fn rate_limit_usage(limits: &str, counts: &str) -> Option<f64> {
    let mut limit_by_window = std::collections::HashMap::new();
    for part in limits.split(',') {
        let (limit, window) = part.trim().split_once(':')?;
        let limit: f64 = limit.parse().ok()?;
        if limit > 0.0 {
            limit_by_window.insert(window.to_string(), limit);
        }
    }

    let mut worst: Option<f64> = None;
    for part in counts.split(',') {
        let (count, window) = part.trim().split_once(':')?;
        let count: f64 = count.parse().ok()?;
        if let Some(limit) = limit_by_window.get(window) {
            let usage = count / limit;
            worst = Some(worst.map_or(usage, |w: f64| w.max(usage)));
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warp::http::StatusCode;
    use warp::Filter;

    fn test_metrics() -> Arc<ClientMetrics> {
        Arc::new(ClientMetrics::default())
    }

    fn short_delay() -> Duration {
        Duration::from_millis(1)
    }

    /// 고정 응답 스텁 업스트림을 임시 포트에 띄움
    macro_rules! spawn_stub {
        ($filter:expr) => {{
            let (addr, server) = warp::serve($filter).bind_ephemeral(([127, 0, 0, 1], 0));
            tokio::spawn(server);
            format!("http://{}/resource", addr)
        }};
    }

    #[tokio::test]
    async fn missing_key_fails_fast_without_calling_upstream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub_calls = Arc::clone(&calls);
        let url = spawn_stub!(warp::any().map(move || {
            stub_calls.fetch_add(1, Ordering::SeqCst);
            "{}"
        }));

        let result =
            fetch_pipeline(reqwest::Client::new(), None, url, test_metrics(), short_delay(), true)
                .await;

        assert!(matches!(result, Err(FetchError::Configuration)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn permanent_server_error_stops_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub_calls = Arc::clone(&calls);
        let url = spawn_stub!(warp::any().map(move || {
            stub_calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_status("boom", StatusCode::INTERNAL_SERVER_ERROR)
        }));

        let result = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            url,
            test_metrics(),
            short_delay(),
            true,
        )
        .await;

        match result {
            Err(FetchError::Upstream { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected upstream error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn permanent_network_error_stops_after_max_retries() {
        // 아무것도 안 듣는 포트
        let result = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            "http://127.0.0.1:9/resource".to_string(),
            test_metrics(),
            short_delay(),
            true,
        )
        .await;

        match result {
            Err(FetchError::Network { attempts, .. }) => assert_eq!(attempts, MAX_RETRIES),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn permanent_429_honors_delays_then_exhausts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub_calls = Arc::clone(&calls);
        let url = spawn_stub!(warp::any().map(move || {
            stub_calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_header(
                warp::reply::with_status("slow down", StatusCode::TOO_MANY_REQUESTS),
                "Retry-After",
                "0",
            )
        }));

        let metrics = test_metrics();
        let result = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            url,
            Arc::clone(&metrics),
            short_delay(),
            true,
        )
        .await;

        assert!(matches!(result, Err(FetchError::RateLimitExhausted)));
        // 첫 시도 + 레이트리밋 재시도 3회
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RATE_LIMIT_RETRIES as usize + 1);
        assert_eq!(metrics.snapshot().rate_limit_waits, MAX_RATE_LIMIT_RETRIES as u64);
    }

    #[tokio::test]
    async fn not_found_is_terminal_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub_calls = Arc::clone(&calls);
        let url = spawn_stub!(warp::any().map(move || {
            stub_calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_status("nope", StatusCode::NOT_FOUND)
        }));

        let result = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            url,
            test_metrics(),
            short_delay(),
            true,
        )
        .await;

        assert!(matches!(result, Err(FetchError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forbidden_is_terminal_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub_calls = Arc::clone(&calls);
        let url = spawn_stub!(warp::any().map(move || {
            stub_calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_status("denied", StatusCode::FORBIDDEN)
        }));

        let result = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            url,
            test_metrics(),
            short_delay(),
            true,
        )
        .await;

        match result {
            Err(FetchError::Auth { status }) => assert_eq!(status, 403),
            other => panic!("expected auth error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_returns_parsed_body() {
        let url = spawn_stub!(
            warp::any().map(|| warp::reply::json(&serde_json::json!({ "puuid": "p-1" })))
        );

        let value = fetch_pipeline(
            reqwest::Client::new(),
            Some("key".to_string()),
            url,
            test_metrics(),
            short_delay(),
            true,
        )
        .await
        .unwrap();

        assert_eq!(value["puuid"], "p-1");
    }

    #[test]
    fn rate_limit_usage_takes_worst_window() {
        let usage = rate_limit_usage("20:1,100:120", "2:1,95:120").unwrap();
        assert!((usage - 0.95).abs() < 1e-9);
        // 창이 어긋나면 대응되는 것만 비교
        assert_eq!(rate_limit_usage("20:1", "5:120"), None);
    }

    #[test]
    fn resource_path_strips_host() {
        assert_eq!(
            resource_path("https://kr.api.riotgames.com/lol/league/v4/entries/by-puuid/x"),
            "/lol/league/v4/entries/by-puuid/x"
        );
    }
}
