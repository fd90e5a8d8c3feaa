use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub web: Web,
    pub mongo: Mongo,
    pub riot: Riot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Web {
    pub host: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mongo {
    pub url: String,
}

/// Riot API 설정
///
/// `api_key`가 없으면 서버는 뜨지만 모든 업스트림 조회가
/// 설정 오류로 즉시 실패합니다 (키 없이 재시도하지 않음).
#[derive(Debug, Clone, Deserialize)]
pub struct Riot {
    /// X-Riot-Token 헤더로 전달되는 정적 API 키
    pub api_key: Option<String>,
    /// 플랫폼 라우팅 (summoner/league/spectator): kr, na1, euw1 등
    #[serde(default = "default_platform")]
    pub platform: String,
    /// 리전 라우팅 (account/match): asia, americas, europe
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_platform() -> String {
    "kr".to_string()
}

fn default_region() -> String {
    "asia".to_string()
}
