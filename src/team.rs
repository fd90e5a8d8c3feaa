//! 팀 로스터 (수동 등록)
//!
//! 스크림/대회 상대 추적용으로 팀과 소속 플레이어를 저장합니다.
//! 랭크/전적은 저장하지 않고 조회 시점에 Riot API 레이어에서 가져옵니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 팀 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// URL 슬러그 (PK)
    pub slug: String,
    /// 표시 이름
    pub name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// 로스터 한 자리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
    /// 주 포지션 (TOP/JUNGLE/MIDDLE/BOTTOM/UTILITY)
    #[serde(default)]
    pub role: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub added_at: DateTime<Utc>,
}

/// 팀 생성 요청 본문
#[derive(Debug, Deserialize)]
pub struct UploadableTeam {
    pub slug: String,
    pub name: String,
}

impl From<UploadableTeam> for Team {
    fn from(value: UploadableTeam) -> Self {
        Self {
            slug: value.slug,
            name: value.name,
            created_at: Utc::now(),
            members: Vec::new(),
        }
    }
}

/// 멤버 추가 요청 본문. PUUID는 서버가 Riot ID로 해석합니다.
#[derive(Debug, Deserialize)]
pub struct UploadableMember {
    pub game_name: String,
    pub tag_line: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// 슬러그 검증: 소문자/숫자/하이픈, 3~32자
pub fn valid_slug(slug: &str) -> bool {
    (3..=32).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert!(valid_slug("t1-academy"));
        assert!(valid_slug("drx"));
        assert!(!valid_slug("ab"));
        assert!(!valid_slug("Upper-Case"));
        assert!(!valid_slug("has space"));
        assert!(!valid_slug(&"x".repeat(33)));
    }
}
