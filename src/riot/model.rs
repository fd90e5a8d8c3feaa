//! Riot API 응답 스키마
//!
//! 업스트림 페이로드는 전부 여기 정의된 구조체로 디코드합니다.
//! 스키마가 안 맞으면 나중에 터지는 대신 `FetchError::Decode`로 닫습니다.
//! 경기 상세는 원본 JSON 그대로 캐시되고, 타입 변환은 읽는 쪽에서 합니다.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FetchError;
use crate::rank::{Division, Tier};

/// 실패 시 닫히는 디코드 단계
pub fn decode<T: DeserializeOwned>(resource: &'static str, value: &Value) -> Result<T, FetchError> {
    serde_json::from_value(value.clone()).map_err(|e| FetchError::Decode {
        resource,
        message: e.to_string(),
    })
}

/// account-v1: Riot ID(`name#tag`) → PUUID
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
}

/// summoner-v4
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerDto {
    pub puuid: String,
    pub profile_icon_id: i32,
    pub revision_date: i64,
    pub summoner_level: i64,
}

/// league-v4 엔트리 (큐별 1개)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntryDto {
    pub queue_type: String,
    pub tier: Tier,
    pub rank: Division,
    pub league_points: i32,
    pub wins: u32,
    pub losses: u32,
    #[serde(default)]
    pub hot_streak: bool,
}

impl LeagueEntryDto {
    pub fn is_solo_queue(&self) -> bool {
        self.queue_type == "RANKED_SOLO_5x5"
    }
}

/// match-v5 상세
#[derive(Debug, Clone, Deserialize)]
pub struct MatchDto {
    pub metadata: MatchMetadataDto,
    pub info: MatchInfoDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadataDto {
    pub match_id: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfoDto {
    /// 경기 생성 시각 (epoch ms)
    pub game_creation: i64,
    /// 경기 길이 (초)
    pub game_duration: i64,
    /// 경기 종료 시각 (epoch ms). 구버전 페이로드에는 없음.
    #[serde(default)]
    pub game_end_timestamp: Option<i64>,
    pub game_version: String,
    pub queue_id: u16,
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub puuid: String,
    #[serde(default)]
    pub riot_id_game_name: Option<String>,
    #[serde(default)]
    pub riot_id_tagline: Option<String>,
    pub champion_id: i32,
    pub champion_name: String,
    pub champ_level: u32,
    pub team_id: u16,
    pub win: bool,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub total_minions_killed: u32,
    #[serde(default)]
    pub neutral_minions_killed: u32,
    pub gold_earned: u32,
    pub total_damage_dealt_to_champions: u32,
    #[serde(default)]
    pub vision_score: u32,
    pub item0: i32,
    pub item1: i32,
    pub item2: i32,
    pub item3: i32,
    pub item4: i32,
    pub item5: i32,
    pub item6: i32,
    #[serde(rename = "summoner1Id")]
    pub summoner1_id: i32,
    #[serde(rename = "summoner2Id")]
    pub summoner2_id: i32,
    #[serde(default)]
    pub team_position: Option<String>,
}

impl ParticipantDto {
    /// 분당 CS (정글 몹 포함)
    pub fn cs_total(&self) -> u32 {
        self.total_minions_killed + self.neutral_minions_killed
    }
}

/// spectator-v5 진행 중 게임
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameInfo {
    pub game_id: i64,
    #[serde(default)]
    pub game_queue_config_id: Option<i64>,
    /// 경기 경과 시간 (초)
    pub game_length: i64,
    pub game_start_time: i64,
    pub participants: Vec<CurrentGameParticipant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGameParticipant {
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub riot_id: Option<String>,
    pub champion_id: i64,
    pub team_id: i64,
    #[serde(rename = "spell1Id")]
    pub spell1_id: i64,
    #[serde(rename = "spell2Id")]
    pub spell2_id: i64,
}

/// Data Dragon 정적 카탈로그 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Champion,
    Item,
    SummonerSpell,
}

impl StaticKind {
    /// CDN 파일 이름
    pub fn file_name(self) -> &'static str {
        match self {
            StaticKind::Champion => "champion.json",
            StaticKind::Item => "item.json",
            StaticKind::SummonerSpell => "summoner.json",
        }
    }

    /// 캐시 키 조각
    pub fn key_name(self) -> &'static str {
        match self {
            StaticKind::Champion => "champion",
            StaticKind::Item => "item",
            StaticKind::SummonerSpell => "spell",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_league_entry() {
        let value = json!({
            "queueType": "RANKED_SOLO_5x5",
            "tier": "GOLD",
            "rank": "II",
            "leaguePoints": 40,
            "wins": 10,
            "losses": 5,
            "hotStreak": true,
        });
        let entry: LeagueEntryDto = decode("ranked", &value).unwrap();
        assert!(entry.is_solo_queue());
        assert_eq!(entry.tier, Tier::Gold);
        assert_eq!(entry.rank, Division::II);
        assert_eq!(entry.league_points, 40);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let value = json!({ "puuid": 42 });
        let err = decode::<AccountDto>("account", &value).unwrap_err();
        match err {
            FetchError::Decode { resource, .. } => assert_eq!(resource, "account"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
