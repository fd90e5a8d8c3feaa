use serde::Serialize;

use crate::history::MatchRecord;
use crate::rank::{self, Division, Tier};
use crate::riot::limiter::GateSnapshot;
use crate::riot::metrics::MetricsSnapshot;
use crate::riot::model::{AccountDto, CurrentGameInfo, LeagueEntryDto};
use crate::team::Team;

/// A version of the raw upstream payloads with more sensible formatting,
/// implementation details hidden, and derived fields resolved.
#[derive(Serialize)]
pub struct ApiPlayerSummary {
    pub account: ApiReadableAccount,
    pub profile_icon_id: i32,
    pub summoner_level: i64,
    pub solo_rank: Option<ApiReadableRank>,
    pub flex_rank: Option<ApiReadableRank>,
    pub matches: Vec<MatchRecord>,
    /// 요청했던 경기 수 대비 실패 수. 일부 실패는 경고로만 내려간다.
    pub failed_count: usize,
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct ApiReadableAccount {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
}

impl From<AccountDto> for ApiReadableAccount {
    fn from(value: AccountDto) -> Self {
        Self {
            puuid: value.puuid,
            game_name: value.game_name,
            tag_line: value.tag_line,
        }
    }
}

#[derive(Serialize)]
pub struct ApiReadableRank {
    pub queue: String,
    pub tier: Tier,
    pub division: Division,
    pub league_points: i32,
    pub wins: u32,
    pub losses: u32,
    pub winrate: f64,
    pub tier_color_class: &'static str,
}

impl From<&LeagueEntryDto> for ApiReadableRank {
    fn from(value: &LeagueEntryDto) -> Self {
        let games = value.wins + value.losses;
        let winrate = if games == 0 {
            0.0
        } else {
            value.wins as f64 / games as f64 * 100.0
        };
        Self {
            queue: value.queue_type.clone(),
            tier: value.tier,
            division: value.rank,
            league_points: value.league_points,
            wins: value.wins,
            losses: value.losses,
            winrate,
            tier_color_class: rank::tier_color_class(value.tier),
        }
    }
}

#[derive(Serialize)]
pub struct ApiReadableTeam {
    pub slug: String,
    pub name: String,
    pub members: Vec<ApiReadableTeamMember>,
    pub failed_count: usize,
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct ApiReadableTeamMember {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
    pub role: Option<String>,
    /// 멤버별 랭크 조회가 실패하면 None (팀 전체 조회는 계속 진행)
    pub solo_rank: Option<ApiReadableRank>,
}

/// 멤버 랭크 없이 팀 목록에 쓰는 얇은 버전
#[derive(Serialize)]
pub struct ApiReadableTeamBrief {
    pub slug: String,
    pub name: String,
    pub member_count: usize,
}

impl From<&Team> for ApiReadableTeamBrief {
    fn from(value: &Team) -> Self {
        Self {
            slug: value.slug.clone(),
            name: value.name.clone(),
            member_count: value.members.len(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiReadableLiveGame {
    pub in_game: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<ApiReadableLiveGameInfo>,
}

#[derive(Serialize)]
pub struct ApiReadableLiveGameInfo {
    pub game_id: i64,
    pub queue: &'static str,
    pub game_length_secs: i64,
    pub participants: Vec<ApiReadableLiveParticipant>,
}

#[derive(Serialize)]
pub struct ApiReadableLiveParticipant {
    pub riot_id: Option<String>,
    pub champion_id: i64,
    pub team_id: i64,
    pub summoner_spells: [i64; 2],
}

impl From<CurrentGameInfo> for ApiReadableLiveGameInfo {
    fn from(value: CurrentGameInfo) -> Self {
        let queue = value
            .game_queue_config_id
            .map(|id| rank::queue_name(id as u16))
            .unwrap_or("Other");
        Self {
            game_id: value.game_id,
            queue,
            game_length_secs: value.game_length,
            participants: value
                .participants
                .into_iter()
                .map(|p| ApiReadableLiveParticipant {
                    riot_id: p.riot_id,
                    champion_id: p.champion_id,
                    team_id: p.team_id,
                    summoner_spells: [p.spell1_id, p.spell2_id],
                })
                .collect(),
        }
    }
}

/// 게이트/카운터 상태. 운영 중 백프레셔 신호 확인용.
#[derive(Serialize)]
pub struct ApiDiagnostics {
    pub gate: GateSnapshot,
    pub metrics: MetricsSnapshot,
}
