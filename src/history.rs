//! 경기 기록 후처리
//!
//! 캐시된 원본 경기 페이로드에서 조회 주체 관점의 레코드를 뽑아내고,
//! 퍼포먼스 순위와 LP 변동을 붙입니다. 원본 페이로드는 열 명의 참가자가
//! 공유하므로 절대 변형하지 않고, 파생 필드는 주체별 사본에만 붙습니다.

use serde::Serialize;

use crate::rank::{self, RankSnapshotDoc, RANKED_SOLO_QUEUE};
use crate::riot::model::MatchDto;
use crate::riot::{FetchError, RiotClient};
use crate::score;

/// 조회 주체 관점의 경기 한 판
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub match_id: String,
    pub queue_id: u16,
    pub queue_name: &'static str,
    /// 경기 생성 시각 (epoch ms)
    pub game_creation: i64,
    /// 경기 길이 (초)
    pub game_duration: i64,
    /// 경기 종료 시각 (epoch 초) — 스냅샷 브래키팅의 기준점
    pub game_end_secs: i64,
    pub champion_id: i32,
    pub champion_name: String,
    pub champ_level: u32,
    pub win: bool,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub cs: u32,
    pub gold_earned: u32,
    pub damage_to_champions: u32,
    pub vision_score: u32,
    pub items: [i32; 7],
    pub summoner_spells: [i32; 2],
    pub team_position: Option<String>,
    /// 경기 내 퍼포먼스 순위 (1 = 최고). 열 명 전체 기준의 전역 순위.
    pub performance_rank: u8,
    /// 이 판의 LP 변동. 복원 불가능하면 None으로 남음.
    pub lp_change: Option<i32>,
}

impl MatchRecord {
    /// 공유 페이로드에서 `puuid` 관점의 레코드 추출
    ///
    /// 주체가 참가자 목록에 없으면 None (잘못된 경기/페이로드).
    pub fn for_subject(detail: &MatchDto, puuid: &str) -> Option<Self> {
        let info = &detail.info;
        let me = info.participants.iter().find(|p| p.puuid == puuid)?;
        let ranks = score::performance_ranks(info);

        // 신형 페이로드는 종료 시각을 직접 주고, 구형은 생성+길이로 계산
        let game_end_secs = match info.game_end_timestamp {
            Some(end_ms) => end_ms / 1_000,
            None => info.game_creation / 1_000 + info.game_duration,
        };

        Some(Self {
            match_id: detail.metadata.match_id.clone(),
            queue_id: info.queue_id,
            queue_name: rank::queue_name(info.queue_id),
            game_creation: info.game_creation,
            game_duration: info.game_duration,
            game_end_secs,
            champion_id: me.champion_id,
            champion_name: me.champion_name.clone(),
            champ_level: me.champ_level,
            win: me.win,
            kills: me.kills,
            deaths: me.deaths,
            assists: me.assists,
            cs: me.cs_total(),
            gold_earned: me.gold_earned,
            damage_to_champions: me.total_damage_dealt_to_champions,
            vision_score: me.vision_score,
            items: [
                me.item0, me.item1, me.item2, me.item3, me.item4, me.item5, me.item6,
            ],
            summoner_spells: [me.summoner1_id, me.summoner2_id],
            team_position: me.team_position.clone(),
            performance_rank: ranks.get(puuid).copied().unwrap_or(0),
            lp_change: None,
        })
    }

    pub fn is_solo_ranked(&self) -> bool {
        self.queue_id == RANKED_SOLO_QUEUE
    }
}

/// 배치 로드 결과. 일부 실패는 개수로만 보고하고 성공분은 그대로 내려줍니다.
pub struct MatchBatch {
    pub records: Vec<MatchRecord>,
    pub failed: usize,
}

/// 경기 ID 목록을 동시 조회 (동시성은 클라이언트 게이트가 묶음)
///
/// 일부만 실패하면 성공분 + 실패 개수를 반환하고,
/// 전부 실패했을 때만 마지막 에러로 하드 실패합니다.
pub async fn load_match_batch(
    client: &RiotClient,
    puuid: &str,
    match_ids: &[String],
) -> Result<MatchBatch, FetchError> {
    let fetches = match_ids.iter().map(|id| client.match_detail(id));
    let results = futures_util::future::join_all(fetches).await;

    let mut records = Vec::new();
    let mut failed = 0;
    let mut last_error = None;

    for (match_id, result) in match_ids.iter().zip(results) {
        match result {
            Ok(detail) => match MatchRecord::for_subject(&detail, puuid) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!("[Riot] subject not among participants of {}", match_id);
                    failed += 1;
                    last_error = Some(FetchError::Decode {
                        resource: "match",
                        message: format!("subject not among participants of {}", match_id),
                    });
                }
            },
            Err(e) => {
                tracing::warn!("[Riot] failed to load match {}: {}", match_id, e);
                failed += 1;
                last_error = Some(e);
            }
        }
    }

    if records.is_empty() {
        if let Some(error) = last_error {
            return Err(error);
        }
    }

    Ok(MatchBatch { records, failed })
}

/// 솔로랭크 경기에 LP 변동을 붙임
///
/// `snapshots`는 recorded_at 오름차순. 브래키팅이 안 되거나 두 판 이상이
/// 끼어 있으면 해당 경기는 None으로 남습니다 (추정 금지).
pub fn attach_lp_changes(snapshots: &[RankSnapshotDoc], records: &mut [MatchRecord]) {
    for record in records.iter_mut() {
        if !record.is_solo_ranked() {
            continue;
        }
        record.lp_change = rank::lp_change_for(snapshots, record.game_end_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::{Division, Tier};
    use crate::riot::model::{MatchInfoDto, MatchMetadataDto, ParticipantDto};
    use chrono::TimeZone;

    fn participant(puuid: &str, kills: u32, deaths: u32, assists: u32, win: bool) -> ParticipantDto {
        ParticipantDto {
            puuid: puuid.to_string(),
            riot_id_game_name: Some(puuid.to_string()),
            riot_id_tagline: Some("KR1".to_string()),
            champion_id: 103,
            champion_name: "Ahri".to_string(),
            champ_level: 16,
            team_id: if win { 100 } else { 200 },
            win,
            kills,
            deaths,
            assists,
            total_minions_killed: 180,
            neutral_minions_killed: 12,
            gold_earned: 12_000,
            total_damage_dealt_to_champions: 20_000,
            vision_score: 25,
            item0: 3089,
            item1: 3020,
            item2: 0,
            item3: 0,
            item4: 0,
            item5: 0,
            item6: 3364,
            summoner1_id: 4,
            summoner2_id: 14,
            team_position: Some("MIDDLE".to_string()),
        }
    }

    fn match_dto(queue_id: u16, end_secs: i64) -> MatchDto {
        MatchDto {
            metadata: MatchMetadataDto {
                match_id: "KR_1".to_string(),
                participants: vec!["carry".to_string(), "feeder".to_string()],
            },
            info: MatchInfoDto {
                game_creation: (end_secs - 1_800) * 1_000,
                game_duration: 1_800,
                game_end_timestamp: Some(end_secs * 1_000),
                game_version: "14.1.1".to_string(),
                queue_id,
                participants: vec![
                    participant("carry", 12, 2, 9, true),
                    participant("feeder", 1, 9, 3, false),
                ],
            },
        }
    }

    fn snapshot(lp: i32, wins: u32, losses: u32, at_secs: i64) -> RankSnapshotDoc {
        RankSnapshotDoc {
            puuid: "carry".to_string(),
            tier: Tier::Gold,
            division: Division::II,
            league_points: lp,
            wins,
            losses,
            recorded_at: chrono::Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn extracts_subject_viewpoint() {
        let detail = match_dto(420, 1_500);
        let record = MatchRecord::for_subject(&detail, "carry").unwrap();

        assert_eq!(record.match_id, "KR_1");
        assert_eq!(record.queue_name, "Ranked Solo/Duo");
        assert_eq!(record.game_end_secs, 1_500);
        assert!(record.win);
        assert_eq!(record.kills, 12);
        assert_eq!(record.cs, 192);
        assert_eq!(record.performance_rank, 1);
        assert_eq!(record.lp_change, None);

        let other = MatchRecord::for_subject(&detail, "feeder").unwrap();
        assert_eq!(other.performance_rank, 2);

        assert!(MatchRecord::for_subject(&detail, "stranger").is_none());
    }

    #[test]
    fn attaches_lp_only_to_bracketed_solo_matches() {
        let snapshots = vec![snapshot(40, 10, 5, 1_000), snapshot(62, 11, 5, 2_000)];

        let detail = match_dto(420, 1_500);
        let mut records = vec![MatchRecord::for_subject(&detail, "carry").unwrap()];
        attach_lp_changes(&snapshots, &mut records);
        assert_eq!(records[0].lp_change, Some(22));

        // ARAM은 브래키팅되어도 건드리지 않음
        let aram = match_dto(450, 1_500);
        let mut records = vec![MatchRecord::for_subject(&aram, "carry").unwrap()];
        attach_lp_changes(&snapshots, &mut records);
        assert_eq!(records[0].lp_change, None);

        // 브래킷 밖의 경기는 비워 둠
        let detail = match_dto(420, 2_500);
        let mut records = vec![MatchRecord::for_subject(&detail, "carry").unwrap()];
        attach_lp_changes(&snapshots, &mut records);
        assert_eq!(records[0].lp_change, None);
    }

    #[test]
    fn two_games_between_snapshots_leaves_all_unattributed() {
        let snapshots = vec![snapshot(40, 10, 5, 1_000), snapshot(62, 12, 5, 2_000)];

        let mut records = vec![
            MatchRecord::for_subject(&match_dto(420, 1_300), "carry").unwrap(),
            MatchRecord::for_subject(&match_dto(420, 1_700), "carry").unwrap(),
        ];
        attach_lp_changes(&snapshots, &mut records);
        assert_eq!(records[0].lp_change, None);
        assert_eq!(records[1].lp_change, None);
    }
}
