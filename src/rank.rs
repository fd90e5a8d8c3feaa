//! 랭크 티어/LP 모델과 게임별 LP 변동 복원
//!
//! 랭크 API는 현재 상태만 주기 때문에, 신선한 랭크 조회 때마다 스냅샷을
//! 남겨두고(append-only) 두 스냅샷 사이에 정확히 한 판이 있을 때만
//! 그 판의 LP 변동을 역산합니다. 두 판 이상이 끼어 있으면 배분이
//! 모호하므로 추정하지 않고 비워 둡니다.

use chrono::{DateTime, Utc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::riot::model::LeagueEntryDto;

/// 솔로 랭크 큐 ID. LP 추적은 이 큐만 대상입니다.
pub const RANKED_SOLO_QUEUE: u16 = 420;

/// 티어. API 문자열(`"GOLD"`) 그대로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

/// 티어 내 디비전. 마스터 이상은 API가 항상 `"I"`를 돌려줍니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Division {
    I,
    II,
    III,
    IV,
}

impl Tier {
    /// 마스터 이상 여부. 이들은 디비전 없이 LP만으로 구분됩니다.
    pub fn is_apex(self) -> bool {
        matches!(self, Tier::Master | Tier::Grandmaster | Tier::Challenger)
    }

    /// 디비전이 있는 티어의 블록 인덱스 (아이언=0 … 다이아=6)
    fn block_index(self) -> i32 {
        match self {
            Tier::Iron => 0,
            Tier::Bronze => 1,
            Tier::Silver => 2,
            Tier::Gold => 3,
            Tier::Platinum => 4,
            Tier::Emerald => 5,
            Tier::Diamond => 6,
            // apex는 block_index를 쓰지 않음
            Tier::Master | Tier::Grandmaster | Tier::Challenger => 7,
        }
    }
}

impl Division {
    /// 티어 안에서의 서브블록 (IV=0 … I=3)
    fn sub_block(self) -> i32 {
        match self {
            Division::IV => 0,
            Division::III => 1,
            Division::II => 2,
            Division::I => 3,
        }
    }
}

/// 다이아 I 위로 마스터/그마/챌이 공유하는 평탄 구간의 시작점
const APEX_BASE: i32 = 7 * 400;

/// 티어/디비전/LP를 단일 절대 LP 척도로 사상
///
/// 디비전 티어는 티어당 400점 블록, 디비전당 100점 서브블록.
/// 승급/강등을 가로지르는 뺄셈이 실제 LP 변동이 되도록 단조 증가합니다.
pub fn flatten(tier: Tier, division: Division, lp: i32) -> i32 {
    if tier.is_apex() {
        APEX_BASE + lp
    } else {
        tier.block_index() * 400 + division.sub_block() * 100 + lp
    }
}

/// 랭크 관측 스냅샷 (append-only, 수정/삭제 없음)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankSnapshotDoc {
    pub puuid: String,
    pub tier: Tier,
    pub division: Division,
    pub league_points: i32,
    pub wins: u32,
    pub losses: u32,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub recorded_at: DateTime<Utc>,
}

impl RankSnapshotDoc {
    pub fn from_entry(puuid: &str, entry: &LeagueEntryDto) -> Self {
        Self {
            puuid: puuid.to_string(),
            tier: entry.tier,
            division: entry.rank,
            league_points: entry.league_points,
            wins: entry.wins,
            losses: entry.losses,
            recorded_at: Utc::now(),
        }
    }

    /// 관측 시점까지의 누적 판수
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn absolute_lp(&self) -> i32 {
        flatten(self.tier, self.division, self.league_points)
    }
}

/// 스냅샷을 남길지 판정. 판수가 안 변했으면 기록하지 않습니다.
///
/// 랭크만 반복 조회되는 동안 히스토리가 무의미하게 불어나는 것을 막습니다.
pub fn should_record(prev: &RankSnapshotDoc, wins: u32, losses: u32) -> bool {
    prev.wins != wins || prev.losses != losses
}

/// 신선한 랭크 조회 후 스냅샷 기록 (캐시 히트 경로에서는 호출하지 않음)
///
/// 기록했으면 true, 판수가 그대로라 건너뛰었으면 false.
pub async fn record_snapshot(
    collection: Collection<RankSnapshotDoc>,
    puuid: &str,
    entry: &LeagueEntryDto,
) -> anyhow::Result<bool> {
    if let Some(prev) = crate::mongo::latest_snapshot(collection.clone(), puuid).await? {
        if !should_record(&prev, entry.wins, entry.losses) {
            return Ok(false);
        }
    }

    crate::mongo::insert_snapshot(collection, &RankSnapshotDoc::from_entry(puuid, entry)).await?;
    Ok(true)
}

/// 경기 종료 시각을 감싸는 스냅샷 쌍으로 LP 변동을 복원
///
/// `snapshots`는 recorded_at 오름차순이어야 합니다.
/// 감싸는 쌍이 없거나, 그 사이 판수가 정확히 1이 아니면 None.
pub fn lp_change_for(snapshots: &[RankSnapshotDoc], game_end_secs: i64) -> Option<i32> {
    let before = snapshots
        .iter()
        .filter(|s| s.recorded_at.timestamp() <= game_end_secs)
        .last()?;
    let after = snapshots
        .iter()
        .find(|s| s.recorded_at.timestamp() > game_end_secs)?;

    let games_between = after.games() as i64 - before.games() as i64;
    if games_between != 1 {
        return None;
    }

    Some(after.absolute_lp() - before.absolute_lp())
}

lazy_static::lazy_static! {
    /// 큐 ID -> 표시 이름
    pub static ref QUEUES: HashMap<u16, &'static str> = {
        let mut m = HashMap::new();
        m.insert(400, "Normal Draft");
        m.insert(420, "Ranked Solo/Duo");
        m.insert(430, "Normal Blind");
        m.insert(440, "Ranked Flex");
        m.insert(450, "ARAM");
        m.insert(490, "Quickplay");
        m.insert(700, "Clash");
        m.insert(1700, "Arena");
        m
    };
}

pub fn queue_name(queue_id: u16) -> &'static str {
    QUEUES.get(&queue_id).copied().unwrap_or("Other")
}

/// 티어 표시용 색상 클래스
pub fn tier_color_class(tier: Tier) -> &'static str {
    match tier {
        Tier::Iron => "tier-iron",
        Tier::Bronze => "tier-bronze",
        Tier::Silver => "tier-silver",
        Tier::Gold => "tier-gold",
        Tier::Platinum => "tier-platinum",
        Tier::Emerald => "tier-emerald",
        Tier::Diamond => "tier-diamond",
        Tier::Master => "tier-master",
        Tier::Grandmaster => "tier-grandmaster",
        Tier::Challenger => "tier-challenger",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(
        tier: Tier,
        division: Division,
        lp: i32,
        wins: u32,
        losses: u32,
        at_secs: i64,
    ) -> RankSnapshotDoc {
        RankSnapshotDoc {
            puuid: "puuid-1".to_string(),
            tier,
            division,
            league_points: lp,
            wins,
            losses,
            recorded_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn flatten_is_monotone_across_promotions() {
        assert!(flatten(Tier::Gold, Division::I, 99) < flatten(Tier::Platinum, Division::IV, 0));
        assert!(flatten(Tier::Iron, Division::IV, 0) < flatten(Tier::Iron, Division::III, 0));
        assert!(flatten(Tier::Diamond, Division::I, 99) < flatten(Tier::Master, Division::I, 0));
        // apex는 한 구간을 공유하고 LP로만 구분
        assert_eq!(
            flatten(Tier::Master, Division::I, 250),
            flatten(Tier::Grandmaster, Division::I, 250)
        );
    }

    #[test]
    fn single_game_bracket_attributes_lp() {
        let snapshots = vec![
            snapshot(Tier::Gold, Division::II, 40, 10, 5, 1_000),
            snapshot(Tier::Gold, Division::II, 62, 11, 5, 2_000),
        ];
        assert_eq!(lp_change_for(&snapshots, 1_500), Some(22));
    }

    #[test]
    fn promotion_across_division_is_a_true_delta() {
        // 골드 II 85 -> 골드 I 10: +25
        let snapshots = vec![
            snapshot(Tier::Gold, Division::II, 85, 20, 10, 1_000),
            snapshot(Tier::Gold, Division::I, 10, 21, 10, 2_000),
        ];
        assert_eq!(lp_change_for(&snapshots, 1_200), Some(25));
    }

    #[test]
    fn multi_game_bracket_abstains() {
        let snapshots = vec![
            snapshot(Tier::Gold, Division::II, 40, 10, 5, 1_000),
            snapshot(Tier::Gold, Division::II, 62, 12, 5, 2_000),
        ];
        assert_eq!(lp_change_for(&snapshots, 1_500), None);
    }

    #[test]
    fn missing_bracket_side_abstains() {
        let snapshots = vec![snapshot(Tier::Gold, Division::II, 40, 10, 5, 1_000)];
        // after가 없음
        assert_eq!(lp_change_for(&snapshots, 1_500), None);
        // before가 없음
        assert_eq!(lp_change_for(&snapshots, 500), None);
        assert_eq!(lp_change_for(&[], 1_500), None);
    }

    #[test]
    fn zero_games_between_observations_abstains() {
        let snapshots = vec![
            snapshot(Tier::Gold, Division::II, 40, 10, 5, 1_000),
            snapshot(Tier::Gold, Division::II, 40, 10, 5, 2_000),
        ];
        assert_eq!(lp_change_for(&snapshots, 1_500), None);
    }

    #[test]
    fn unchanged_record_is_skipped() {
        let prev = snapshot(Tier::Gold, Division::II, 40, 10, 5, 1_000);
        assert!(!should_record(&prev, 10, 5));
        assert!(should_record(&prev, 11, 5));
        assert!(should_record(&prev, 10, 6));
    }
}
