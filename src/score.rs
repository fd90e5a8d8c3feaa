//! 경기 내 퍼포먼스 점수
//!
//! 한 경기의 열 명을 같은 잣대로 줄 세우기 위한 순수 계산입니다.
//! 네트워크/저장소 접근 없음. 점수 자체는 화면에 쓰지 않고
//! 순위(1 = 그 경기 최고)만 내려갑니다.

use std::collections::HashMap;

use crate::riot::model::{MatchInfoDto, ParticipantDto};

/// 참가자 한 명의 퍼포먼스 점수
///
/// KDA를 중심으로 분당 CS/딜량/시야 기여를 더합니다. 데스 0은
/// 나눗셈 대신 킬 관여에 보너스를 줍니다.
pub fn performance_score(participant: &ParticipantDto, game_duration_secs: i64) -> f64 {
    let minutes = (game_duration_secs as f64 / 60.0).max(1.0);

    let takedowns = (participant.kills + participant.assists) as f64;
    let kda = if participant.deaths == 0 {
        takedowns * 1.2
    } else {
        takedowns / participant.deaths as f64
    };

    let cs_per_min = participant.cs_total() as f64 / minutes;
    let damage_per_min = participant.total_damage_dealt_to_champions as f64 / minutes;
    let vision_per_min = participant.vision_score as f64 / minutes;

    let win_bonus = if participant.win { 1.0 } else { 0.0 };

    kda * 2.0 + cs_per_min * 0.5 + damage_per_min / 100.0 + vision_per_min * 1.5 + win_bonus
}

/// 경기 전체의 퍼포먼스 순위 (puuid → 순위, 1 = 최고)
pub fn performance_ranks(info: &MatchInfoDto) -> HashMap<&str, u8> {
    let mut scored: Vec<(&str, f64)> = info
        .participants
        .iter()
        .map(|p| (p.puuid.as_str(), performance_score(p, info.game_duration)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (puuid, _))| (puuid, (i + 1) as u8))
        .collect()
}
