use std::{sync::Arc, time::Duration};
use anyhow::Result;

use super::State;
use crate::mongo;

/// 로스터 갱신 주기. 랭크 캐시 TTL(30분)보다 길어 매 사이클이 신선 조회가 됨.
const REFRESH_INTERVAL: Duration = Duration::from_secs(35 * 60);

pub fn spawn_roster_refresh_task(state: Arc<State>) {
    if !state.riot.is_configured() {
        tracing::info!("Riot API key not configured, skipping roster refresh service.");
        return;
    }

    tokio::task::spawn(async move {
        tracing::info!("Starting roster refresh service...");
        loop {
            if let Err(e) = refresh_rosters_task(&state).await {
                tracing::error!("Error in roster refresh task: {:?}", e);
            }
            tokio::time::sleep(REFRESH_INTERVAL).await;
        }
    });
}

/// 등록된 전체 로스터의 랭크를 순회 갱신
///
/// 신선 조회가 일어난 멤버는 스냅샷이 기록되어, 페이지 조회가 없어도
/// LP 복원에 쓸 히스토리가 쌓입니다. 멤버 한 명의 실패는 사이클을
/// 멈추지 않습니다.
async fn refresh_rosters_task(state: &State) -> Result<()> {
    let teams = mongo::list_teams(state.teams_collection()).await?;

    // 여러 팀에 겹치는 멤버 중복 제거
    let mut puuids: Vec<String> = teams
        .iter()
        .flat_map(|team| team.members.iter().map(|m| m.puuid.clone()))
        .collect();
    puuids.sort_unstable();
    puuids.dedup();

    tracing::info!(
        "[Riot] Refreshing {} roster members across {} teams",
        puuids.len(),
        teams.len()
    );

    let mut refreshed = 0;
    let mut failed = 0;

    for puuid in &puuids {
        match state.ranked_with_snapshot(puuid).await {
            Ok(_) => refreshed += 1,
            Err(e) => {
                tracing::warn!("[Riot] roster refresh failed for {}: {}", puuid, e);
                failed += 1;
            }
        }
        // 사용자 트래픽에 게이트를 양보
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    tracing::info!(
        "[Riot] Roster refresh complete: {} refreshed, {} failed",
        refreshed,
        failed
    );
    Ok(())
}
