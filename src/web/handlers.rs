use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Reply;

use super::State;
use crate::api::{
    ApiDiagnostics, ApiPlayerSummary, ApiReadableLiveGame, ApiReadableRank, ApiReadableTeam,
    ApiReadableTeamBrief, ApiReadableTeamMember,
};
use crate::history;
use crate::mongo;
use crate::riot::FetchError;
use crate::team::{self, Team, TeamMember, UploadableMember, UploadableTeam};

const DEFAULT_MATCH_COUNT: u32 = 10;
const MAX_MATCH_COUNT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub count: Option<u32>,
}

pub async fn player_summary_handler(
    state: Arc<State>,
    name: String,
    tag: String,
    query: SummaryQuery,
) -> std::result::Result<impl Reply, Infallible> {
    let count = query
        .count
        .unwrap_or(DEFAULT_MATCH_COUNT)
        .clamp(1, MAX_MATCH_COUNT);

    Ok(match build_player_summary(&state, &name, &tag, count).await {
        Ok(summary) => warp::reply::json(&summary).into_response(),
        Err(e) => fetch_error_response(&e),
    })
}

/// 계정 → 소환사 → 랭크 → 경기 목록 → 경기 상세의 전체 조립
///
/// 계정/소환사/경기 목록 실패는 하드 에러, 랭크 실패와 경기 상세의
/// 일부 실패는 경고 + 부분 데이터로 내려갑니다.
async fn build_player_summary(
    state: &State,
    name: &str,
    tag: &str,
    count: u32,
) -> std::result::Result<ApiPlayerSummary, FetchError> {
    let account = state.riot.account_by_riot_id(name, tag).await?;
    let summoner = state.riot.summoner_by_puuid(&account.puuid).await?;

    let mut warnings = Vec::new();

    let entries = match state.ranked_with_snapshot(&account.puuid).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("[Riot] ranked lookup failed for {}: {}", account.puuid, e);
            warnings.push("ranked standing unavailable".to_string());
            Vec::new()
        }
    };
    let solo_rank = entries
        .iter()
        .find(|e| e.is_solo_queue())
        .map(ApiReadableRank::from);
    let flex_rank = entries
        .iter()
        .find(|e| e.queue_type == "RANKED_FLEX_SR")
        .map(ApiReadableRank::from);

    let match_ids = state.riot.match_ids(&account.puuid, 0, count).await?;
    let batch = history::load_match_batch(&state.riot, &account.puuid, &match_ids).await?;
    let mut records = batch.records;

    let snapshots = match mongo::get_snapshots(state.snapshots_collection(), &account.puuid).await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            tracing::warn!("[Riot] snapshot history unavailable for {}: {:#}", account.puuid, e);
            Vec::new()
        }
    };
    history::attach_lp_changes(&snapshots, &mut records);

    if batch.failed > 0 {
        warnings.push(format!(
            "{}/{} matches failed to load",
            batch.failed,
            match_ids.len()
        ));
    }

    Ok(ApiPlayerSummary {
        account: account.into(),
        profile_icon_id: summoner.profile_icon_id,
        summoner_level: summoner.summoner_level,
        solo_rank,
        flex_rank,
        matches: records,
        failed_count: batch.failed,
        warning: if warnings.is_empty() {
            None
        } else {
            Some(warnings.join("; "))
        },
    })
}

pub async fn player_live_handler(
    state: Arc<State>,
    name: String,
    tag: String,
) -> std::result::Result<impl Reply, Infallible> {
    let account = match state.riot.account_by_riot_id(&name, &tag).await {
        Ok(account) => account,
        Err(e) => return Ok(fetch_error_response(&e)),
    };

    Ok(match state.riot.live_game(&account.puuid).await {
        Ok(game) => warp::reply::json(&ApiReadableLiveGame {
            in_game: true,
            game: Some(game.into()),
        })
        .into_response(),
        // 스펙테이터 404는 "게임 중 아님"
        Err(FetchError::NotFound) => warp::reply::json(&ApiReadableLiveGame {
            in_game: false,
            game: None,
        })
        .into_response(),
        Err(e) => fetch_error_response(&e),
    })
}

pub async fn teams_list_handler(state: Arc<State>) -> std::result::Result<impl Reply, Infallible> {
    Ok(match mongo::list_teams(state.teams_collection()).await {
        Ok(teams) => {
            let briefs: Vec<ApiReadableTeamBrief> =
                teams.iter().map(ApiReadableTeamBrief::from).collect();
            warp::reply::json(&briefs).into_response()
        }
        Err(e) => internal_error_response(&e),
    })
}

pub async fn teams_create_handler(
    state: Arc<State>,
    upload: UploadableTeam,
) -> std::result::Result<impl Reply, Infallible> {
    if !team::valid_slug(&upload.slug) || upload.name.trim().is_empty() {
        return Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "error": "invalid team slug or name" })),
            StatusCode::BAD_REQUEST,
        )
        .into_response());
    }

    let new_team: Team = upload.into();
    Ok(
        match mongo::insert_team(state.teams_collection(), &new_team).await {
            Ok(true) => warp::reply::with_status(
                warp::reply::json(&ApiReadableTeamBrief::from(&new_team)),
                StatusCode::CREATED,
            )
            .into_response(),
            Ok(false) => warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "error": "team already exists" })),
                StatusCode::CONFLICT,
            )
            .into_response(),
            Err(e) => internal_error_response(&e),
        },
    )
}

pub async fn team_get_handler(
    state: Arc<State>,
    slug: String,
) -> std::result::Result<impl Reply, Infallible> {
    let found = match mongo::get_team(state.teams_collection(), &slug).await {
        Ok(found) => found,
        Err(e) => return Ok(internal_error_response(&e)),
    };
    let stored = match found {
        Some(stored) => stored,
        None => return Ok(not_found_response("team not found")),
    };

    // 멤버별 랭크는 동시에 조회하되, 한 명의 실패가 팀 전체를 막지 않음
    let lookups = stored
        .members
        .iter()
        .map(|member| state.ranked_with_snapshot(&member.puuid));
    let results = futures_util::future::join_all(lookups).await;

    let mut members = Vec::new();
    let mut failed = 0;
    for (member, result) in stored.members.iter().zip(results) {
        let solo_rank = match result {
            Ok(entries) => entries
                .iter()
                .find(|e| e.is_solo_queue())
                .map(ApiReadableRank::from),
            Err(e) => {
                tracing::warn!("[Riot] ranked lookup failed for {}: {}", member.puuid, e);
                failed += 1;
                None
            }
        };
        members.push(ApiReadableTeamMember {
            puuid: member.puuid.clone(),
            game_name: member.game_name.clone(),
            tag_line: member.tag_line.clone(),
            role: member.role.clone(),
            solo_rank,
        });
    }

    let member_count = members.len();
    Ok(warp::reply::json(&ApiReadableTeam {
        slug: stored.slug,
        name: stored.name,
        members,
        failed_count: failed,
        warning: if failed == 0 {
            None
        } else {
            Some(format!("{}/{} member lookups failed", failed, member_count))
        },
    })
    .into_response())
}

pub async fn team_add_member_handler(
    state: Arc<State>,
    slug: String,
    upload: UploadableMember,
) -> std::result::Result<impl Reply, Infallible> {
    // Riot ID를 PUUID로 해석하는 것이 곧 존재 검증
    let account = match state
        .riot
        .account_by_riot_id(&upload.game_name, &upload.tag_line)
        .await
    {
        Ok(account) => account,
        Err(e) => return Ok(fetch_error_response(&e)),
    };

    let member = TeamMember {
        puuid: account.puuid,
        game_name: account.game_name,
        tag_line: account.tag_line,
        role: upload.role,
        added_at: chrono::Utc::now(),
    };

    Ok(
        match mongo::add_team_member(state.teams_collection(), &slug, &member).await {
            Ok(true) => warp::reply::json(&serde_json::json!({
                "puuid": member.puuid,
                "game_name": member.game_name,
                "tag_line": member.tag_line,
            }))
            .into_response(),
            Ok(false) => not_found_response("team not found"),
            Err(e) => internal_error_response(&e),
        },
    )
}

pub async fn team_remove_member_handler(
    state: Arc<State>,
    slug: String,
    puuid: String,
) -> std::result::Result<impl Reply, Infallible> {
    Ok(
        match mongo::remove_team_member(state.teams_collection(), &slug, &puuid).await {
            Ok(true) => warp::reply::json(&serde_json::json!({ "removed": true })).into_response(),
            Ok(false) => not_found_response("no such team or member"),
            Err(e) => internal_error_response(&e),
        },
    )
}

pub async fn diagnostics_handler(state: Arc<State>) -> std::result::Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&ApiDiagnostics {
        gate: state.riot.gate_snapshot(),
        metrics: state.riot.metrics().snapshot(),
    }))
}

/// 조회 에러를 상태 코드 보존한 JSON 응답으로
fn fetch_error_response(error: &FetchError) -> warp::reply::Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": error.to_string() })),
        status,
    )
    .into_response()
}

fn internal_error_response(error: &anyhow::Error) -> warp::reply::Response {
    tracing::error!("handler error: {:#?}", error);
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": "internal error" })),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

fn not_found_response(message: &str) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        StatusCode::NOT_FOUND,
    )
    .into_response()
}
