use anyhow::Context;
use futures_util::StreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneOptions, FindOptions, UpdateOptions};
use mongodb::Collection;

use crate::rank::RankSnapshotDoc;
use crate::team::{Team, TeamMember};

// =============================================================================
// 랭크 스냅샷 (append-only)
// =============================================================================

/// 가장 최근 스냅샷 조회 (기록 여부 판정용)
pub async fn latest_snapshot(
    collection: Collection<RankSnapshotDoc>,
    puuid: &str,
) -> anyhow::Result<Option<RankSnapshotDoc>> {
    let opts = FindOneOptions::builder()
        .sort(doc! { "recorded_at": -1 })
        .build();

    collection
        .find_one(doc! { "puuid": puuid }, opts)
        .await
        .context("could not read latest snapshot")
}

/// 스냅샷 추가. 갱신/삭제는 없음.
pub async fn insert_snapshot(
    collection: Collection<RankSnapshotDoc>,
    snapshot: &RankSnapshotDoc,
) -> anyhow::Result<()> {
    collection
        .insert_one(snapshot, None)
        .await
        .context("could not insert snapshot")?;
    Ok(())
}

/// 한 주체의 전체 스냅샷 히스토리 (recorded_at 오름차순)
pub async fn get_snapshots(
    collection: Collection<RankSnapshotDoc>,
    puuid: &str,
) -> anyhow::Result<Vec<RankSnapshotDoc>> {
    let opts = FindOptions::builder()
        .sort(doc! { "recorded_at": 1 })
        .build();

    let cursor = collection
        .find(doc! { "puuid": puuid }, opts)
        .await
        .context("could not read snapshots")?;

    let snapshots = cursor
        .filter_map(|res| async move {
            match res {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!("Error reading snapshot: {:?}", e);
                    None
                }
            }
        })
        .collect::<Vec<_>>()
        .await;

    Ok(snapshots)
}

// =============================================================================
// 팀 로스터
// =============================================================================

/// 팀 생성. 이미 있으면 건드리지 않음. 생성했으면 true.
pub async fn insert_team(collection: Collection<Team>, team: &Team) -> anyhow::Result<bool> {
    let opts = UpdateOptions::builder().upsert(true).build();
    let bson_value = mongodb::bson::to_bson(team)?;

    let result = collection
        .update_one(
            doc! { "slug": &team.slug },
            doc! { "$setOnInsert": bson_value },
            opts,
        )
        .await
        .context("could not insert team")?;

    Ok(result.upserted_id.is_some())
}

pub async fn get_team(collection: Collection<Team>, slug: &str) -> anyhow::Result<Option<Team>> {
    collection
        .find_one(doc! { "slug": slug }, None)
        .await
        .context("could not read team")
}

pub async fn list_teams(collection: Collection<Team>) -> anyhow::Result<Vec<Team>> {
    let opts = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let cursor = collection
        .find(doc! {}, opts)
        .await
        .context("could not list teams")?;

    let teams = cursor
        .filter_map(|res| async move { res.ok() })
        .collect::<Vec<_>>()
        .await;

    Ok(teams)
}

/// 멤버 추가 (같은 PUUID가 이미 있으면 교체). 팀이 없으면 false.
pub async fn add_team_member(
    collection: Collection<Team>,
    slug: &str,
    member: &TeamMember,
) -> anyhow::Result<bool> {
    // 중복 자리부터 비움
    collection
        .update_one(
            doc! { "slug": slug },
            doc! { "$pull": { "members": { "puuid": &member.puuid } } },
            None,
        )
        .await
        .context("could not clear existing roster slot")?;

    let member_bson = mongodb::bson::to_bson(member)?;
    let result = collection
        .update_one(
            doc! { "slug": slug },
            doc! { "$push": { "members": member_bson } },
            None,
        )
        .await
        .context("could not add team member")?;

    Ok(result.matched_count > 0)
}

/// 멤버 제거. 실제로 빠졌으면 true.
pub async fn remove_team_member(
    collection: Collection<Team>,
    slug: &str,
    puuid: &str,
) -> anyhow::Result<bool> {
    let result = collection
        .update_one(
            doc! { "slug": slug },
            doc! { "$pull": { "members": { "puuid": puuid } } },
            None,
        )
        .await
        .context("could not remove team member")?;

    Ok(result.modified_count > 0)
}
