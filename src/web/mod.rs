use anyhow::{Context, Result};
use mongodb::{options::IndexOptions, Client as MongoClient, Collection, IndexModel};
use std::sync::Arc;

use crate::config::Config;
use crate::rank::RankSnapshotDoc;
use crate::riot::cache::ApiCacheDoc;
use crate::riot::model::LeagueEntryDto;
use crate::riot::{ApiCache, FetchError, RiotClient};
use crate::team::Team;

pub mod background;
pub mod handlers;
pub mod routes;

pub async fn start(config: Arc<Config>) -> Result<()> {
    let state = State::new(Arc::clone(&config)).await?;

    // Background tasks
    background::spawn_roster_refresh_task(Arc::clone(&state));

    tracing::info!("listening at {}", config.web.host);
    warp::serve(routes::router(state)).run(config.web.host).await;
    Ok(())
}

pub struct State {
    pub mongo: MongoClient,
    pub riot: RiotClient,
    pub config: Arc<Config>,
}

impl State {
    pub async fn new(config: Arc<Config>) -> Result<Arc<Self>> {
        let mongo = MongoClient::with_uri_str(&config.mongo.url)
            .await
            .context("could not create mongodb client")?;

        let cache = ApiCache::new(mongo.database("sboard").collection("api_cache"));
        let riot = RiotClient::new(&config.riot, cache);

        let state = Arc::new(Self {
            mongo,
            riot,
            config,
        });

        // Initialize Indexes
        state.ensure_indexes().await?;

        Ok(state)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        // Cache Unique Index
        self.cache_collection()
            .create_index(
                IndexModel::builder()
                    .keys(mongodb::bson::doc! {
                        "cache_key": 1,
                    })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await
            .context("could not create cache index")?;

        // Snapshot history index
        self.snapshots_collection()
            .create_index(
                IndexModel::builder()
                    .keys(mongodb::bson::doc! {
                        "puuid": 1,
                        "recorded_at": 1,
                    })
                    .build(),
                None,
            )
            .await
            .context("could not create snapshot index")?;

        // Teams Unique Index
        self.teams_collection()
            .create_index(
                IndexModel::builder()
                    .keys(mongodb::bson::doc! {
                        "slug": 1,
                    })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await
            .context("could not create team index")?;

        Ok(())
    }

    pub fn cache_collection(&self) -> Collection<ApiCacheDoc> {
        self.mongo.database("sboard").collection("api_cache")
    }

    pub fn snapshots_collection(&self) -> Collection<RankSnapshotDoc> {
        self.mongo.database("sboard").collection("rank_snapshots")
    }

    pub fn teams_collection(&self) -> Collection<Team> {
        self.mongo.database("sboard").collection("teams")
    }

    /// 랭크 조회 + 신선한 데이터였으면 솔로랭크 스냅샷 기록
    ///
    /// 스냅샷 기록 실패는 조회 자체를 막지 않습니다 (다음 신선 조회가 메움).
    pub async fn ranked_with_snapshot(&self, puuid: &str) -> Result<Vec<LeagueEntryDto>, FetchError> {
        let lookup = self.riot.ranked_entries(puuid).await?;

        if lookup.fresh {
            if let Some(solo) = lookup.entries.iter().find(|e| e.is_solo_queue()) {
                if let Err(e) =
                    crate::rank::record_snapshot(self.snapshots_collection(), puuid, solo).await
                {
                    tracing::warn!("[Riot] failed to record snapshot for {}: {:#}", puuid, e);
                }
            }
        }

        Ok(lookup.entries)
    }
}
