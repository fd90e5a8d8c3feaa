//! 응답 TTL 캐시
//!
//! MongoDB `api_cache` 컬렉션을 백엔드로 쓰는 키-값 캐시입니다.
//! 엔트리에는 TTL이 저장되지 않고, 읽는 쪽이 리소스 종류에 맞는 TTL을
//! 매 호출마다 공급합니다. 만료는 읽기 시점에 삭제로 처리합니다
//! (백그라운드 스윕 없음). 프로세스가 재시작해도 캐시는 유지됩니다.

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use mongodb::bson::{doc, Bson};
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// 리소스별 TTL (초). 불변에 가까운 데이터일수록 길게.
pub const TTL_ACCOUNT: i64 = 86_400;
pub const TTL_SUMMONER: i64 = 86_400;
pub const TTL_RANKED: i64 = 1_800;
pub const TTL_MATCH_IDS: i64 = 300;
pub const TTL_MATCH: i64 = 604_800;
pub const TTL_VERSION: i64 = 21_600;
pub const TTL_STATIC: i64 = 86_400;

/// 캐시 엔트리 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCacheDoc {
    /// 리소스 키 (예: `match:KR_7001234567`)
    pub cache_key: String,
    /// 업스트림 응답 본문 (JSON 그대로)
    pub payload: Bson,
    /// 저장 시각
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub cached_at: DateTime<Utc>,
}

/// 만료 판정. `cached_at`에서 `ttl_secs`가 지났으면 만료.
pub fn is_entry_expired(cached_at: DateTime<Utc>, ttl_secs: i64, now: DateTime<Utc>) -> bool {
    now - cached_at > TimeDelta::try_seconds(ttl_secs).unwrap()
}

#[derive(Clone)]
pub struct ApiCache {
    collection: Collection<ApiCacheDoc>,
}

impl ApiCache {
    pub fn new(collection: Collection<ApiCacheDoc>) -> Self {
        Self { collection }
    }

    /// 캐시 조회. 만료된 엔트리는 삭제하고 미스로 취급합니다.
    pub async fn get(&self, key: &str, ttl_secs: i64) -> anyhow::Result<Option<Value>> {
        let found = self
            .collection
            .find_one(doc! { "cache_key": key }, None)
            .await
            .context("could not read cache entry")?;

        let entry = match found {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if is_entry_expired(entry.cached_at, ttl_secs, Utc::now()) {
            self.collection
                .delete_one(doc! { "cache_key": key }, None)
                .await
                .context("could not delete expired cache entry")?;
            return Ok(None);
        }

        let value = serde_json::to_value(&entry.payload)
            .context("could not convert cached payload to JSON")?;
        Ok(Some(value))
    }

    /// 무조건 덮어쓰기 (insert-or-replace). 병합 없음.
    pub async fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let payload = mongodb::bson::to_bson(value).context("could not convert payload to BSON")?;
        let opts = UpdateOptions::builder().upsert(true).build();

        self.collection
            .update_one(
                doc! { "cache_key": key },
                doc! {
                    "$set": {
                        "payload": payload,
                        "cached_at": mongodb::bson::DateTime::from_chrono(Utc::now()),
                    },
                    "$setOnInsert": {
                        "cache_key": key,
                    },
                },
                opts,
            )
            .await
            .context("could not write cache entry")?;

        Ok(())
    }
}
