//! In-flight 요청 병합
//!
//! 같은 캐시 키에 대한 동시 요청을 하나의 업스트림 호출로 합칩니다.
//! 콜드 캐시 상태에서 여러 시청자가 같은 경기를 동시에 열 때
//! (비싸고 불변인 경기 상세) 중복 조회를 막는 것이 주 목적입니다.

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use super::error::FetchError;

/// 공유 가능한 조회 결과. 성공이든 실패든 모든 대기자에게 복제됩니다.
pub type FlightResult = Result<Arc<Value>, FetchError>;

type FlightFuture = Shared<BoxFuture<'static, FlightResult>>;

/// 키별 진행 중 요청 레지스트리
pub struct FlightGroup {
    inflight: Arc<Mutex<HashMap<String, FlightFuture>>>,
}

impl FlightGroup {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `key`에 진행 중인 요청이 있으면 그 Future를 함께 기다리고,
    /// 없으면 `factory`로 새 요청을 등록합니다.
    ///
    /// 등록 제거는 내부 Future의 완료 경로에서 수행되므로, 최초 호출자가
    /// 중간에 취소되어도 남은 대기자 중 누가 완주시키든 정리됩니다.
    /// 반환되는 bool은 기존 요청에 합류했는지 여부입니다.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> (FlightResult, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult> + Send + 'static,
    {
        let (future, joined) = {
            let mut map = self.inflight.lock().expect("in-flight map lock poisoned");
            if let Some(existing) = map.get(key) {
                (existing.clone(), true)
            } else {
                let registry = Arc::clone(&self.inflight);
                let owned_key = key.to_owned();
                let inner = factory();
                let future = async move {
                    let result = inner.await;
                    registry
                        .lock()
                        .expect("in-flight map lock poisoned")
                        .remove(&owned_key);
                    result
                }
                .boxed()
                .shared();
                map.insert(key.to_owned(), future.clone());
                (future, false)
            }
        };

        (future.await, joined)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }
}

impl Default for FlightGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let group = Arc::new(FlightGroup::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let group = Arc::clone(&group);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                group
                    .run("match:NA1_2", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Arc::new(json!({"matchId": "NA1_2"})))
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for (result, _) in &results {
            let value = result.as_ref().unwrap();
            assert_eq!(value["matchId"], "NA1_2");
        }
        // 최초 1명을 뺀 나머지는 합류자
        let joins = results.iter().filter(|(_, joined)| *joined).count();
        assert_eq!(joins, 4);
        assert_eq!(group.len(), 0);
    }

    #[tokio::test]
    async fn failures_are_shared_and_entry_removed() {
        let group = Arc::new(FlightGroup::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let group = Arc::clone(&group);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                group
                    .run("ranked:abc", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(FetchError::NotFound)
                    })
                    .await
            }));
        }

        for handle in handles {
            let (result, _) = handle.await.unwrap();
            assert!(matches!(result, Err(FetchError::NotFound)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.len(), 0);

        // 완료 후의 새 요청은 새로 시작한다
        let calls2 = Arc::clone(&calls);
        let (result, joined) = group
            .run("ranked:abc", move || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(json!([])))
            })
            .await;
        assert!(result.is_ok());
        assert!(!joined);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
