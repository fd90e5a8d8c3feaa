//! 동시 업스트림 호출 제한
//!
//! Riot API는 앱 전역/메서드별 쿼터를 모두 강제하므로, 로컬 동시성을
//! 묶어두는 것만으로 429 발생률을 낮게 유지합니다. 분산 레이트리밋
//! 코디네이터는 두지 않습니다.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};

/// 동시 호출 상한. 앱 전역 쿼터 대비 안정적인 정상 상태 예산.
pub const MAX_CONCURRENT_FETCHES: usize = 5;

/// 업스트림 호출 게이트
///
/// tokio의 Semaphore는 공정(FIFO) 큐이므로 `acquire` 호출 순서대로
/// 퍼밋이 부여됩니다.
pub struct FetchGate {
    semaphore: Semaphore,
    max: usize,
    queued: AtomicUsize,
}

/// 보유 중인 퍼밋. 모든 종료 경로(성공/실패/취소)에서 Drop으로 반납됩니다.
pub struct GatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}

/// 진단용 게이트 상태. `/api/diagnostics`로 노출됩니다.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GateSnapshot {
    pub active: usize,
    pub queued: usize,
    pub max: usize,
}

impl FetchGate {
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max),
            max,
            queued: AtomicUsize::new(0),
        }
    }

    /// 퍼밋 획득. 상한에 도달해 있으면 FIFO 대기.
    pub async fn acquire(&self) -> GatePermit<'_> {
        self.queued.fetch_add(1, Ordering::SeqCst);
        // 이 세마포어는 닫히지 않음
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("fetch gate semaphore unexpectedly closed");
        self.queued.fetch_sub(1, Ordering::SeqCst);
        GatePermit { _permit: permit }
    }

    pub fn snapshot(&self) -> GateSnapshot {
        // queued는 대기 진입~퍼밋 수령 사이의 태스크 수를 세므로
        // 퍼밋을 막 받은 태스크가 잠깐 양쪽에 잡힐 수 있음. 진단 용도로 충분.
        GateSnapshot {
            active: self.max - self.semaphore.available_permits(),
            queued: self.queued.load(Ordering::SeqCst),
            max: self.max,
        }
    }
}

impl Default for FetchGate {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_FETCHES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_capacity() {
        let gate = Arc::new(FetchGate::new(5));
        let active = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = Arc::clone(&gate);
            let active = Arc::clone(&active);
            let high_water = Arc::clone(&high_water);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(high_water.load(Ordering::SeqCst) <= 5);
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.active, 0);
        assert_eq!(snapshot.queued, 0);
        assert_eq!(snapshot.max, 5);
    }

    #[tokio::test]
    async fn snapshot_reports_active_and_queued() {
        let gate = Arc::new(FetchGate::new(1));
        let held = gate.acquire().await;

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };
        // 대기자가 큐에 들어갈 때까지 양보
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.active, 1);
        assert_eq!(snapshot.queued, 1);

        drop(held);
        waiter.await.unwrap();
    }
}
