//! 실행 레지스트리: 활성 실행과 크기 제한 이력
//!
//! [`RunRegistry`]는 오케스트레이터에 주입되는 공유 객체입니다.
//! 활성 맵과 이력 목록을 하나의 `Mutex`가 함께 보호하므로, 실행이 활성에서
//! 이력으로 옮겨가는 순간에도 조회는 정확히 한 곳에서만 실행을 찾습니다.
//!
//! 잠금은 await를 가로질러 잡히지 않습니다. 모든 연산은 O(1) 또는 O(이력 용량)입니다.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::{counter, gauge};
use tracing::debug;

use vigil_core::error::RegistryError;
use vigil_core::metrics as m;

use crate::run::PipelineRun;

/// 기본 이력 용량
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Default)]
struct Inner {
    active: HashMap<String, PipelineRun>,
    /// 앞쪽이 가장 최근
    history: VecDeque<PipelineRun>,
}

/// 실행 레지스트리
///
/// # 사용 예시
/// ```ignore
/// let registry = Arc::new(RunRegistry::new(50));
/// registry.register(run.clone())?;
/// // ... stage 진행 중 ...
/// registry.update(&run)?;
/// // 종료 후
/// registry.retire(run)?;
/// ```
pub struct RunRegistry {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl RunRegistry {
    /// 지정한 이력 용량으로 레지스트리를 생성합니다.
    ///
    /// 용량은 최소 1입니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// 이력 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 새 실행을 활성 집합에 등록합니다.
    ///
    /// 같은 ID가 활성 집합이나 이력에 있으면 에러를 반환합니다.
    pub fn register(&self, run: PipelineRun) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        let id = run.id().to_owned();
        if inner.active.contains_key(&id) || inner.history.iter().any(|r| r.id() == id) {
            return Err(RegistryError::AlreadyRegistered { id });
        }
        inner.active.insert(id, run);
        Self::record_sizes(&inner);
        Ok(())
    }

    /// 활성 실행의 스냅샷을 갱신합니다.
    ///
    /// 이력으로 옮겨진 실행은 변경할 수 없습니다.
    pub fn update(&self, run: &PipelineRun) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        match inner.active.get_mut(run.id()) {
            Some(slot) => {
                slot.clone_from(run);
                Ok(())
            }
            None => Err(RegistryError::NotActive {
                id: run.id().to_owned(),
            }),
        }
    }

    /// 활성 실행을 현재 스냅샷 그대로 이력으로 옮깁니다.
    ///
    /// 옮겨진 실행을 반환합니다.
    pub fn complete(&self, id: &str) -> Result<PipelineRun, RegistryError> {
        let mut inner = self.lock();
        let run = inner
            .active
            .remove(id)
            .ok_or_else(|| RegistryError::NotActive { id: id.to_owned() })?;
        self.push_history(&mut inner, run.clone());
        Ok(run)
    }

    /// 최종 스냅샷으로 교체하면서 이력으로 옮깁니다.
    ///
    /// `update` + `complete`를 한 번의 잠금으로 수행합니다.
    pub fn retire(&self, run: PipelineRun) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.active.remove(run.id()).is_none() {
            return Err(RegistryError::NotActive {
                id: run.id().to_owned(),
            });
        }
        self.push_history(&mut inner, run);
        Ok(())
    }

    /// ID로 실행을 조회합니다 (활성 집합 먼저, 다음 이력).
    pub fn get_by_id(&self, id: &str) -> Option<PipelineRun> {
        let inner = self.lock();
        inner
            .active
            .get(id)
            .or_else(|| inner.history.iter().find(|r| r.id() == id))
            .cloned()
    }

    /// 최근 순으로 이력을 반환합니다.
    ///
    /// `limit`이 `None`이면 전체를 반환합니다.
    pub fn list_history(&self, limit: Option<usize>) -> Vec<PipelineRun> {
        let inner = self.lock();
        let limit = limit.unwrap_or(inner.history.len());
        inner.history.iter().take(limit).cloned().collect()
    }

    /// 활성 실행을 시작 시각 순으로 반환합니다.
    pub fn list_active(&self) -> Vec<PipelineRun> {
        let inner = self.lock();
        let mut runs: Vec<PipelineRun> = inner.active.values().cloned().collect();
        runs.sort_by_key(|r| r.started_at());
        runs
    }

    /// 활성 실행 수
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// 이력 길이
    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    fn push_history(&self, inner: &mut Inner, run: PipelineRun) {
        debug!(run_id = run.id(), status = %run.status(), "run moved to history");
        inner.history.push_front(run);
        while inner.history.len() > self.capacity {
            if let Some(evicted) = inner.history.pop_back() {
                debug!(run_id = evicted.id(), "evicted oldest run from history");
                counter!(m::REGISTRY_HISTORY_EVICTIONS_TOTAL).increment(1);
            }
        }
        Self::record_sizes(inner);
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_sizes(inner: &Inner) {
        gauge!(m::REGISTRY_ACTIVE_RUNS).set(inner.active.len() as f64);
        gauge!(m::REGISTRY_HISTORY_SIZE).set(inner.history.len() as f64);
    }

    /// 잠금을 획득합니다.
    ///
    /// 잠금을 쥔 채 panic하는 경로가 없으므로 오염된 잠금도 그대로 사용합니다.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl std::fmt::Debug for RunRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("RunRegistry")
            .field("active", &inner.active.len())
            .field("history", &inner.history.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
