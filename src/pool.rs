//! Warm sandbox pool with capacity-bounded eviction.
//!
//! The pool keeps up to `capacity` sandbox containers alive so acquiring
//! one does not always pay container start-up. Every acquisition gets a
//! **fresh** container sized to the submission's limits: idle sandboxes are
//! not reused, they are eviction candidates that keep capacity honest. A
//! fresh filesystem per submission means nothing can leak between users.
//!
//! All bookkeeping lives behind one mutex. The lock is held across
//! container creation (acceptable at small capacities) but never across
//! destruction, which runs on detached tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::JudgeError;
use crate::runtime::{ContainerRuntime, ContainerSpec};
use crate::types::{Language, ResourceLimit};

/// In-container working directory where sources are deployed.
pub const WORKSPACE_DIR: &str = "/workspace";

/// How many times an acquire retries before giving up.
const ACQUIRE_ATTEMPTS: u32 = 50;

/// Pause between acquire attempts.
const ACQUIRE_BACKOFF: Duration = Duration::from_secs(1);

/// A live sandbox container leased from the pool.
///
/// Exactly one caller holds a given sandbox between `acquire` and
/// `release`; the pool never hands the same lease out twice.
#[derive(Clone)]
pub struct Sandbox {
    /// Pool-internal monotonic id.
    pub id: u64,
    /// Language the container was provisioned for; never changes.
    pub language: Language,
    /// Runtime-level container handle.
    pub container_id: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Sandbox {
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .field("language", &self.language)
            .field("container_id", &self.container_id)
            .finish()
    }
}

struct PoolEntry {
    sandbox: Sandbox,
    in_use: bool,
    last_released_at: Instant,
}

struct PoolState {
    next_id: u64,
    entries: Vec<PoolEntry>,
}

/// Capacity-bounded pool of sandbox containers.
pub struct SandboxPool {
    runtime: Arc<dyn ContainerRuntime>,
    capacity: usize,
    images: HashMap<Language, String>,
    state: tokio::sync::Mutex<PoolState>,
}

impl SandboxPool {
    /// Creates an empty pool. `images` overrides the per-language default
    /// sandbox image.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        capacity: usize,
        images: HashMap<Language, String>,
    ) -> Self {
        Self {
            runtime,
            capacity,
            images,
            state: tokio::sync::Mutex::new(PoolState {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    fn image_for(&self, language: Language) -> String {
        self.images
            .get(&language)
            .cloned()
            .unwrap_or_else(|| language.default_image().to_string())
    }

    /// Leases a fresh sandbox sized to `limit`.
    ///
    /// Retries up to 50 times, one second apart, while the pool is
    /// saturated with in-use sandboxes or creation keeps failing. After the
    /// retry budget the caller gets a composite error carrying the last
    /// underlying cause.
    pub async fn acquire(
        &self,
        language: Language,
        limit: &ResourceLimit,
    ) -> Result<Sandbox, JudgeError> {
        let mut last = JudgeError::PoolBusy;
        for attempt in 1..=ACQUIRE_ATTEMPTS {
            match self.try_acquire(language, limit).await {
                Ok(sandbox) => {
                    debug!(
                        sandbox = sandbox.id,
                        container = %sandbox.container_id,
                        attempt,
                        "acquired sandbox"
                    );
                    return Ok(sandbox);
                }
                Err(e) => last = e,
            }
            tokio::time::sleep(ACQUIRE_BACKOFF).await;
        }
        Err(JudgeError::PoolExhausted {
            attempts: ACQUIRE_ATTEMPTS,
            last: Box::new(last),
        })
    }

    /// One acquire attempt: create below capacity, otherwise evict the
    /// idle sandbox that has been released the longest and create in its
    /// place.
    async fn try_acquire(
        &self,
        language: Language,
        limit: &ResourceLimit,
    ) -> Result<Sandbox, JudgeError> {
        let mut state = self.state.lock().await;

        if state.entries.len() < self.capacity {
            return self.create_locked(&mut state, language, limit).await;
        }

        let victim = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.in_use)
            .min_by_key(|(_, entry)| entry.last_released_at)
            .map(|(index, _)| index);

        let Some(index) = victim else {
            return Err(JudgeError::PoolBusy);
        };

        let evicted = state.entries.swap_remove(index);
        debug!(
            sandbox = evicted.sandbox.id,
            container = %evicted.sandbox.container_id,
            "evicting idle sandbox"
        );
        self.dispose_detached(evicted.sandbox.container_id);

        self.create_locked(&mut state, language, limit).await
    }

    async fn create_locked(
        &self,
        state: &mut PoolState,
        language: Language,
        limit: &ResourceLimit,
    ) -> Result<Sandbox, JudgeError> {
        let spec = ContainerSpec {
            image: self.image_for(language),
            working_dir: WORKSPACE_DIR.to_string(),
            memory_bytes: limit.memory_bytes(),
            cpu_count: limit.cpu_count,
        };

        let container_id = self.runtime.create_container(&spec).await?;
        if let Err(e) = self.runtime.start_container(&container_id).await {
            self.dispose_detached(container_id);
            return Err(e.into());
        }

        state.next_id += 1;
        let sandbox = Sandbox {
            id: state.next_id,
            language,
            container_id,
            runtime: Arc::clone(&self.runtime),
        };
        state.entries.push(PoolEntry {
            sandbox: sandbox.clone(),
            in_use: true,
            last_released_at: Instant::now(),
        });
        Ok(sandbox)
    }

    /// Returns a lease. Releasing an unknown or already-released sandbox is
    /// a no-op; the release timestamp only moves on a real release.
    pub async fn release(&self, sandbox: &Sandbox) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|entry| entry.sandbox.id == sandbox.id)
        {
            if entry.in_use {
                entry.in_use = false;
                entry.last_released_at = Instant::now();
            }
        }
    }

    /// Stops and removes a container on a detached task. The pool has
    /// already forgotten it; failures are logged, never propagated.
    fn dispose_detached(&self, container_id: String) {
        let runtime = Arc::clone(&self.runtime);
        tokio::spawn(async move {
            if let Err(e) = runtime.stop_container(&container_id).await {
                warn!(container = %container_id, "failed to stop evicted container: {e}");
            }
            if let Err(e) = runtime.remove_container(&container_id).await {
                warn!(container = %container_id, "failed to remove evicted container: {e}");
            }
        });
    }

    /// Number of sandboxes currently tracked, in use or idle.
    pub async fn tracked(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    #[cfg(test)]
    pub(crate) async fn idle(&self) -> usize {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|entry| !entry.in_use)
            .count()
    }

    /// Tears down every tracked sandbox. Called on service shutdown.
    pub async fn shutdown(&self) {
        let entries: Vec<PoolEntry> = {
            let mut state = self.state.lock().await;
            state.entries.drain(..).collect()
        };
        let futures = entries.into_iter().map(|entry| {
            let runtime = Arc::clone(&self.runtime);
            async move {
                let container_id = entry.sandbox.container_id;
                if let Err(e) = runtime.stop_container(&container_id).await {
                    warn!(container = %container_id, "failed to stop sandbox: {e}");
                }
                if let Err(e) = runtime.remove_container(&container_id).await {
                    warn!(container = %container_id, "failed to remove sandbox: {e}");
                }
            }
        });
        futures::future::join_all(futures).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeRuntime;

    fn limit() -> ResourceLimit {
        ResourceLimit {
            memory_mb: 256,
            time_limit_secs: 1.0,
            cpu_count: 1,
        }
    }

    fn pool_with(runtime: Arc<FakeRuntime>, capacity: usize) -> SandboxPool {
        SandboxPool::new(runtime, capacity, HashMap::new())
    }

    async fn settle() {
        // Let detached disposal tasks run.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn creates_fresh_below_capacity() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(Arc::clone(&runtime), 2);

        let a = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        let b = pool.acquire(Language::Python, &limit()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(pool.tracked().await, 2);
        let created = runtime.created();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].image, "gcc:latest");
        assert_eq!(created[1].image, "python:3.11-alpine");
        assert_eq!(created[0].memory_bytes, 256 * 1024 * 1024);
        assert_eq!(created[0].working_dir, WORKSPACE_DIR);
        // Both containers were started before being handed out.
        assert_eq!(runtime.started().len(), 2);
    }

    #[tokio::test]
    async fn image_overrides_apply() {
        let runtime = Arc::new(FakeRuntime::new());
        let mut images = HashMap::new();
        images.insert(Language::Cpp, "registry.local/gcc:13".to_string());
        let pool = SandboxPool::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            1,
            images,
        );

        pool.acquire(Language::Cpp, &limit()).await.unwrap();
        assert_eq!(runtime.created()[0].image, "registry.local/gcc:13");
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_never_exceeded() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(Arc::clone(&runtime), 2);

        let mut held = Vec::new();
        for _ in 0..2 {
            held.push(pool.acquire(Language::Cpp, &limit()).await.unwrap());
        }
        for sandbox in &held {
            pool.release(sandbox).await;
            assert!(pool.tracked().await <= 2);
        }
        for _ in 0..3 {
            let sandbox = pool.acquire(Language::Cpp, &limit()).await.unwrap();
            assert!(pool.tracked().await <= 2);
            pool.release(&sandbox).await;
        }
        settle().await;
        assert!(runtime.live().len() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_pool_evicts_oldest_idle() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(Arc::clone(&runtime), 2);

        let a = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        let b = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        let a_container = a.container_id.clone();

        pool.release(&a).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        pool.release(&b).await;

        let c = pool.acquire(Language::Python, &limit()).await.unwrap();
        settle().await;

        // The sandbox released the longest ago went first.
        assert!(runtime.removed().contains(&a_container));
        assert!(!runtime.removed().contains(&b.container_id));
        assert_eq!(pool.tracked().await, 2);
        assert_ne!(c.container_id, a_container);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_a_release() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = Arc::new(pool_with(runtime, 1));

        let first = pool.acquire(Language::Cpp, &limit()).await.unwrap();

        let contended = Arc::clone(&pool);
        let waiter =
            tokio::spawn(async move { contended.acquire(Language::Cpp, &limit()).await });

        tokio::time::sleep(Duration::from_secs(3)).await;
        pool.release(&first).await;

        let second = waiter.await.unwrap().unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(pool.tracked().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_retry_budget() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(runtime, 1);

        let _held = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        let err = pool.acquire(Language::Cpp, &limit()).await.unwrap_err();

        match err {
            JudgeError::PoolExhausted { attempts, last } => {
                assert_eq!(attempts, 50);
                assert!(matches!(*last, JudgeError::PoolBusy));
            }
            other => panic!("expected exhaustion, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_failure_is_retried() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.fail_next_creates(1);
        let pool = pool_with(Arc::clone(&runtime), 1);

        let sandbox = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        assert_eq!(sandbox.container_id, "fake-1");
        assert_eq!(pool.tracked().await, 1);
    }

    #[tokio::test]
    async fn release_is_idempotent_and_ignores_strangers() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(runtime, 1);

        let sandbox = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        pool.release(&sandbox).await;
        pool.release(&sandbox).await;

        let mut ghost = sandbox.clone();
        ghost.id = 999;
        pool.release(&ghost).await;

        assert_eq!(pool.tracked().await, 1);
    }

    #[tokio::test]
    async fn shutdown_removes_everything() {
        let runtime = Arc::new(FakeRuntime::new());
        let pool = pool_with(Arc::clone(&runtime), 2);

        let a = pool.acquire(Language::Cpp, &limit()).await.unwrap();
        pool.acquire(Language::Python, &limit()).await.unwrap();
        pool.release(&a).await;

        pool.shutdown().await;
        assert_eq!(pool.tracked().await, 0);
        assert!(runtime.live().is_empty());
        assert_eq!(runtime.stopped().len(), 2);
    }
}
