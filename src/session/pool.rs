//! Bounded browser-session pool
//!
//! The pool caps the number of live sessions with a semaphore, reuses
//! idle sessions, and never hands out or re-pools a session it cannot
//! prove healthy. It is the only structure shared between the scheduler's
//! page tasks.

use crate::session::{BrowserSession, SessionFactory};
use crate::{SessionError, SessionResult};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// A session leased from the pool
///
/// Holds the capacity permit for as long as the lease is alive, so the
/// number of outstanding leases can never exceed the pool capacity.
pub struct PooledSession {
    session: Box<dyn BrowserSession>,
    _permit: OwnedSemaphorePermit,
}

impl std::ops::Deref for PooledSession {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl std::ops::DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

/// Bounded pool of reusable browser sessions
pub struct SessionPool {
    factory: Arc<dyn SessionFactory>,
    idle: Mutex<Vec<Box<dyn BrowserSession>>>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl SessionPool {
    /// Creates an empty pool with the given capacity
    ///
    /// Sessions are created lazily on `acquire`, up to `capacity` live at
    /// once.
    pub fn new(factory: Arc<dyn SessionFactory>, capacity: usize) -> Self {
        Self {
            factory,
            idle: Mutex::new(Vec::with_capacity(capacity)),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Leases a healthy session, creating one if no idle session survives
    /// its liveness probe
    ///
    /// Blocks (asynchronously) while the pool is at capacity. Called from
    /// spawned page tasks, never from the scheduler loop itself. A
    /// creation failure returns the error to the caller; the freed
    /// capacity permit is dropped with it, so callers retrying must apply
    /// their own backoff.
    pub async fn acquire(&self) -> SessionResult<PooledSession> {
        // The pool never closes its semaphore, so this error is
        // unreachable in practice; it still propagates rather than panics.
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SessionError::Create("session pool is shut down".to_string()))?;

        // Prefer reusing an idle session, discarding any that died while
        // pooled. The probe happens before handout, not after a failed
        // navigation.
        loop {
            let candidate = { self.idle.lock().await.pop() };
            match candidate {
                Some(mut session) => {
                    if session.is_alive().await {
                        return Ok(PooledSession {
                            session,
                            _permit: permit,
                        });
                    }
                    tracing::warn!("Discarding dead pooled session");
                    session.close().await;
                }
                None => break,
            }
        }

        let session = self.factory.create().await?;
        Ok(PooledSession {
            session,
            _permit: permit,
        })
    }

    /// Returns a leased session to the pool, or destroys it
    ///
    /// Only sessions the caller still trusts go back on the idle list; a
    /// session marked unhealthy (timed-out wait, failed command) is
    /// closed instead.
    pub async fn release(&self, lease: PooledSession, healthy: bool) {
        let PooledSession { session, _permit } = lease;
        if healthy {
            self.idle.lock().await.push(session);
        } else {
            tracing::debug!("Closing unhealthy session instead of pooling it");
            session.close().await;
        }
        // The permit drops here, freeing one slot of capacity.
    }

    /// Closes every idle session
    ///
    /// Called at job end. Leased sessions are closed by their holders via
    /// `release(_, false)`.
    pub async fn drain(&self) {
        let mut idle = self.idle.lock().await;
        let count = idle.len();
        while let Some(session) = idle.pop() {
            session.close().await;
        }
        if count > 0 {
            tracing::info!("Drained {} pooled sessions", count);
        }
    }

    /// The maximum number of concurrently leased sessions
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle sessions currently pooled
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}
