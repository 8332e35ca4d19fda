//! A coarse-grained, reentrant, timed exclusive lock over an entire store.
//!
//! Reentry is tracked by OS thread id plus a depth counter: a second
//! `enter` from the same thread returns the *same* [`LockId`]; a competing
//! thread blocks until release or `timeout`, then fails with `LockTimeout`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use equilibrium_core::{EquilibriumError, Result};

/// Opaque token identifying a held lock. Equal across reentrant `enter`
/// calls from the same thread while the lock remains held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId(u64);

struct Inner {
    holder: Option<ThreadId>,
    depth: u32,
    id: LockId,
    acquired_at: Option<Instant>,
}

/// The store's single exclusive lock.
pub struct ReentrantLock {
    state: Mutex<Inner>,
    cond: Condvar,
    next_id: AtomicU64,
    max_duration: Option<Duration>,
}

impl ReentrantLock {
    pub fn new(max_lock_duration: Option<Duration>) -> Arc<Self> {
        Arc::new(ReentrantLock {
            state: Mutex::new(Inner {
                holder: None,
                depth: 0,
                id: LockId(0),
                acquired_at: None,
            }),
            cond: Condvar::new(),
            next_id: AtomicU64::new(1),
            max_duration: max_lock_duration,
        })
    }

    /// Acquires the lock, blocking up to `timeout` (or indefinitely if
    /// `None`) when `block` is true. With `block = false`, fails
    /// immediately with `LockTimeout` if contended.
    pub fn enter(self: &Arc<Self>, timeout: Option<Duration>, block: bool) -> Result<LockHandle> {
        let tid = thread::current().id();
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.state.lock();
        loop {
            if guard.holder == Some(tid) {
                guard.depth += 1;
                let id = guard.id;
                drop(guard);
                return Ok(LockHandle::new(Arc::clone(self), id));
            }
            if guard.holder.is_none() {
                let id = LockId(self.next_id.fetch_add(1, Ordering::SeqCst));
                guard.holder = Some(tid);
                guard.depth = 1;
                guard.id = id;
                guard.acquired_at = Some(Instant::now());
                drop(guard);
                return Ok(LockHandle::new(Arc::clone(self), id));
            }

            if !block {
                return Err(EquilibriumError::LockTimeout);
            }
            match deadline {
                None => {
                    self.cond.wait(&mut guard);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(EquilibriumError::LockTimeout);
                    }
                    self.cond.wait_for(&mut guard, deadline - now);
                    if guard.holder.is_some() && guard.holder != Some(tid) && Instant::now() >= deadline {
                        return Err(EquilibriumError::LockTimeout);
                    }
                }
            }
        }
    }

    fn release(&self, id: LockId) {
        let mut guard = self.state.lock();
        if guard.id == id && guard.holder.is_some() {
            guard.depth -= 1;
            if guard.depth == 0 {
                guard.holder = None;
                guard.acquired_at = None;
                self.cond.notify_all();
            }
        }
    }

    /// Reports whether `id` is still the current holder and has not been
    /// held past `maxLockDuration`. Implementations should stop acting on
    /// a lock once this returns an error rather than silently continuing
    /// past the bound.
    pub fn check(&self, id: LockId) -> Result<()> {
        let guard = self.state.lock();
        if guard.id != id || guard.holder.is_none() {
            return Err(EquilibriumError::LockInvalidated);
        }
        if let (Some(max), Some(acquired_at)) = (self.max_duration, guard.acquired_at) {
            if acquired_at.elapsed() > max {
                return Err(EquilibriumError::LockInvalidated);
            }
        }
        Ok(())
    }
}

/// A scoped hold on a [`ReentrantLock`]; releases (or decrements the
/// reentrant depth of) the lock when dropped.
pub struct LockHandle {
    lock: Arc<ReentrantLock>,
    id: LockId,
}

impl LockHandle {
    fn new(lock: Arc<ReentrantLock>, id: LockId) -> Self {
        LockHandle { lock, id }
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn check(&self) -> Result<()> {
        self.lock.check(self.id)
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.lock.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn reentry_returns_same_id() {
        let lock = ReentrantLock::new(None);
        let outer = lock.enter(None, true).unwrap();
        let inner = lock.enter(None, true).unwrap();
        assert_eq!(outer.id(), inner.id());
    }

    #[test]
    fn non_blocking_fails_when_contended() {
        let lock = ReentrantLock::new(None);
        let _held = lock.enter(None, true).unwrap();
        let other = Arc::clone(&lock);
        let result = std::thread::spawn(move || other.enter(None, false))
            .join()
            .unwrap();
        assert!(matches!(result, Err(EquilibriumError::LockTimeout)));
    }

    #[test]
    fn blocking_times_out() {
        let lock = ReentrantLock::new(None);
        let _held = lock.enter(None, true).unwrap();
        let other = Arc::clone(&lock);
        let start = Instant::now();
        let result = std::thread::spawn(move || other.enter(Some(Duration::from_millis(100)), true))
            .join()
            .unwrap();
        assert!(matches!(result, Err(EquilibriumError::LockTimeout)));
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn release_wakes_blocked_waiter() {
        let lock = ReentrantLock::new(None);
        let held = lock.enter(None, true).unwrap();
        let other = Arc::clone(&lock);
        let acquired = Arc::new(AtomicBool::new(false));
        let acquired2 = Arc::clone(&acquired);
        let handle = std::thread::spawn(move || {
            let _h = other.enter(Some(Duration::from_secs(5)), true).unwrap();
            acquired2.store(true, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(held);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }
}
