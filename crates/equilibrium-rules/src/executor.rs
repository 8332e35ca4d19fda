//! Executors: the strategy by which a resolved rule chain actually runs
//! its rules. [`SimpleExecutor`] runs them inline; [`ThreadedExecutor`]
//! fans them out across a thread pool and deduplicates concurrent calls
//! for the same rule and parameters.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::cache::Cache;
use crate::engine::RulesEngine;
use crate::errors::RulesError;
use crate::params::{Params, RuleValue};
use crate::rule::Rule;

pub trait Executor: Send + Sync {
    /// Runs `rule` with `params`, which the caller guarantees already hold
    /// exactly the rule's declared inputs. `engine` is pushed as the
    /// thread-local "current engine" for the duration of the call, so the
    /// rule body may recursively call [`crate::get`].
    fn execute(&self, rule: &Arc<dyn Rule>, params: Params, engine: &RulesEngine) -> Result<Arc<dyn RuleValue>, RulesError>;
}

fn run_with_engine(rule: &Arc<dyn Rule>, params: &Params, engine: &RulesEngine) -> Result<Arc<dyn RuleValue>, RulesError> {
    let _guard = engine.enter_current();
    rule.execute(params)
}

/// Runs every rule on the calling thread, in chain order.
pub struct SimpleExecutor {
    cache: Arc<dyn Cache>,
}

impl SimpleExecutor {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        SimpleExecutor { cache }
    }
}

impl Executor for SimpleExecutor {
    fn execute(&self, rule: &Arc<dyn Rule>, params: Params, engine: &RulesEngine) -> Result<Arc<dyn RuleValue>, RulesError> {
        if let Some(cached) = self.cache.get(rule.as_ref(), &params) {
            debug!(rule = rule.id(), "cache hit");
            return Ok(cached);
        }
        let result = run_with_engine(rule, &params, engine)?;
        self.cache.set(rule.as_ref(), &params, Arc::clone(&result));
        Ok(result)
    }
}

type CacheKey = (String, u64);

/// One in-flight (or just-finished) call to a rule, shared by every
/// caller that asks for the same `(rule, params)` while it's running.
struct Pending {
    result: Mutex<Option<Result<Arc<dyn RuleValue>, RulesError>>>,
    cond: Condvar,
}

/// Runs rules on a `rayon` thread pool. Concurrent calls for the same
/// rule and content-hash-equal parameters share a single execution: the
/// first caller in runs the rule, later callers block on its result
/// instead of starting a redundant run.
pub struct ThreadedExecutor {
    cache: Arc<dyn Cache>,
    pool: rayon::ThreadPool,
    pending: Mutex<HashMap<CacheKey, Arc<Pending>>>,
}

impl ThreadedExecutor {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        ThreadedExecutor {
            cache,
            pool: rayon::ThreadPoolBuilder::new().build().expect("failed to build rules engine thread pool"),
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl Executor for ThreadedExecutor {
    fn execute(&self, rule: &Arc<dyn Rule>, params: Params, engine: &RulesEngine) -> Result<Arc<dyn RuleValue>, RulesError> {
        if let Some(cached) = self.cache.get(rule.as_ref(), &params) {
            debug!(rule = rule.id(), "cache hit");
            return Ok(cached);
        }

        let key = (rule.id().to_string(), params.content_hash());
        let (pending, is_leader) = {
            let mut table = self.pending.lock();
            if let Some(existing) = table.get(&key) {
                (Arc::clone(existing), false)
            } else {
                let fresh = Arc::new(Pending {
                    result: Mutex::new(None),
                    cond: Condvar::new(),
                });
                table.insert(key.clone(), Arc::clone(&fresh));
                (fresh, true)
            }
        };

        if is_leader {
            let rule = Arc::clone(rule);
            let engine = engine.clone();
            let cache = Arc::clone(&self.cache);
            let pending = Arc::clone(&pending);
            self.pool.spawn(move || {
                let result = run_with_engine(&rule, &params, &engine);
                if let Ok(ref value) = result {
                    cache.set(rule.as_ref(), &params, Arc::clone(value));
                }
                *pending.result.lock() = Some(result);
                pending.cond.notify_all();
            });
        }

        let mut guard = pending.result.lock();
        while guard.is_none() {
            pending.cond.wait(&mut guard);
        }
        self.pending.lock().remove(&key);
        guard.clone().expect("checked by the wait loop above")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::engine::RulesEngine;
    use crate::rule::rule1;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use tracing::Level;
    use tracing_subscriber::util::SubscriberInitExt;

    fn setup_tracing() -> tracing::dispatcher::DefaultGuard {
        tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().finish().set_default()
    }

    #[derive(Clone, Copy, Hash)]
    struct N(i32);
    #[derive(Clone, Copy, Hash)]
    struct Doubled(i32);

    #[test]
    fn simple_executor_hits_cache_on_second_call() {
        let _tracing = setup_tracing();
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let rules = vec![rule1::<N, Doubled, _>("double", |n| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Doubled(n.0 * 2))
        })];
        let cache = Arc::new(MemoryCache::new());
        let engine = RulesEngine::new(rules, Params::new(), Arc::new(SimpleExecutor::new(cache))).unwrap();

        assert_eq!(engine.get::<Doubled>(Params::new().with(N(4))).unwrap().0, 8);
        assert_eq!(engine.get::<Doubled>(Params::new().with(N(4))).unwrap().0, 8);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn threaded_executor_deduplicates_concurrent_calls_for_same_params() {
        let _tracing = setup_tracing();
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        // Holds the rule body open until every caller below has had a
        // chance to register as a follower of the same in-flight call,
        // so this exercises the dedup path rather than a sequence of
        // cache hits.
        let gate = Arc::new(Barrier::new(2));
        let gate_in_rule = Arc::clone(&gate);
        let rules = vec![rule1::<N, Doubled, _>("double", move |n| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            gate_in_rule.wait();
            Ok(Doubled(n.0 * 2))
        })];
        let cache = Arc::new(MemoryCache::new());
        let engine = RulesEngine::new(rules, Params::new(), Arc::new(ThreadedExecutor::new(cache))).unwrap();

        let results: Vec<i32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = engine.clone();
                    scope.spawn(move || engine.get::<Doubled>(Params::new().with(N(21))).unwrap().0)
                })
                .collect();
            std::thread::sleep(std::time::Duration::from_millis(50));
            gate.wait();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results, vec![42, 42, 42, 42]);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn threaded_executor_runs_distinct_params_independently() {
        let rules = vec![rule1::<N, Doubled, _>("double", |n| Ok(Doubled(n.0 * 2)))];
        let cache = Arc::new(MemoryCache::new());
        let engine = RulesEngine::new(rules, Params::new(), Arc::new(ThreadedExecutor::new(cache))).unwrap();

        assert_eq!(engine.get::<Doubled>(Params::new().with(N(1))).unwrap().0, 2);
        assert_eq!(engine.get::<Doubled>(Params::new().with(N(2))).unwrap().0, 4);
    }
}
