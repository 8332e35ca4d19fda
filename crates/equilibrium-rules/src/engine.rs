//! [`RulesEngine`]: a resolved graph plus the "subjects" it was built
//! with, bound to the thread that's currently resolving through it so
//! rule bodies can recursively ask for further values.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::RulesError;
use crate::executor::Executor;
use crate::graph::RulesGraph;
use crate::params::{Params, RuleValue};
use crate::rule::Rule;
use crate::signature::TypeKey;

struct Inner {
    graph: RulesGraph,
    subjects: Params,
    executor: Arc<dyn Executor>,
}

/// A cheaply-clonable handle to a validated rules graph. Cloning an engine
/// shares the same graph, subjects and executor — it does not rebuild
/// anything.
#[derive(Clone)]
pub struct RulesEngine(Arc<Inner>);

thread_local! {
    static CURRENT: RefCell<Vec<RulesEngine>> = RefCell::new(Vec::new());
}

/// Pops the engine pushed by [`RulesEngine::enter_current`] when dropped.
pub struct EngineGuard;

impl Drop for EngineGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl RulesEngine {
    pub fn new(rules: Vec<Arc<dyn Rule>>, subjects: Params, executor: Arc<dyn Executor>) -> Result<Self, RulesError> {
        let graph = RulesGraph::new(rules)?;
        Ok(RulesEngine(Arc::new(Inner { graph, subjects, executor })))
    }

    /// Pushes this engine as the thread-local "current" one for as long
    /// as the returned guard lives. Executors call this around every rule
    /// invocation so the rule body's calls to [`crate::get`] resolve
    /// against this engine.
    pub fn enter_current(&self) -> EngineGuard {
        CURRENT.with(|stack| stack.borrow_mut().push(self.clone()));
        EngineGuard
    }

    pub fn current() -> Result<RulesEngine, RulesError> {
        CURRENT.with(|stack| stack.borrow().last().cloned().ok_or(RulesError::NoCurrentEngine))
    }

    /// Resolves `T` from `params`, merged with this engine's subjects,
    /// running whatever chain of rules is needed to produce it.
    pub fn get<T: RuleValue + Clone>(&self, params: Params) -> Result<T, RulesError> {
        let value = self.get_dyn(TypeKey::of::<T>(), params)?;
        value.as_any().downcast_ref::<T>().cloned().ok_or(RulesError::OutputTypeMismatch)
    }

    fn get_dyn(&self, output: TypeKey, params: Params) -> Result<Arc<dyn RuleValue>, RulesError> {
        let mut accumulated = self.0.subjects.merge(&params);
        if let Some(value) = accumulated.get_dyn(output) {
            return Ok(value);
        }

        let available: BTreeSet<TypeKey> = accumulated.types().collect();
        let path = self.0.graph.find_path(&available, output)?;

        for rule in &path {
            let rule_params = accumulated.filter(rule.input_types());
            let result = self.0.executor.execute(rule, rule_params, self)?;
            accumulated.insert_dyn(rule.output_type(), result);
        }

        accumulated.get_dyn(output).ok_or(RulesError::OutputTypeMismatch)
    }
}

/// Resolves `T` from `params` against the engine currently executing on
/// this thread. Rule bodies call this to recursively request another
/// value — memoized per the engine's cache, so a value needed by several
/// rules in the same chain is computed once.
pub fn get<T: RuleValue + Clone>(params: Params) -> Result<T, RulesError> {
    RulesEngine::current()?.get(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::executor::SimpleExecutor;
    use crate::rule::{rule1, rule2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolves_single_value_from_subjects() {
        let rules = vec![rule1::<i32, String, _>("to_string", |n| Ok(n.to_string()))];
        let engine = RulesEngine::new(rules, Params::new().with(7i32), Arc::new(SimpleExecutor::new(Arc::new(MemoryCache::new())))).unwrap();
        let result = engine.get::<String>(Params::new()).unwrap();
        assert_eq!(result, "7");
    }

    #[test]
    fn recursive_get_memoizes_shared_subcalls() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Clone, Copy, Hash)]
        struct Base(i32);
        #[derive(Clone, Copy, Hash)]
        struct DoubledA(i32);
        #[derive(Clone, Copy, Hash)]
        struct DoubledB(i32);
        #[derive(Clone, Copy, Hash)]
        struct Summed(i32);

        let rules = vec![
            rule1::<Base, DoubledA, _>("double_a", |base| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(DoubledA(base.0 * 2))
            }),
            rule1::<Base, DoubledB, _>("double_b", |base| {
                let doubled: DoubledA = get(Params::new())?;
                Ok(DoubledB(doubled.0))
            }),
            rule2::<DoubledA, DoubledB, Summed, _>("sum", |a, b| Ok(Summed(a.0 + b.0))),
        ];

        let engine = RulesEngine::new(rules, Params::new().with(Base(3)), Arc::new(SimpleExecutor::new(Arc::new(MemoryCache::new())))).unwrap();
        let result = engine.get::<Summed>(Params::new()).unwrap();
        assert_eq!(result.0, 12);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_outside_engine_fails() {
        let err = get::<i32>(Params::new()).unwrap_err();
        assert!(matches!(err, RulesError::NoCurrentEngine));
    }

    #[derive(Clone, Copy, Hash)]
    struct Custom(i32);

    #[test]
    fn caller_params_override_subjects() {
        let rules = vec![rule1::<Custom, i32, _>("unwrap", |c| Ok(c.0))];
        let engine = RulesEngine::new(
            rules,
            Params::new().with(Custom(42)),
            Arc::new(SimpleExecutor::new(Arc::new(MemoryCache::new()))),
        )
        .unwrap();

        assert_eq!(engine.get::<i32>(Params::new()).unwrap(), 42);
        assert_eq!(engine.get::<i32>(Params::new().with(Custom(33))).unwrap(), 33);
    }

    #[test]
    fn fibonacci_chain_is_linear_not_exponential() {
        #[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
        struct N(u32);
        #[derive(Clone, Copy, Hash)]
        struct Fib(u64);

        static CALLS: AtomicUsize = AtomicUsize::new(0);

        // A single self-recursive rule: Fib(n) = Fib(n-1) + Fib(n-2), gated
        // on the subject `N` naming which index is wanted. Each distinct `N`
        // the engine is asked to resolve is its own cache entry.
        fn fib_rule() -> Arc<dyn Rule> {
            rule1::<N, Fib, _>("fib", |n| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                if n.0 < 2 {
                    return Ok(Fib(n.0 as u64));
                }
                let a: Fib = get(Params::new().with(N(n.0 - 1)))?;
                let b: Fib = get(Params::new().with(N(n.0 - 2)))?;
                Ok(Fib(a.0 + b.0))
            })
        }

        let cache = Arc::new(MemoryCache::new());
        let engine = RulesEngine::new(vec![fib_rule()], Params::new(), Arc::new(SimpleExecutor::new(cache))).unwrap();

        let n = 20u32;
        let result = engine.get::<Fib>(Params::new().with(N(n))).unwrap();
        assert_eq!(result.0, 6765);
        // Without memoization this would take O(phi^n) calls; with it, one
        // call per distinct N(0..=n).
        assert!(CALLS.load(Ordering::SeqCst) <= n as usize + 1);
    }
}
