//! Rule result caching, keyed by rule id and the content hash of the
//! parameters it ran with.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::params::{Params, RuleValue};
use crate::rule::Rule;

type CacheKey = (String, u64);

fn key_for(rule: &dyn Rule, params: &Params) -> CacheKey {
    (rule.id().to_string(), params.content_hash())
}

pub trait Cache: Send + Sync {
    fn get(&self, rule: &dyn Rule, params: &Params) -> Option<Arc<dyn RuleValue>>;
    fn set(&self, rule: &dyn Rule, params: &Params, value: Arc<dyn RuleValue>);
}

/// Never caches — every call re-executes its rule.
pub struct NoneCache;

impl Cache for NoneCache {
    fn get(&self, _rule: &dyn Rule, _params: &Params) -> Option<Arc<dyn RuleValue>> {
        None
    }

    fn set(&self, _rule: &dyn Rule, _params: &Params, _value: Arc<dyn RuleValue>) {}
}

/// Caches every rule result for the lifetime of the cache instance.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Arc<dyn RuleValue>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, rule: &dyn Rule, params: &Params) -> Option<Arc<dyn RuleValue>> {
        self.entries.lock().get(&key_for(rule, params)).cloned()
    }

    fn set(&self, rule: &dyn Rule, params: &Params, value: Arc<dyn RuleValue>) {
        self.entries.lock().insert(key_for(rule, params), value);
    }
}
