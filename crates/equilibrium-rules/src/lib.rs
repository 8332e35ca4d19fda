//! A small dependency-injection rules engine: rules declare the types
//! they consume and produce, and [`RulesEngine::get`] resolves whatever
//! chain of rules turns the values on hand into the one asked for.

mod cache;
mod engine;
mod errors;
mod executor;
mod graph;
mod params;
mod rule;
mod signature;

pub use cache::{Cache, MemoryCache, NoneCache};
pub use engine::{get, EngineGuard, RulesEngine};
pub use errors::RulesError;
pub use executor::{Executor, SimpleExecutor, ThreadedExecutor};
pub use graph::RulesGraph;
pub use params::{Params, RuleValue};
pub use rule::{rule0, rule1, rule2, rule3, Rule, RuleInfo};
pub use signature::{Signature, TypeKey};
