//! Rules: pure functions from a fixed set of input types to one output
//! type, registered with the engine by their [`Signature`].

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::RulesError;
use crate::params::{Params, RuleValue};
use crate::signature::{Signature, TypeKey};

/// A snapshot of a rule's identity, cheap to clone and carry into error
/// values once the rule itself may have gone out of scope.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub id: String,
    pub signature: Signature,
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn input_types(&self) -> &BTreeSet<TypeKey>;

    fn output_type(&self) -> TypeKey;

    fn info(&self) -> RuleInfo {
        RuleInfo {
            id: self.id().to_string(),
            signature: Signature {
                inputs: self.input_types().clone(),
                output_type: self.output_type(),
            },
        }
    }

    /// Runs the rule. `params` is guaranteed by the caller to contain
    /// exactly [`Rule::input_types`] (no more, no fewer).
    fn execute(&self, params: &Params) -> Result<Arc<dyn RuleValue>, RulesError>;
}

struct FnRule<F> {
    id: String,
    inputs: BTreeSet<TypeKey>,
    output: TypeKey,
    func: F,
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Params) -> Result<Arc<dyn RuleValue>, RulesError> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn input_types(&self) -> &BTreeSet<TypeKey> {
        &self.inputs
    }

    fn output_type(&self) -> TypeKey {
        self.output
    }

    fn execute(&self, params: &Params) -> Result<Arc<dyn RuleValue>, RulesError> {
        (self.func)(params)
    }
}

fn missing(rule_id: &str, key: TypeKey) -> RulesError {
    RulesError::MissingParam {
        rule_id: rule_id.to_string(),
        missing: key,
    }
}

/// Builds a rule with no inputs — a constant or a source of data pulled
/// from outside the engine (e.g. the current time, a config value).
pub fn rule0<O, F>(id: impl Into<String>, f: F) -> Arc<dyn Rule>
where
    O: RuleValue,
    F: Fn() -> Result<O, RulesError> + Send + Sync + 'static,
{
    let id = id.into();
    Arc::new(FnRule {
        id,
        inputs: BTreeSet::new(),
        output: TypeKey::of::<O>(),
        func: move |_: &Params| f().map(|o| Arc::new(o) as Arc<dyn RuleValue>),
    })
}

/// Builds a rule computing `O` from a single input `I1`.
pub fn rule1<I1, O, F>(id: impl Into<String>, f: F) -> Arc<dyn Rule>
where
    I1: RuleValue + Clone,
    O: RuleValue,
    F: Fn(I1) -> Result<O, RulesError> + Send + Sync + 'static,
{
    let id = id.into();
    let rule_id = id.clone();
    Arc::new(FnRule {
        id,
        inputs: BTreeSet::from([TypeKey::of::<I1>()]),
        output: TypeKey::of::<O>(),
        func: move |params: &Params| {
            let i1 = params.get::<I1>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I1>()))?;
            f(i1).map(|o| Arc::new(o) as Arc<dyn RuleValue>)
        },
    })
}

/// Builds a rule computing `O` from two inputs `I1`, `I2`.
pub fn rule2<I1, I2, O, F>(id: impl Into<String>, f: F) -> Arc<dyn Rule>
where
    I1: RuleValue + Clone,
    I2: RuleValue + Clone,
    O: RuleValue,
    F: Fn(I1, I2) -> Result<O, RulesError> + Send + Sync + 'static,
{
    let id = id.into();
    let rule_id = id.clone();
    Arc::new(FnRule {
        id,
        inputs: BTreeSet::from([TypeKey::of::<I1>(), TypeKey::of::<I2>()]),
        output: TypeKey::of::<O>(),
        func: move |params: &Params| {
            let i1 = params.get::<I1>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I1>()))?;
            let i2 = params.get::<I2>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I2>()))?;
            f(i1, i2).map(|o| Arc::new(o) as Arc<dyn RuleValue>)
        },
    })
}

/// Builds a rule computing `O` from three inputs `I1`, `I2`, `I3`.
pub fn rule3<I1, I2, I3, O, F>(id: impl Into<String>, f: F) -> Arc<dyn Rule>
where
    I1: RuleValue + Clone,
    I2: RuleValue + Clone,
    I3: RuleValue + Clone,
    O: RuleValue,
    F: Fn(I1, I2, I3) -> Result<O, RulesError> + Send + Sync + 'static,
{
    let id = id.into();
    let rule_id = id.clone();
    Arc::new(FnRule {
        id,
        inputs: BTreeSet::from([TypeKey::of::<I1>(), TypeKey::of::<I2>(), TypeKey::of::<I3>()]),
        output: TypeKey::of::<O>(),
        func: move |params: &Params| {
            let i1 = params.get::<I1>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I1>()))?;
            let i2 = params.get::<I2>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I2>()))?;
            let i3 = params.get::<I3>().ok_or_else(|| missing(&rule_id, TypeKey::of::<I3>()))?;
            f(i1, i2, i3).map(|o| Arc::new(o) as Arc<dyn RuleValue>)
        },
    })
}
