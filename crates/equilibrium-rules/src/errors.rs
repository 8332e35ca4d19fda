//! The rules engine's error taxonomy.

use thiserror::Error;

use crate::rule::RuleInfo;
use crate::signature::{Signature, TypeKey};

#[derive(Debug, Clone, Error)]
pub enum RulesError {
    #[error("duplicate rule id: {0:?}")]
    DuplicateRuleId(String),

    #[error("rules graph contains a cycle through {0}")]
    CyclicGraph(TypeKey),

    /// No registered rule (nor any chain of rules) can produce `sig`'s
    /// output type from its input types. `available` lists every rule that
    /// produces the same output type, for diagnosis.
    #[error("no rule(s) satisfy {sig}")]
    NoMatchingRule { sig: Signature, available: Vec<RuleInfo> },

    /// More than one distinct chain of rules satisfies `sig` — the graph
    /// is ambiguous and needs a more specific signature or fewer rules.
    #[error("multiple paths satisfy {sig}")]
    MultipleMatchingRules { sig: Signature, paths: Vec<Vec<RuleInfo>> },

    #[error("rule {rule_id:?} did not receive required parameter {missing}")]
    MissingParam { rule_id: String, missing: TypeKey },

    #[error("no current rules engine: call must happen inside a rule body")]
    NoCurrentEngine,

    #[error("resolved value did not downcast to the requested output type")]
    OutputTypeMismatch,
}
