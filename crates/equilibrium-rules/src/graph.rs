//! [`RulesGraph`]: rules as edges between the types they consume and
//! produce, validated to be acyclic, and searchable for the chain of rules
//! that turns a set of available types into a wanted one.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::RulesError;
use crate::rule::Rule;
use crate::signature::{Signature, TypeKey};

pub struct RulesGraph {
    rules: IndexMap<String, Arc<dyn Rule>>,
    /// output type -> rules that produce it.
    by_output: HashMap<TypeKey, Vec<Arc<dyn Rule>>>,
}

impl RulesGraph {
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Result<Self, RulesError> {
        let mut by_id = IndexMap::new();
        for rule in rules {
            let id = rule.id().to_string();
            if by_id.insert(id.clone(), rule).is_some() {
                return Err(RulesError::DuplicateRuleId(id));
            }
        }

        let mut by_output: HashMap<TypeKey, Vec<Arc<dyn Rule>>> = HashMap::new();
        for rule in by_id.values() {
            by_output.entry(rule.output_type()).or_default().push(Arc::clone(rule));
        }

        let graph = RulesGraph { rules: by_id, by_output };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), RulesError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<TypeKey, Mark> = HashMap::new();

        fn visit(
            node: TypeKey,
            by_output: &HashMap<TypeKey, Vec<Arc<dyn Rule>>>,
            marks: &mut HashMap<TypeKey, Mark>,
        ) -> Result<(), RulesError> {
            match marks.get(&node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(RulesError::CyclicGraph(node)),
                None => {}
            }
            marks.insert(node, Mark::Visiting);
            if let Some(producers) = by_output.get(&node) {
                for rule in producers {
                    for input in rule.input_types() {
                        visit(*input, by_output, marks)?;
                    }
                }
            }
            marks.insert(node, Mark::Done);
            Ok(())
        }

        for output in self.by_output.keys() {
            visit(*output, &self.by_output, &mut marks)?;
        }
        Ok(())
    }

    pub fn rules_for(&self, output: TypeKey) -> Vec<Arc<dyn Rule>> {
        self.by_output.get(&output).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds the ordered chain of rules that turns `available` into
    /// `output`, recursively resolving any input a producing rule is
    /// missing. Fails if no rule produces `output` at all, or if more than
    /// one distinct chain would satisfy it.
    pub fn find_path(&self, available: &BTreeSet<TypeKey>, output: TypeKey) -> Result<Vec<Arc<dyn Rule>>, RulesError> {
        if available.contains(&output) {
            return Ok(Vec::new());
        }

        let producers = self.rules_for(output);
        let mut results: Vec<Vec<Arc<dyn Rule>>> = Vec::new();

        'candidates: for rule in &producers {
            let mut chain: Vec<Arc<dyn Rule>> = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            for missing_input in rule.input_types().difference(available) {
                match self.find_path(available, *missing_input) {
                    Ok(sub_chain) => {
                        for sub_rule in sub_chain {
                            if seen.insert(sub_rule.id().to_string()) {
                                chain.push(sub_rule);
                            }
                        }
                    }
                    Err(RulesError::NoMatchingRule { .. }) => continue 'candidates,
                    Err(RulesError::MultipleMatchingRules { .. }) => continue 'candidates,
                    Err(other) => return Err(other),
                }
            }
            chain.push(Arc::clone(rule));
            results.push(chain);
        }

        match results.len() {
            0 => Err(RulesError::NoMatchingRule {
                sig: Signature {
                    inputs: available.clone(),
                    output_type: output,
                },
                available: producers.iter().map(|r| r.info()).collect(),
            }),
            1 => Ok(results.into_iter().next().unwrap()),
            _ => Err(RulesError::MultipleMatchingRules {
                sig: Signature {
                    inputs: available.clone(),
                    output_type: output,
                },
                paths: results.iter().map(|path| path.iter().map(|r| r.info()).collect()).collect(),
            }),
        }
    }
}
