//! Rule registry: maps node kinds to the rules that observe them.
//!
//! The driver hands every node and its scope to [`Registry::process`];
//! the registry runs the matching rules and turns their findings into
//! [`Diagnostic`]s carrying the analysed file and line.

use std::fmt;

use phpsa_analyser::Scope;
use phpsa_types::ast::{Node, NodeKind};
use phpsa_types::Diagnostic;
use rustc_hash::FxHashMap;

use crate::classes::{AccessStaticPropertiesRule, InstantiationRule};
use crate::function_call_parameters::FunctionCallParametersCheck;
use crate::function_definition::FunctionDefinitionCheck;
use crate::functions::ExistingClassesInClosureTypehintsRule;
use crate::methods::{CallMethodsRule, CallStaticMethodsRule, ExistingClassesInTypehintsRule};
use crate::options::RuleOptions;
use crate::rule::Rule;

#[derive(Default)]
pub struct Registry {
    rules: FxHashMap<NodeKind, Vec<Box<dyn Rule>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every bundled rule.
    pub fn with_default_rules(options: &RuleOptions) -> Self {
        let calls = FunctionCallParametersCheck::new(options);
        let definitions = FunctionDefinitionCheck::new();

        let mut registry = Self::new();
        registry.register(CallMethodsRule::new(calls.clone()));
        registry.register(CallStaticMethodsRule::new(calls.clone()));
        registry.register(InstantiationRule::new(calls));
        registry.register(AccessStaticPropertiesRule::new());
        registry.register(ExistingClassesInTypehintsRule::new(definitions.clone()));
        registry.register(ExistingClassesInClosureTypehintsRule::new(definitions));
        tracing::debug!(rules = registry.len(), "registered default rules");
        registry
    }

    pub fn register(&mut self, rule: impl Rule + 'static) {
        self.rules
            .entry(rule.node_kind())
            .or_default()
            .push(Box::new(rule));
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.register(rule);
        self
    }

    /// Rules observing `kind`, in registration order.
    pub fn rules_for(&self, kind: NodeKind) -> &[Box<dyn Rule>] {
        self.rules.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every rule registered for the node's kind.
    ///
    /// A rule that fails (unknown symbol, autoload fault) reports nothing
    /// for this node; the remaining rules still run.
    pub fn process(&self, node: Node<'_>, scope: &Scope) -> Vec<Diagnostic> {
        let kind = node.kind();
        let node_line = node.span().line();
        let mut diagnostics = Vec::new();

        for rule in self.rules_for(kind) {
            match rule.process_node(node, scope) {
                Ok(errors) => diagnostics.extend(errors.into_iter().map(|error| {
                    Diagnostic::new(scope.file(), error.message, error.line.or(node_line))
                })),
                Err(err) => {
                    tracing::warn!(
                        file = scope.file(),
                        kind = ?kind,
                        error = %err,
                        "rule skipped node"
                    );
                }
            }
        }

        diagnostics
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self
            .rules
            .iter()
            .map(|(kind, rules)| (format!("{:?}", kind), rules.len()))
            .collect();
        kinds.sort();
        f.debug_struct("Registry").field("rules", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_by_kind() {
        let registry = Registry::with_default_rules(&RuleOptions::default());
        assert_eq!(registry.len(), 6);
        for kind in [
            NodeKind::MethodCall,
            NodeKind::StaticCall,
            NodeKind::New,
            NodeKind::StaticPropertyFetch,
            NodeKind::ClassMethod,
            NodeKind::Closure,
        ] {
            assert_eq!(registry.rules_for(kind).len(), 1, "{:?}", kind);
        }
        assert!(registry.rules_for(NodeKind::Variable).is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.rules_for(NodeKind::New).is_empty());
    }
}
