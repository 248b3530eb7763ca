use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{ExprKind, Node, NodeKind};

use crate::function_definition::FunctionDefinitionCheck;
use crate::rule::{Rule, RuleError};

#[derive(Debug, Clone, Default)]
pub struct ExistingClassesInClosureTypehintsRule {
    check: FunctionDefinitionCheck,
}

impl ExistingClassesInClosureTypehintsRule {
    pub fn new(check: FunctionDefinitionCheck) -> Self {
        Self { check }
    }
}

impl Rule for ExistingClassesInClosureTypehintsRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::Closure
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Some(ExprKind::Closure(closure)) = node.as_expr().map(|expr| &expr.kind) else {
            return Ok(Vec::new());
        };

        self.check.check_function(
            scope.broker(),
            &closure.params,
            closure.return_type.as_ref(),
            |param, hint| {
                format!(
                    "Parameter ${} of anonymous function has invalid typehint type {}.",
                    param, hint
                )
            },
            |hint| format!("Return typehint of anonymous function has invalid type {}.", hint),
        )
    }
}
