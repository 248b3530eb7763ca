use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Node, NodeKind};

use crate::function_definition::FunctionDefinitionCheck;
use crate::rule::{Rule, RuleError};

#[derive(Debug, Clone, Default)]
pub struct ExistingClassesInTypehintsRule {
    check: FunctionDefinitionCheck,
}

impl ExistingClassesInTypehintsRule {
    pub fn new(check: FunctionDefinitionCheck) -> Self {
        Self { check }
    }
}

impl Rule for ExistingClassesInTypehintsRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::ClassMethod
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Node::ClassMethod(method) = node else {
            return Ok(Vec::new());
        };
        let Some(class) = scope
            .class_name()
            .or_else(|| scope.anonymous_class().map(|class| class.name()))
        else {
            return Ok(Vec::new());
        };

        self.check.check_function(
            scope.broker(),
            &method.params,
            method.return_type.as_ref(),
            |param, hint| {
                format!(
                    "Parameter ${} of method {}::{}() has invalid typehint type {}.",
                    param, class, method.name, hint
                )
            },
            |hint| {
                format!(
                    "Return typehint of method {}::{}() has invalid type {}.",
                    class, method.name, hint
                )
            },
        )
    }
}
