use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Expr, ExprKind, Node, NodeKind};

use crate::function_call_parameters::{CallMessages, FunctionCallParametersCheck};
use crate::rule::{Rule, RuleError};

/// `new Class(...)`: the class exists, can be instantiated, and its
/// constructor accepts the arguments.
#[derive(Debug, Clone, Default)]
pub struct InstantiationRule {
    check: FunctionCallParametersCheck,
}

impl InstantiationRule {
    pub fn new(check: FunctionCallParametersCheck) -> Self {
        Self { check }
    }
}

impl Rule for InstantiationRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::New
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Some(Expr {
            kind: ExprKind::New { class, args },
            ..
        }) = node.as_expr()
        else {
            return Ok(Vec::new());
        };
        let Some(class) = class.as_name() else {
            return Ok(Vec::new());
        };

        let broker = scope.broker();
        let class_name = match class.trim_start_matches('\\') {
            "static" => return Ok(Vec::new()),
            "self" => match scope.class_name() {
                Some(current) => current.to_string(),
                None => return Ok(Vec::new()),
            },
            "parent" => {
                let Some(current) = scope.class_name() else {
                    return Ok(Vec::new());
                };
                if !broker.has_class(current)? {
                    return Ok(Vec::new());
                }
                match broker.get_class(current)?.parent_class_name() {
                    Some(parent) => parent.to_string(),
                    None => return Ok(Vec::new()),
                }
            }
            other => other.to_string(),
        };

        if !broker.has_class(&class_name)? {
            return Ok(vec![RuleError::new(format!(
                "Instantiated class {} not found.",
                class_name
            ))]);
        }
        let class = broker.get_class(&class_name)?;
        if class.is_interface() {
            return Ok(vec![RuleError::new(format!(
                "Cannot instantiate interface {}.",
                class_name
            ))]);
        }
        if class.is_abstract() {
            return Ok(vec![RuleError::new(format!(
                "Instantiated class {} is abstract.",
                class_name
            ))]);
        }

        // a method named after a non-namespaced class is an old-style constructor
        let constructor = class.method_ignoring_case("__construct").or_else(|| {
            (!class_name.contains('\\'))
                .then(|| class.method_ignoring_case(&class_name))
                .flatten()
        });
        let Some(constructor) = constructor else {
            if args.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![RuleError::new(format!(
                "Class {} does not have a constructor and must be instantiated without any parameters.",
                class_name
            ))]);
        };

        self.check.check(
            &**constructor,
            scope,
            args,
            &CallMessages::constructor(&class_name),
        )
    }
}
