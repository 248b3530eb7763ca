use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Expr, ExprKind, Node, NodeKind};

use crate::function_call_parameters::{CallMessages, FunctionCallParametersCheck};
use crate::rule::{Rule, RuleError};

/// `$receiver->method(...)`: the method exists, is visible from here, is
/// called with a fitting argument list and with its declared case.
#[derive(Debug, Clone, Default)]
pub struct CallMethodsRule {
    check: FunctionCallParametersCheck,
}

impl CallMethodsRule {
    pub fn new(check: FunctionCallParametersCheck) -> Self {
        Self { check }
    }
}

impl Rule for CallMethodsRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::MethodCall
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Some(Expr {
            kind: ExprKind::MethodCall { var, name, args },
            ..
        }) = node.as_expr()
        else {
            return Ok(Vec::new());
        };
        if scope.is_in_closure_bind() {
            return Ok(Vec::new());
        }
        let Some(name) = name.as_ident() else {
            return Ok(Vec::new());
        };

        let receiver = scope.resolve_type(var)?;
        let Some(class_name) = receiver.class_name() else {
            return Ok(Vec::new());
        };
        let broker = scope.broker();
        if !broker.has_class(class_name)? {
            return Ok(Vec::new());
        }
        let class = broker.get_class(class_name)?;

        let Some(method) = class.method_ignoring_case(name) else {
            for parent_name in class.parent_class_names() {
                let parent = broker.get_class(parent_name)?;
                if let Some(private) = parent.method_ignoring_case(name) {
                    return Ok(vec![RuleError::new(format!(
                        "Call to private method {}() of parent class {}.",
                        private.name, parent.name
                    ))]);
                }
            }
            return Ok(vec![RuleError::new(format!(
                "Call to an undefined method {}::{}().",
                class.name, name
            ))]);
        };

        let method_name = format!("{}::{}()", method.declaring_class, method.name);
        if !scope.can_call_method(&**method)? {
            return Ok(vec![RuleError::new(format!(
                "Cannot call method {} from current scope.",
                method_name
            ))]);
        }

        let mut errors =
            self.check
                .check(&**method, scope, args, &CallMessages::method(&method_name))?;
        if method.name != name {
            errors.push(RuleError::new(format!(
                "Call to method {} with incorrect case: {}",
                method_name, name
            )));
        }
        Ok(errors)
    }
}
