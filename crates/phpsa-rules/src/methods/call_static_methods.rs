use phpsa_analyser::reflection::ClassMember;
use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Expr, ExprKind, Node, NodeKind};

use crate::function_call_parameters::{CallMessages, FunctionCallParametersCheck};
use crate::rule::{Rule, RuleError};

/// `Class::method(...)` from inside a class, including `self::`,
/// `static::` and `parent::` calls.
#[derive(Debug, Clone, Default)]
pub struct CallStaticMethodsRule {
    check: FunctionCallParametersCheck,
}

impl CallStaticMethodsRule {
    pub fn new(check: FunctionCallParametersCheck) -> Self {
        Self { check }
    }
}

impl Rule for CallStaticMethodsRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::StaticCall
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Some(Expr {
            kind: ExprKind::StaticCall { class, name, args },
            ..
        }) = node.as_expr()
        else {
            return Ok(Vec::new());
        };
        let Some(name) = name.as_ident() else {
            return Ok(Vec::new());
        };
        let Some(current_class) = scope.class_name() else {
            return Ok(Vec::new());
        };
        let Some(class) = class.as_name() else {
            return Ok(Vec::new());
        };

        let broker = scope.broker();
        if !broker.has_class(current_class)? {
            return Ok(Vec::new());
        }
        let current = broker.get_class(current_class)?;

        let class_name = match class.trim_start_matches('\\') {
            "self" | "static" => current_class.to_string(),
            "parent" => {
                let function = scope.function_name().unwrap_or_default();
                let Some(parent) = current.parent_class_name() else {
                    return Ok(vec![RuleError::new(format!(
                        "{}::{}() calls to parent::{}() but {} does not extend any class.",
                        current_class, function, name, current_class
                    ))]);
                };

                let in_instance_method = current
                    .method_ignoring_case(function)
                    .is_some_and(|method| !method.is_static);
                if in_instance_method {
                    // parent::method() from an instance method is a regular call;
                    // only the constructor's argument list is checked
                    if name.eq_ignore_ascii_case("__construct") {
                        let parent = broker.get_class(parent)?;
                        if let Some(constructor) = parent.method_ignoring_case("__construct") {
                            return self.check.check(
                                &**constructor,
                                scope,
                                args,
                                &CallMessages::parent_constructor(),
                            );
                        }
                    }
                    return Ok(Vec::new());
                }
                parent.to_string()
            }
            other => other.to_string(),
        };

        if !broker.has_class(&class_name)? {
            return Ok(Vec::new());
        }
        let target = broker.get_class(&class_name)?;
        let Some(method) = target.method_ignoring_case(name) else {
            return Ok(vec![RuleError::new(format!(
                "Call to an undefined static method {}::{}().",
                class_name, name
            ))]);
        };

        if !method.is_static {
            return Ok(vec![RuleError::new(format!(
                "Static call to instance method {}::{}().",
                class_name, method.name
            ))]);
        }

        if method.declaring_class != current_class {
            let inherited = current
                .parent_class_names()
                .iter()
                .any(|ancestor| *ancestor == method.declaring_class);
            if inherited {
                if method.is_private() {
                    return Ok(vec![RuleError::new(format!(
                        "Call to private static method {}() of class {}.",
                        method.name, method.declaring_class
                    ))]);
                }
            } else if !method.is_public() {
                return Ok(vec![RuleError::new(format!(
                    "Call to {} static method {}() of class {}.",
                    method.visibility.as_str(),
                    method.name,
                    method.declaring_class
                ))]);
            }
        }

        let method_name = format!("{}::{}()", class_name, method.name);
        let mut errors = self.check.check(
            &**method,
            scope,
            args,
            &CallMessages::static_method(&method_name),
        )?;
        if method.name != name {
            errors.push(RuleError::new(format!(
                "Call to static method {} with incorrect case: {}",
                method_name, name
            )));
        }
        Ok(errors)
    }
}
