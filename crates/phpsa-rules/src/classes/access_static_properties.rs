use phpsa_analyser::reflection::ClassMember;
use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Expr, ExprKind, Node, NodeKind};

use crate::rule::{Rule, RuleError};

/// `Class::$property`: the property exists, is static and is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessStaticPropertiesRule;

impl AccessStaticPropertiesRule {
    pub fn new() -> Self {
        Self
    }
}

impl Rule for AccessStaticPropertiesRule {
    fn node_kind(&self) -> NodeKind {
        NodeKind::StaticPropertyFetch
    }

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>> {
        let Some(expr @ Expr {
            kind: ExprKind::StaticPropertyFetch { class, name },
            ..
        }) = node.as_expr()
        else {
            return Ok(Vec::new());
        };
        let (Some(class), Some(name)) = (class.as_name(), name.as_ident()) else {
            return Ok(Vec::new());
        };

        let broker = scope.broker();
        let class_name = match class.trim_start_matches('\\') {
            relative @ ("self" | "static" | "parent") => {
                let Some(current_class) = scope.class_name() else {
                    return Ok(Vec::new());
                };
                if relative != "parent" {
                    current_class.to_string()
                } else {
                    if !broker.has_class(current_class)? {
                        return Ok(Vec::new());
                    }
                    match broker.get_class(current_class)?.parent_class_name() {
                        Some(parent) => parent.to_string(),
                        None => {
                            return Ok(vec![RuleError::new(format!(
                                "{}::{}() accesses parent::${} but {} does not extend any class.",
                                current_class,
                                scope.function_name().unwrap_or_default(),
                                name,
                                current_class
                            ))]);
                        }
                    }
                }
            }
            other => other.to_string(),
        };

        if !broker.has_class(&class_name)? {
            return Ok(Vec::new());
        }
        let class = broker.get_class(&class_name)?;
        let Some(property) = class.property(name) else {
            if scope.is_specified(expr) {
                return Ok(Vec::new());
            }
            return Ok(vec![RuleError::new(format!(
                "Access to an undefined static property {}::${}.",
                class.name(), name
            ))]);
        };

        if !property.is_static {
            return Ok(vec![RuleError::new(format!(
                "Static access to instance property {}::${}.",
                property.declaring_class, name
            ))]);
        }

        if !scope.can_access_property(&**property)? {
            return Ok(vec![RuleError::new(format!(
                "Access to {} static property ${} of class {}.",
                property.visibility().as_str(),
                name,
                property.declaring_class
            ))]);
        }

        Ok(Vec::new())
    }
}
