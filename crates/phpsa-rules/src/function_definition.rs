//! Class typehints of a function signature must name existing classes.

use phpsa_analyser::{AnalysisResult, Broker};
use phpsa_types::ast::{Param, TypeHint};

use crate::rule::RuleError;

#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionDefinitionCheck;

impl FunctionDefinitionCheck {
    pub fn new() -> Self {
        Self
    }

    /// `parameter_message` receives the parameter name and the hint;
    /// `return_message` receives the hint.
    pub fn check_function(
        &self,
        broker: &Broker,
        params: &[Param],
        return_type: Option<&TypeHint>,
        parameter_message: impl Fn(&str, &str) -> String,
        return_message: impl Fn(&str) -> String,
    ) -> AnalysisResult<Vec<RuleError>> {
        let mut errors = Vec::new();
        for param in params {
            if let Some(class) = missing_class(broker, param.type_hint.as_ref())? {
                let error = RuleError::new(parameter_message(&param.name, class));
                errors.push(match param.span.line() {
                    Some(line) => error.with_line(line),
                    None => error,
                });
            }
        }
        if let Some(class) = missing_class(broker, return_type)? {
            errors.push(RuleError::new(return_message(class)));
        }
        Ok(errors)
    }
}

fn missing_class<'a>(broker: &Broker, hint: Option<&'a TypeHint>) -> AnalysisResult<Option<&'a str>> {
    let Some(hint) = hint else {
        return Ok(None);
    };
    if hint.is_builtin() {
        return Ok(None);
    }
    let class = hint.name.trim_start_matches('\\');
    Ok((!broker.has_class(class)?).then_some(class))
}
