//! Argument count and argument type checks shared by the call rules.

use phpsa_analyser::reflection::{ParameterFact, ParametersAcceptor};
use phpsa_analyser::{AnalysisResult, Scope, Type};
use phpsa_types::ast::Arg;

use crate::options::RuleOptions;
use crate::rule::RuleError;

/// How a callee is named in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMessages {
    /// Sentence start: `Method Foo::bar()`.
    invoked: String,
    /// Mid-sentence: `method Foo::bar()`.
    described: String,
}

impl CallMessages {
    pub fn new(invoked: impl Into<String>, described: impl Into<String>) -> Self {
        Self {
            invoked: invoked.into(),
            described: described.into(),
        }
    }

    /// `name` is `Class::method()`.
    pub fn method(name: &str) -> Self {
        Self::new(format!("Method {}", name), format!("method {}", name))
    }

    pub fn static_method(name: &str) -> Self {
        Self::new(format!("Static method {}", name), format!("static method {}", name))
    }

    pub fn constructor(class: &str) -> Self {
        Self::new(
            format!("Class {} constructor", class),
            format!("class {} constructor", class),
        )
    }

    pub fn parent_constructor() -> Self {
        Self::new("Parent constructor", "parent constructor")
    }
}

fn parameters(count: usize) -> &'static str {
    if count == 1 {
        "parameter"
    } else {
        "parameters"
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCallParametersCheck {
    check_argument_types: bool,
}

impl FunctionCallParametersCheck {
    pub fn new(options: &RuleOptions) -> Self {
        Self {
            check_argument_types: options.check_argument_types,
        }
    }

    pub fn check(
        &self,
        function: &dyn ParametersAcceptor,
        scope: &Scope,
        args: &[Arg],
        messages: &CallMessages,
    ) -> AnalysisResult<Vec<RuleError>> {
        let declared = function.parameters();
        let min = declared.iter().filter(|p| !p.optional).count();
        let max = (!function.is_variadic()).then_some(declared.len());

        // an unpacked argument could fill any number of parameters
        let invoked = if args.iter().any(|arg| arg.unpack) {
            max.map_or(min, |max| min.max(max))
        } else {
            args.len()
        };

        let count_error = match max {
            Some(max) if invoked < min || invoked > max => Some(if min == max {
                format!(
                    "{} invoked with {} {}, {} required.",
                    messages.invoked,
                    invoked,
                    parameters(invoked),
                    min
                )
            } else {
                format!(
                    "{} invoked with {} {}, {}-{} required.",
                    messages.invoked,
                    invoked,
                    parameters(invoked),
                    min,
                    max
                )
            }),
            None if invoked < min => Some(format!(
                "{} invoked with {} {}, at least {} required.",
                messages.invoked,
                invoked,
                parameters(invoked),
                min
            )),
            _ => None,
        };
        if let Some(message) = count_error {
            return Ok(vec![RuleError::new(message)]);
        }

        if !self.check_argument_types {
            return Ok(Vec::new());
        }

        let mut errors = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            if arg.unpack {
                break;
            }
            let Some(parameter) = parameter_at(function, declared, i) else {
                break;
            };
            let given = scope.resolve_type(&arg.value)?;
            if accepts(scope, &parameter.ty, &given)? {
                continue;
            }
            errors.push(RuleError::new(format!(
                "Parameter {} (${}) of {} expects {}, {} given.",
                i + 1,
                parameter.name,
                messages.described,
                parameter.ty.describe(),
                given.describe()
            )));
        }
        Ok(errors)
    }
}

/// Extra arguments of a variadic callee bind to its last parameter.
fn parameter_at<'a>(
    function: &dyn ParametersAcceptor,
    declared: &'a [ParameterFact],
    index: usize,
) -> Option<&'a ParameterFact> {
    declared
        .get(index)
        .or_else(|| if function.is_variadic() { declared.last() } else { None })
}

/// [`Type::accepts`] widened by subclassing and, outside strict mode,
/// scalar coercion.
fn accepts(scope: &Scope, expected: &Type, given: &Type) -> AnalysisResult<bool> {
    if expected.accepts(given) {
        return Ok(true);
    }

    if let (Some(expected_class), Some(given_class)) = (expected.class_name(), given.class_name()) {
        let broker = scope.broker();
        if broker.has_class(given_class)? {
            return Ok(broker.get_class(given_class)?.is_subclass_of(expected_class));
        }
        return Ok(false);
    }

    Ok(!scope.is_declare_strict_types() && expected.is_scalar() && given.is_scalar())
}
