//! Rules of the phpsa analyser.
//!
//! Each rule observes one [`NodeKind`](phpsa_types::ast::NodeKind) and
//! reports [`RuleError`]s; the [`Registry`] dispatches nodes to rules and
//! turns their findings into diagnostics.

pub mod classes;
pub mod function_call_parameters;
pub mod function_definition;
pub mod functions;
pub mod methods;
pub mod options;
pub mod registry;
pub mod rule;

pub use function_call_parameters::{CallMessages, FunctionCallParametersCheck};
pub use function_definition::FunctionDefinitionCheck;
pub use options::RuleOptions;
pub use registry::Registry;
pub use rule::{Rule, RuleError};
