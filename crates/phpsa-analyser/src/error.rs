//! Analysis error types.

use thiserror::Error;

/// Errors raised by the broker and by scope accessors.
///
/// Type inference itself never reports a modeling gap as an error; it
/// degrades to `mixed`. These variants are caller contract violations or
/// faults of the host symbol universe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Direct lookup of a variable that is not bound in the scope.
    #[error("Undefined variable: ${0}")]
    UndefinedVariable(String),

    /// `Broker::get_class` on a name the universe cannot resolve.
    #[error("Class {0} was not found while trying to analyse it")]
    ClassNotFound(String),

    /// `Broker::get_function` on a name the universe cannot resolve.
    #[error("Function {0} not found while trying to analyse it")]
    FunctionNotFound(String),

    /// The host failed while resolving a class. Distinct from "not found"
    /// and must be surfaced.
    #[error("{reason} (error occurred while autoloading class {class})")]
    ClassAutoloading { class: String, reason: String },

    /// A state the analyser considers unreachable.
    #[error("internal error: {0}")]
    ShouldNotHappen(String),
}

/// Result alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
