use phpsa_analyser::{AnalysisResult, Scope};
use phpsa_types::ast::{Node, NodeKind};

/// A finding produced by a rule, before the registry attaches the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    pub message: String,
    /// Overrides the line of the node the rule ran on.
    pub line: Option<u32>,
}

impl RuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl From<String> for RuleError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// A check run on every node of one kind.
///
/// Rules read the scope and the broker behind it; they never change either.
/// An `Err` means the check could not be evaluated for this node.
pub trait Rule {
    fn node_kind(&self) -> NodeKind;

    fn process_node(&self, node: Node<'_>, scope: &Scope) -> AnalysisResult<Vec<RuleError>>;
}
