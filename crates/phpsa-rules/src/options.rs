use serde::{Deserialize, Serialize};

/// Switches shared by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleOptions {
    /// Also compare argument types against declared parameter types.
    pub check_argument_types: bool,
}
