use serde::{Deserialize, Serialize};
use std::fmt;

/// A single finding reported by a rule.
///
/// Rendered by the output layer; it must not parse free-form strings,
/// so file and line are kept as separate fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Analysed file path.
    pub file: String,
    /// Human-readable message, e.g. `Call to an undefined method Foo::bar().`
    pub message: String,
    /// Source line of the offending node, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.file, line, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

/// Collected diagnostics of one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn total_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.errors.extend(diagnostics);
    }

    /// Messages in report order, mostly for assertions.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new("src/Foo.php", "Call to an undefined method Foo::bar().", Some(40));
        assert_eq!(
            d.to_string(),
            "src/Foo.php:40: Call to an undefined method Foo::bar()."
        );
        let d = Diagnostic::new("src/Foo.php", "Something.", None);
        assert_eq!(d.to_string(), "src/Foo.php: Something.");
    }

    #[test]
    fn test_diagnostics_counts() {
        let mut diagnostics = Diagnostics::empty();
        assert!(!diagnostics.has_errors());
        diagnostics.extend(vec![
            Diagnostic::new("a.php", "one", Some(1)),
            Diagnostic::new("a.php", "two", Some(2)),
        ]);
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.total_errors(), 2);
        assert_eq!(diagnostics.messages(), vec!["one", "two"]);

        diagnostics.push(Diagnostic::new("b.php", "three", None));
        assert_eq!(diagnostics.total_errors(), 3);
        assert_eq!(diagnostics.errors().len(), 3);
        assert_eq!(diagnostics.errors()[2].file, "b.php");
    }

    #[test]
    fn test_diagnostics_count_follows_deserialized_errors() {
        let json = r#"{"errors":[{"file":"a.php","message":"one","line":3}]}"#;
        let diagnostics: Diagnostics = serde_json::from_str(json).unwrap();
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.total_errors(), 1);

        let back = serde_json::to_string(&diagnostics).unwrap();
        assert!(!back.contains("total_errors"));
    }

    #[test]
    fn test_diagnostic_json_serialization() {
        let d = Diagnostic::new("a.php", "Cannot call method Foo::foo() from current scope.", Some(41));
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"file\":\"a.php\""));
        assert!(json.contains("\"line\":41"));

        let without_line = Diagnostic::new("a.php", "x", None);
        let json = serde_json::to_string(&without_line).unwrap();
        assert!(!json.contains("line"));

        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, without_line);
    }
}
