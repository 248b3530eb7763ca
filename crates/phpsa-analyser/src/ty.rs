//! The nominal type lattice.
//!
//! [`Type`] is the semantic type inferred for expressions and declared on
//! reflected members. It is distinct from [`phpsa_types::ast::TypeHint`],
//! which is the syntactic hint written in source.
//!
//! Every variant carries a nullability flag orthogonal to the tag. There is
//! no general union: two different variants meeting at a join widen to
//! `mixed`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use phpsa_types::ast::TypeHint;

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// Variant tag of a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Mixed,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Callable,
    Null,
    /// An instance of the named class.
    Object(String),
    /// The `static` return type, bound to the class that declared it.
    /// Resolved against the receiver at each call site.
    Static(String),
}

/// A semantic type: variant tag plus nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Type {
    kind: TypeKind,
    nullable: bool,
}

impl Type {
    pub fn new(kind: TypeKind, nullable: bool) -> Self {
        let nullable = nullable || kind == TypeKind::Null;
        Self { kind, nullable }
    }

    pub fn mixed(nullable: bool) -> Self {
        Self::new(TypeKind::Mixed, nullable)
    }

    pub fn boolean(nullable: bool) -> Self {
        Self::new(TypeKind::Boolean, nullable)
    }

    pub fn integer(nullable: bool) -> Self {
        Self::new(TypeKind::Integer, nullable)
    }

    pub fn float(nullable: bool) -> Self {
        Self::new(TypeKind::Float, nullable)
    }

    pub fn string(nullable: bool) -> Self {
        Self::new(TypeKind::String, nullable)
    }

    pub fn array(nullable: bool) -> Self {
        Self::new(TypeKind::Array, nullable)
    }

    pub fn callable(nullable: bool) -> Self {
        Self::new(TypeKind::Callable, nullable)
    }

    /// `null` is always nullable.
    pub fn null() -> Self {
        Self::new(TypeKind::Null, true)
    }

    pub fn object(class_name: impl Into<String>, nullable: bool) -> Self {
        Self::new(TypeKind::Object(class_name.into()), nullable)
    }

    pub fn static_type(class_name: impl Into<String>, nullable: bool) -> Self {
        Self::new(TypeKind::Static(class_name.into()), nullable)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The class name for `Object` and `Static`, `None` otherwise.
    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Object(name) | TypeKind::Static(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.kind == TypeKind::Mixed
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, TypeKind::Static(_))
    }

    /// True for `int`, `float`, `string` and `bool`.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Integer | TypeKind::Float | TypeKind::String | TypeKind::Boolean
        )
    }

    pub fn make_nullable(&self) -> Type {
        Self::new(self.kind.clone(), true)
    }

    /// Least upper bound at a control-flow join.
    ///
    /// Same variant (and same class for objects) keeps the variant;
    /// anything else widens to `mixed`. Nullability is the OR of both sides.
    pub fn combine(&self, other: &Type) -> Type {
        let nullable = self.nullable || other.nullable;
        if self.kind == other.kind {
            Self::new(self.kind.clone(), nullable)
        } else {
            Self::mixed(nullable)
        }
    }

    /// Check if a value of type `given` can be passed where `self` is declared.
    ///
    /// Rules:
    /// - `mixed` on either side → yes
    /// - `null` given → only if `self` is nullable
    /// - Same variant → yes (objects compare class names exactly;
    ///   subclass acceptance needs the broker and is left to the caller)
    /// - `float` accepts `int`
    /// - `callable` accepts `string` and `array`
    pub fn accepts(&self, given: &Type) -> bool {
        if self.is_mixed() || given.is_mixed() {
            return true;
        }
        if given.kind == TypeKind::Null {
            return self.nullable;
        }
        match (&self.kind, &given.kind) {
            (a, b) if a == b => true,
            (TypeKind::Object(target), TypeKind::Static(given))
            | (TypeKind::Static(target), TypeKind::Object(given)) => target == given,
            (TypeKind::Float, TypeKind::Integer) => true,
            (TypeKind::Callable, TypeKind::String | TypeKind::Array) => true,
            _ => false,
        }
    }

    /// Type of a parameter declared with a source hint.
    ///
    /// No hint means `?mixed`. `self` resolves to `current_class`; any
    /// other non-builtin name is an object type.
    pub fn from_hint(hint: Option<&TypeHint>, nullable: bool, current_class: Option<&str>) -> Type {
        let Some(hint) = hint else {
            return Type::mixed(true);
        };
        let nullable = nullable || hint.nullable;
        match hint.name.to_ascii_lowercase().as_str() {
            "string" => Type::string(nullable),
            "int" => Type::integer(nullable),
            "bool" => Type::boolean(nullable),
            "float" => Type::float(nullable),
            "callable" => Type::callable(nullable),
            "array" => Type::array(nullable),
            "self" => match current_class {
                Some(class) => Type::object(class, nullable),
                None => Type::mixed(nullable),
            },
            "iterable" | "object" | "mixed" | "static" | "parent" | "void" => {
                Type::mixed(nullable)
            }
            _ => Type::object(hint.name.trim_start_matches('\\'), nullable),
        }
    }

    /// Short display name for messages.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display & parsing
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable && self.kind != TypeKind::Null {
            write!(f, "?")?;
        }
        match &self.kind {
            TypeKind::Mixed => write!(f, "mixed"),
            TypeKind::Boolean => write!(f, "bool"),
            TypeKind::Integer => write!(f, "int"),
            TypeKind::Float => write!(f, "float"),
            TypeKind::String => write!(f, "string"),
            TypeKind::Array => write!(f, "array"),
            TypeKind::Callable => write!(f, "callable"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::Object(name) => write!(f, "{}", name),
            TypeKind::Static(name) => write!(f, "static({})", name),
        }
    }
}

/// A type string that does not follow the textual type syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type `{0}`")]
pub struct ParseTypeError(pub String);

impl FromStr for Type {
    type Err = ParseTypeError;

    /// Parses the [`Display`](fmt::Display) form plus `T|null`, `null|T`
    /// and the aliases `integer`, `boolean`, `double`, `void`.
    ///
    /// `self` and `static` parse as object types named `self`/`static`;
    /// the broker rebinds them to the declaring class.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseTypeError(s.to_string());
        let mut text = s.trim();
        let mut nullable = false;

        if let Some(rest) = text.strip_prefix('?') {
            nullable = true;
            text = rest.trim();
        }
        if text.contains('|') {
            let parts: Vec<&str> = text.split('|').map(str::trim).collect();
            let non_null: Vec<&str> = parts
                .iter()
                .copied()
                .filter(|p| !p.eq_ignore_ascii_case("null"))
                .collect();
            if parts.len() != 2 || non_null.len() != 1 {
                return Err(invalid());
            }
            nullable = true;
            text = non_null[0];
        }

        let kind = match text.to_ascii_lowercase().as_str() {
            "" => return Err(invalid()),
            "mixed" => TypeKind::Mixed,
            "bool" | "boolean" => TypeKind::Boolean,
            "int" | "integer" => TypeKind::Integer,
            "float" | "double" => TypeKind::Float,
            "string" => TypeKind::String,
            "array" => TypeKind::Array,
            "callable" => TypeKind::Callable,
            "null" | "void" => TypeKind::Null,
            _ => {
                if let Some(inner) = text
                    .strip_prefix("static(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    TypeKind::Static(parse_class_name(inner).ok_or_else(invalid)?)
                } else {
                    TypeKind::Object(parse_class_name(text).ok_or_else(invalid)?)
                }
            }
        };
        Ok(Type::new(kind, nullable))
    }
}

fn parse_class_name(text: &str) -> Option<String> {
    let name = text.trim().trim_start_matches('\\');
    let valid = !name.is_empty()
        && !name.ends_with('\\')
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\\');
    valid.then(|| name.to_string())
}

impl TryFrom<String> for Type {
    type Error = ParseTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> Self {
        ty.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Type> {
        let mut types = Vec::new();
        for nullable in [false, true] {
            types.push(Type::mixed(nullable));
            types.push(Type::boolean(nullable));
            types.push(Type::integer(nullable));
            types.push(Type::float(nullable));
            types.push(Type::string(nullable));
            types.push(Type::array(nullable));
            types.push(Type::callable(nullable));
            types.push(Type::object("A", nullable));
            types.push(Type::object("B", nullable));
            types.push(Type::static_type("A", nullable));
        }
        types.push(Type::null());
        types
    }

    #[test]
    fn test_combine_is_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a.combine(&b), b.combine(&a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_combine_is_idempotent() {
        for a in samples() {
            assert_eq!(a.combine(&a), a, "{a}");
        }
    }

    #[test]
    fn test_combine_is_associative() {
        let samples = samples();
        for a in &samples {
            for b in &samples {
                for c in &samples {
                    assert_eq!(a.combine(b).combine(c), a.combine(&b.combine(c)));
                }
            }
        }
    }

    #[test]
    fn test_combine_different_objects_widens_to_mixed() {
        let a = Type::object("A", false);
        let b = Type::object("B", true);
        assert_eq!(a.combine(&b), Type::mixed(true));
        assert_eq!(
            Type::object("A", false).combine(&Type::object("B", false)),
            Type::mixed(false)
        );
    }

    #[test]
    fn test_combine_same_variant_ors_nullability() {
        assert_eq!(
            Type::integer(false).combine(&Type::integer(true)),
            Type::integer(true)
        );
        assert_eq!(
            Type::object("A", false).combine(&Type::object("A", false)),
            Type::object("A", false)
        );
        assert_eq!(
            Type::integer(false).combine(&Type::float(false)),
            Type::mixed(false)
        );
    }

    #[test]
    fn test_null_is_always_nullable() {
        assert!(Type::null().is_nullable());
        assert!(Type::new(TypeKind::Null, false).is_nullable());
    }

    #[test]
    fn test_class_name_only_for_objects() {
        assert_eq!(Type::object("Foo", false).class_name(), Some("Foo"));
        assert_eq!(Type::static_type("Foo", true).class_name(), Some("Foo"));
        assert_eq!(Type::integer(false).class_name(), None);
        assert_eq!(Type::mixed(true).class_name(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::integer(false).to_string(), "int");
        assert_eq!(Type::integer(true).to_string(), "?int");
        assert_eq!(Type::null().to_string(), "null");
        assert_eq!(Type::object("Foo\\Bar", true).to_string(), "?Foo\\Bar");
        assert_eq!(Type::static_type("Foo", false).to_string(), "static(Foo)");
    }

    #[test]
    fn test_parse() {
        assert_eq!("int".parse::<Type>().unwrap(), Type::integer(false));
        assert_eq!("?integer".parse::<Type>().unwrap(), Type::integer(true));
        assert_eq!("double|null".parse::<Type>().unwrap(), Type::float(true));
        assert_eq!("null|Foo".parse::<Type>().unwrap(), Type::object("Foo", true));
        assert_eq!("\\Foo\\Bar".parse::<Type>().unwrap(), Type::object("Foo\\Bar", false));
        assert_eq!("static(Foo)".parse::<Type>().unwrap(), Type::static_type("Foo", false));
        assert_eq!("void".parse::<Type>().unwrap(), Type::null());
        assert!("".parse::<Type>().is_err());
        assert!("int|string".parse::<Type>().is_err());
        assert!("Foo Bar".parse::<Type>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for ty in samples() {
            assert_eq!(ty.to_string().parse::<Type>().unwrap(), ty);
        }
    }

    #[test]
    fn test_serde_uses_text_form() {
        let json = serde_json::to_string(&Type::object("Foo", true)).unwrap();
        assert_eq!(json, "\"?Foo\"");
        let ty: Type = serde_json::from_str("\"?int\"").unwrap();
        assert_eq!(ty, Type::integer(true));
        assert!(serde_json::from_str::<Type>("\"int|string\"").is_err());
    }

    #[test]
    fn test_accepts() {
        assert!(Type::integer(false).accepts(&Type::integer(true)));
        assert!(Type::float(false).accepts(&Type::integer(false)));
        assert!(!Type::integer(false).accepts(&Type::float(false)));
        assert!(!Type::integer(false).accepts(&Type::null()));
        assert!(Type::integer(true).accepts(&Type::null()));
        assert!(Type::string(false).accepts(&Type::mixed(true)));
        assert!(Type::mixed(false).accepts(&Type::array(false)));
        assert!(Type::callable(false).accepts(&Type::string(false)));
        assert!(Type::object("Foo", false).accepts(&Type::object("Foo", false)));
        assert!(!Type::object("Foo", false).accepts(&Type::object("Bar", false)));
        assert!(Type::object("Foo", false).accepts(&Type::static_type("Foo", false)));
    }

    #[test]
    fn test_from_hint() {
        assert_eq!(Type::from_hint(None, false, None), Type::mixed(true));
        assert_eq!(
            Type::from_hint(Some(&TypeHint::new("int")), false, None),
            Type::integer(false)
        );
        assert_eq!(
            Type::from_hint(Some(&TypeHint::new("string")), true, None),
            Type::string(true)
        );
        assert_eq!(
            Type::from_hint(Some(&TypeHint::nullable("Foo")), false, None),
            Type::object("Foo", true)
        );
        assert_eq!(
            Type::from_hint(Some(&TypeHint::new("self")), false, Some("Bar")),
            Type::object("Bar", false)
        );
        assert_eq!(
            Type::from_hint(Some(&TypeHint::new("iterable")), false, None),
            Type::mixed(false)
        );
    }
}
