//! Reflection model: read-only facts about classes, members and functions.
//!
//! Facts are built by the [`Broker`](crate::broker::Broker) and never
//! change afterwards. Class and member names are case-sensitive here;
//! function names are canonicalised to lowercase by the broker.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use phpsa_types::ast::Visibility;

use crate::ty::Type;

// ══════════════════════════════════════════════════════════════════════════════
// Member traits
// ══════════════════════════════════════════════════════════════════════════════

/// Common view of a method or property for visibility checks.
pub trait ClassMember {
    /// Name of the class that declares the member.
    fn declaring_class(&self) -> &str;
    fn visibility(&self) -> Visibility;
    fn is_static(&self) -> bool;

    fn is_public(&self) -> bool {
        self.visibility() == Visibility::Public
    }

    fn is_private(&self) -> bool {
        self.visibility() == Visibility::Private
    }
}

/// Anything with a parameter list and a return type: methods and functions.
pub trait ParametersAcceptor {
    fn name(&self) -> &str;
    fn parameters(&self) -> &[ParameterFact];
    fn is_variadic(&self) -> bool;
    fn return_type(&self) -> &Type;
}

// ══════════════════════════════════════════════════════════════════════════════
// Parameters, methods, properties
// ══════════════════════════════════════════════════════════════════════════════

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterFact {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub variadic: bool,
    pub by_ref: bool,
}

impl ParameterFact {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            variadic: false,
            by_ref: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodFact {
    pub declaring_class: String,
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub parameters: Vec<ParameterFact>,
    /// Either declared `...$rest` or the body reads `func_get_args()`.
    pub variadic: bool,
    pub return_type: Type,
}

impl ClassMember for MethodFact {
    fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

impl ParametersAcceptor for MethodFact {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[ParameterFact] {
        &self.parameters
    }

    fn is_variadic(&self) -> bool {
        self.variadic || self.parameters.iter().any(|p| p.variadic)
    }

    fn return_type(&self) -> &Type {
        &self.return_type
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFact {
    pub declaring_class: String,
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub ty: Type,
}

impl ClassMember for PropertyFact {
    fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Constants
// ══════════════════════════════════════════════════════════════════════════════

/// Runtime value of a class constant, as far as inference cares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<serde_json::Value>),
}

impl ConstantValue {
    pub fn ty(&self) -> Type {
        match self {
            ConstantValue::Null => Type::null(),
            ConstantValue::Bool(_) => Type::boolean(false),
            ConstantValue::Int(_) => Type::integer(false),
            ConstantValue::Float(_) => Type::float(false),
            ConstantValue::String(_) => Type::string(false),
            ConstantValue::Array(_) => Type::array(false),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Classes
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Trait,
}

/// Everything known about one class, interface or trait, inherited
/// members included.
#[derive(Debug, Clone)]
pub struct ClassFact {
    pub name: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub parent: Option<String>,
    /// Parent, grandparent, ... nearest first.
    pub ancestors: Vec<String>,
    /// Every implemented interface, inherited ones included.
    pub interfaces: Vec<String>,
    pub methods: FxHashMap<String, Rc<MethodFact>>,
    pub properties: FxHashMap<String, Rc<PropertyFact>>,
    pub constants: FxHashMap<String, ConstantValue>,
}

impl ClassFact {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_abstract: false,
            parent: None,
            ancestors: Vec::new(),
            interfaces: Vec::new(),
            methods: FxHashMap::default(),
            properties: FxHashMap::default(),
            constants: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.kind == ClassKind::Trait
    }

    /// Interfaces and traits are always abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract || self.kind != ClassKind::Class
    }

    pub fn parent_class_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Ancestor chain, nearest first.
    pub fn parent_class_names(&self) -> &[String] {
        &self.ancestors
    }

    /// True if `class_name` is a (transitive) parent or an implemented
    /// interface. A class is not its own subclass.
    pub fn is_subclass_of(&self, class_name: &str) -> bool {
        self.ancestors.iter().any(|a| a == class_name)
            || self.interfaces.iter().any(|i| i == class_name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method(&self, name: &str) -> Option<&Rc<MethodFact>> {
        self.methods.get(name)
    }

    /// Method lookup the way the runtime dispatches: ignoring case.
    pub fn method_ignoring_case(&self, name: &str) -> Option<&Rc<MethodFact>> {
        self.methods.get(name).or_else(|| {
            self.methods
                .iter()
                .find(|(declared, _)| declared.eq_ignore_ascii_case(name))
                .map(|(_, method)| method)
        })
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&Rc<PropertyFact>> {
        self.properties.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantValue> {
        self.constants.get(name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

/// A global function. `name` is lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionFact {
    pub name: String,
    pub parameters: Vec<ParameterFact>,
    pub variadic: bool,
    pub return_type: Type,
}

impl ParametersAcceptor for FunctionFact {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[ParameterFact] {
        &self.parameters
    }

    fn is_variadic(&self) -> bool {
        self.variadic || self.parameters.iter().any(|p| p.variadic)
    }

    fn return_type(&self) -> &Type {
        &self.return_type
    }
}
