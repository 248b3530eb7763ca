//! The host symbol universe the broker reflects over.
//!
//! [`SymbolSource`] is what the broker asks "does this class exist, and
//! what does it declare". [`Universe`] is the in-memory implementation,
//! built programmatically or loaded from JSON:
//!
//! ```json
//! {
//!   "classes": [
//!     { "name": "Foo", "parent": "Base",
//!       "methods": [{ "name": "bar", "visibility": "private", "return_type": "int" }] }
//!   ],
//!   "functions": [{ "name": "strlen", "parameters": [{ "name": "s", "type": "string" }],
//!                   "return_type": "int" }],
//!   "autoload_failures": { "Broken": "Parse error in Broken.php" }
//! }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reflection::{ClassKind, ConstantValue, Visibility};
use crate::ty::Type;

/// The host failed while loading a class definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AutoloadFault(pub String);

/// Live reflection facilities of the analysed program.
///
/// Class names are passed as written. Function names are passed
/// lowercased by the broker.
pub trait SymbolSource {
    /// May trigger autoloading; a failing autoloader is a fault, not `false`.
    fn class_exists(&self, name: &str) -> Result<bool, AutoloadFault>;
    fn class_declaration(&self, name: &str) -> Option<&ClassDeclaration>;
    fn function_exists(&self, name: &str) -> bool;
    fn function_declaration(&self, name: &str) -> Option<&FunctionDeclaration>;
}

fn undeclared() -> Type {
    Type::mixed(true)
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "type", default = "undeclared")]
    pub ty: Type,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub by_ref: bool,
}

impl ParameterDeclaration {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            variadic: false,
            by_ref: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    /// The body reads its arguments dynamically (`func_get_args()`).
    #[serde(default)]
    pub variadic: bool,
    #[serde(default = "undeclared")]
    pub return_type: Type,
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            parameters: Vec::new(),
            variadic: false,
            return_type: undeclared(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(rename = "type", default = "undeclared")]
    pub ty: Type,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            ty,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// A class, interface or trait as the host declares it.
///
/// For interfaces, `interfaces` lists the extended interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDeclaration>,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    pub constants: FxHashMap<String, ConstantValue>,
}

impl ClassDeclaration {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_abstract: false,
            parent: None,
            interfaces: Vec::new(),
            traits: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            constants: FxHashMap::default(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn using(mut self, trait_name: impl Into<String>) -> Self {
        self.traits.push(trait_name.into());
        self
    }

    pub fn with_method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: ConstantValue) -> Self {
        self.constants.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default = "undeclared")]
    pub return_type: Type,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            variadic: false,
            return_type,
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Universe
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UniverseFile {
    classes: Vec<ClassDeclaration>,
    functions: Vec<FunctionDeclaration>,
    autoload_failures: FxHashMap<String, String>,
}

/// In-memory symbol universe.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    classes: FxHashMap<String, ClassDeclaration>,
    /// Keyed by lowercase name.
    functions: FxHashMap<String, FunctionDeclaration>,
    autoload_failures: FxHashMap<String, String>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: UniverseFile = serde_json::from_str(json)?;
        let mut universe = Self::new();
        for class in file.classes {
            universe.add_class(class);
        }
        for function in file.functions {
            universe.add_function(function);
        }
        universe.autoload_failures = file.autoload_failures;
        Ok(universe)
    }

    pub fn add_class(&mut self, class: ClassDeclaration) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn add_function(&mut self, function: FunctionDeclaration) {
        self.functions
            .insert(function.name.to_ascii_lowercase(), function);
    }

    pub fn with_class(mut self, class: ClassDeclaration) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_function(mut self, function: FunctionDeclaration) -> Self {
        self.add_function(function);
        self
    }

    /// Make every lookup of `class` fail as if its autoloader crashed.
    pub fn with_autoload_failure(mut self, class: impl Into<String>, reason: impl Into<String>) -> Self {
        self.autoload_failures.insert(class.into(), reason.into());
        self
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl SymbolSource for Universe {
    fn class_exists(&self, name: &str) -> Result<bool, AutoloadFault> {
        if let Some(reason) = self.autoload_failures.get(name) {
            return Err(AutoloadFault(reason.clone()));
        }
        Ok(self.classes.contains_key(name))
    }

    fn class_declaration(&self, name: &str) -> Option<&ClassDeclaration> {
        self.classes.get(name)
    }

    fn function_exists(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    fn function_declaration(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions.get(&name.to_ascii_lowercase())
    }
}
