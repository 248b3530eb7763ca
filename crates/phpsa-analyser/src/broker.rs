//! The broker: builds, caches and extends reflection facts.
//!
//! Facts are built lazily from the [`SymbolSource`] on first lookup and
//! kept for the lifetime of the broker. The cache is never invalidated;
//! the analysed universe is assumed static for the run. One broker
//! serves one analysis run on one thread.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::error::{AnalysisError, AnalysisResult};
use crate::extension::{
    DynamicMethodReturnTypeExtension, MethodsClassReflectionExtension,
    PropertiesClassReflectionExtension,
};
use crate::reflection::{
    ClassFact, ClassKind, ClassMember, FunctionFact, MethodFact, ParameterFact, PropertyFact,
};
use crate::ty::{Type, TypeKind};
use crate::universe::{ClassDeclaration, ParameterDeclaration, SymbolSource};

pub struct Broker {
    source: Box<dyn SymbolSource>,
    property_extensions: Vec<Rc<dyn PropertiesClassReflectionExtension>>,
    method_extensions: Vec<Rc<dyn MethodsClassReflectionExtension>>,
    /// Target class → extensions, in registration order.
    return_type_extensions: FxHashMap<String, Vec<Rc<dyn DynamicMethodReturnTypeExtension>>>,
    classes: RefCell<FxHashMap<String, Rc<ClassFact>>>,
    /// Keyed by lowercase name.
    functions: RefCell<FxHashMap<String, Rc<FunctionFact>>>,
    /// Classes currently being built, to catch circular hierarchies.
    resolving: RefCell<FxHashSet<String>>,
}

impl Broker {
    pub fn new(source: impl SymbolSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            property_extensions: Vec::new(),
            method_extensions: Vec::new(),
            return_type_extensions: FxHashMap::default(),
            classes: RefCell::new(FxHashMap::default()),
            functions: RefCell::new(FxHashMap::default()),
            resolving: RefCell::new(FxHashSet::default()),
        }
    }

    pub fn with_properties_extension(
        mut self,
        extension: impl PropertiesClassReflectionExtension + 'static,
    ) -> Self {
        debug!(index = self.property_extensions.len(), "registered properties extension");
        self.property_extensions.push(Rc::new(extension));
        self
    }

    pub fn with_methods_extension(
        mut self,
        extension: impl MethodsClassReflectionExtension + 'static,
    ) -> Self {
        debug!(index = self.method_extensions.len(), "registered methods extension");
        self.method_extensions.push(Rc::new(extension));
        self
    }

    pub fn with_dynamic_method_return_type_extension(
        mut self,
        extension: impl DynamicMethodReturnTypeExtension + 'static,
    ) -> Self {
        let class = extension.class().to_string();
        debug!(class = %class, "registered dynamic method return type extension");
        self.return_type_extensions
            .entry(class)
            .or_default()
            .push(Rc::new(extension));
        self
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Classes
    // ══════════════════════════════════════════════════════════════════════════

    /// True if the universe resolves `name` as a class, interface or trait.
    ///
    /// A failing autoloader surfaces as [`AnalysisError::ClassAutoloading`].
    pub fn has_class(&self, name: &str) -> AnalysisResult<bool> {
        if self.classes.borrow().contains_key(name) {
            return Ok(true);
        }
        self.source
            .class_exists(name)
            .map_err(|fault| AnalysisError::ClassAutoloading {
                class: name.to_string(),
                reason: fault.0,
            })
    }

    pub fn get_class(&self, name: &str) -> AnalysisResult<Rc<ClassFact>> {
        if let Some(fact) = self.classes.borrow().get(name) {
            trace!(class = %name, "(cached) get_class");
            return Ok(Rc::clone(fact));
        }
        if !self.has_class(name)? {
            return Err(AnalysisError::ClassNotFound(name.to_string()));
        }
        if !self.resolving.borrow_mut().insert(name.to_string()) {
            return Err(AnalysisError::ShouldNotHappen(format!(
                "circular class hierarchy involving {}",
                name
            )));
        }

        let built = self.build_class(name);
        self.resolving.borrow_mut().remove(name);
        let fact = Rc::new(built?);

        debug!(
            class = %name,
            methods = fact.methods.len(),
            properties = fact.properties.len(),
            "built class fact"
        );
        self.classes
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&fact));
        Ok(fact)
    }

    fn build_class(&self, name: &str) -> AnalysisResult<ClassFact> {
        let decl = self
            .source
            .class_declaration(name)
            .ok_or_else(|| AnalysisError::ClassNotFound(name.to_string()))?;

        let mut fact = ClassFact::new(&decl.name, decl.kind);
        fact.is_abstract = decl.is_abstract;
        fact.parent = decl.parent.clone();

        add_declared_members(&mut fact, decl);

        for trait_name in &decl.traits {
            let used = self.get_class(trait_name)?;
            for (method_name, method) in &used.methods {
                fact.methods.entry(method_name.clone()).or_insert_with(|| {
                    Rc::new(MethodFact {
                        declaring_class: decl.name.clone(),
                        return_type: rebind(&method.return_type, &used.name, &decl.name),
                        ..MethodFact::clone(method)
                    })
                });
            }
            for (property_name, property) in &used.properties {
                fact.properties
                    .entry(property_name.clone())
                    .or_insert_with(|| {
                        Rc::new(PropertyFact {
                            declaring_class: decl.name.clone(),
                            ty: rebind(&property.ty, &used.name, &decl.name),
                            ..PropertyFact::clone(property)
                        })
                    });
            }
        }

        if let Some(parent_name) = &decl.parent {
            let parent = self.get_class(parent_name)?;
            fact.ancestors.push(parent.name.clone());
            fact.ancestors.extend(parent.ancestors.iter().cloned());
            fact.interfaces.extend(parent.interfaces.iter().cloned());
            inherit(&mut fact, &parent);
        }

        for interface_name in &decl.interfaces {
            let interface = self.get_class(interface_name)?;
            fact.interfaces.push(interface.name.clone());
            fact.interfaces.extend(interface.interfaces.iter().cloned());
            inherit(&mut fact, &interface);
        }
        let mut seen = FxHashSet::default();
        fact.interfaces.retain(|name| seen.insert(name.clone()));

        for extension in &self.property_extensions {
            if !extension.applies_to(&fact) {
                continue;
            }
            for property in extension.properties(&fact, self) {
                fact.properties
                    .entry(property.name.clone())
                    .or_insert_with(|| Rc::new(property));
            }
        }
        for extension in &self.method_extensions {
            if !extension.applies_to(&fact) {
                continue;
            }
            for method in extension.methods(&fact, self) {
                fact.methods
                    .entry(method.name.clone())
                    .or_insert_with(|| Rc::new(method));
            }
        }

        Ok(fact)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// Function names are case-insensitive.
    pub fn has_function(&self, name: &str) -> bool {
        let name = name.trim_start_matches('\\').to_ascii_lowercase();
        self.functions.borrow().contains_key(&name) || self.source.function_exists(&name)
    }

    pub fn get_function(&self, name: &str) -> AnalysisResult<Rc<FunctionFact>> {
        let key = name.trim_start_matches('\\').to_ascii_lowercase();
        if let Some(fact) = self.functions.borrow().get(&key) {
            trace!(function = %key, "(cached) get_function");
            return Ok(Rc::clone(fact));
        }

        let decl = self
            .source
            .function_declaration(&key)
            .ok_or_else(|| AnalysisError::FunctionNotFound(name.to_string()))?;
        let resolve = |ty: &Type| ty.clone();
        let fact = Rc::new(FunctionFact {
            name: key.clone(),
            parameters: decl
                .parameters
                .iter()
                .map(|p| parameter_fact(p, &resolve))
                .collect(),
            variadic: decl.variadic,
            return_type: decl.return_type.clone(),
        });

        debug!(function = %key, "built function fact");
        self.functions.borrow_mut().insert(key, Rc::clone(&fact));
        Ok(fact)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Return type extensions
    // ══════════════════════════════════════════════════════════════════════════

    /// Extensions registered for `class_name` or any of its ancestors,
    /// nearest class first.
    pub fn get_return_type_extensions_for_class(
        &self,
        class_name: &str,
    ) -> AnalysisResult<Vec<Rc<dyn DynamicMethodReturnTypeExtension>>> {
        if self.return_type_extensions.is_empty() {
            return Ok(Vec::new());
        }

        let mut chain = vec![class_name.to_string()];
        if self.has_class(class_name)? {
            chain.extend(self.get_class(class_name)?.ancestors.iter().cloned());
        }

        Ok(chain
            .iter()
            .filter_map(|class| self.return_type_extensions.get(class))
            .flat_map(|extensions| extensions.iter().cloned())
            .collect())
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("cached_classes", &self.classes.borrow().len())
            .field("cached_functions", &self.functions.borrow().len())
            .field("property_extensions", &self.property_extensions.len())
            .field("method_extensions", &self.method_extensions.len())
            .field("return_type_extensions", &self.return_type_extensions.len())
            .finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn add_declared_members(fact: &mut ClassFact, decl: &ClassDeclaration) {
    let resolve = |ty: &Type| resolve_declared(ty, &decl.name, decl.parent.as_deref());

    for method in &decl.methods {
        let method_fact = MethodFact {
            declaring_class: decl.name.clone(),
            name: method.name.clone(),
            visibility: method.visibility,
            is_static: method.is_static,
            is_abstract: method.is_abstract || decl.kind == ClassKind::Interface,
            parameters: method
                .parameters
                .iter()
                .map(|p| parameter_fact(p, &resolve))
                .collect(),
            variadic: method.variadic,
            return_type: resolve(&method.return_type),
        };
        fact.methods
            .insert(method.name.clone(), Rc::new(method_fact));
    }

    for property in &decl.properties {
        let property_fact = PropertyFact {
            declaring_class: decl.name.clone(),
            name: property.name.clone(),
            visibility: property.visibility,
            is_static: property.is_static,
            ty: resolve(&property.ty),
        };
        fact.properties
            .insert(property.name.clone(), Rc::new(property_fact));
    }

    for (name, value) in &decl.constants {
        fact.constants.insert(name.clone(), value.clone());
    }
}

/// Copy non-private members and constants of `from` that `into` does not
/// declare itself.
fn inherit(into: &mut ClassFact, from: &ClassFact) {
    for (name, method) in &from.methods {
        if !method.is_private() {
            into.methods
                .entry(name.clone())
                .or_insert_with(|| Rc::clone(method));
        }
    }
    for (name, property) in &from.properties {
        if !property.is_private() {
            into.properties
                .entry(name.clone())
                .or_insert_with(|| Rc::clone(property));
        }
    }
    for (name, value) in &from.constants {
        into.constants
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
}

fn parameter_fact(decl: &ParameterDeclaration, resolve: &dyn Fn(&Type) -> Type) -> ParameterFact {
    ParameterFact {
        name: decl.name.clone(),
        ty: resolve(&decl.ty),
        optional: decl.optional || decl.variadic,
        variadic: decl.variadic,
        by_ref: decl.by_ref,
    }
}

/// Bind the relative names `self`, `static` and `parent` in a declared type.
fn resolve_declared(ty: &Type, declaring_class: &str, parent: Option<&str>) -> Type {
    let nullable = ty.is_nullable();
    match ty.kind() {
        TypeKind::Object(name) if name.eq_ignore_ascii_case("self") => {
            Type::object(declaring_class, nullable)
        }
        TypeKind::Object(name) if name.eq_ignore_ascii_case("static") => {
            Type::static_type(declaring_class, nullable)
        }
        TypeKind::Object(name) if name.eq_ignore_ascii_case("parent") => match parent {
            Some(parent) => Type::object(parent, nullable),
            None => Type::mixed(nullable),
        },
        _ => ty.clone(),
    }
}

/// Rebind a trait member's `self`/`static` type to the using class.
fn rebind(ty: &Type, trait_name: &str, using_class: &str) -> Type {
    let nullable = ty.is_nullable();
    match ty.kind() {
        TypeKind::Object(name) if name == trait_name => Type::object(using_class, nullable),
        TypeKind::Static(name) if name == trait_name => Type::static_type(using_class, nullable),
        _ => ty.clone(),
    }
}
