//! Extension points of the broker.
//!
//! Member extensions contribute synthetic methods and properties (magic
//! `__get`/`__call` targets, framework conventions) when a class fact is
//! built. Return-type extensions replace a method's declared return type
//! per call site.

use phpsa_types::ast::Expr;

use crate::broker::Broker;
use crate::error::AnalysisResult;
use crate::reflection::{ClassFact, MethodFact, PropertyFact};
use crate::scope::Scope;
use crate::ty::Type;

/// Contributes properties to classes it applies to.
pub trait PropertiesClassReflectionExtension {
    fn applies_to(&self, class: &ClassFact) -> bool;

    /// Properties to add. Names the class already has are ignored.
    fn properties(&self, class: &ClassFact, broker: &Broker) -> Vec<PropertyFact>;
}

/// Contributes methods to classes it applies to.
pub trait MethodsClassReflectionExtension {
    fn applies_to(&self, class: &ClassFact) -> bool;

    /// Methods to add. Names the class already has are ignored.
    fn methods(&self, class: &ClassFact, broker: &Broker) -> Vec<MethodFact>;
}

/// Infers a method's return type from the call site.
///
/// Registered for one class; also consulted for calls on its subclasses,
/// with extensions for nearer classes asked first.
pub trait DynamicMethodReturnTypeExtension {
    fn class(&self) -> &str;

    fn is_method_supported(&self, method: &MethodFact) -> bool;

    fn type_from_method_call(
        &self,
        method: &MethodFact,
        call: &Expr,
        scope: &Scope,
    ) -> AnalysisResult<Type>;
}
