//! Rules on method calls and method declarations.

mod call_methods;
mod call_static_methods;
mod existing_classes_in_typehints;

pub use call_methods::CallMethodsRule;
pub use call_static_methods::CallStaticMethodsRule;
pub use existing_classes_in_typehints::ExistingClassesInTypehintsRule;
